use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use taskd::{cli, config::ServerConfig, rest, storage::Storage, AppContext};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "taskd",
    about = "taskd — day-planner task API server and terminal client",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP listen port
    #[arg(long, env = "TASKD_PORT")]
    port: Option<u16>,

    /// Store DSN (sqlx SQLite URL, e.g. sqlite://tasks.db?mode=rwc)
    #[arg(long, env = "TASKD_DATABASE_URL")]
    database_url: Option<String>,

    /// Bind address (default: 127.0.0.1; use 0.0.0.0 for LAN access)
    #[arg(long, env = "TASKD_BIND")]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TASKD_LOG")]
    log: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "TASKD_LOG_FILE")]
    log_file: Option<std::path::PathBuf>,

    /// Config file path (default: ./taskd.toml, loaded only if present)
    #[arg(long, env = "TASKD_CONFIG")]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server (default when no subcommand given).
    ///
    /// Runs taskd in the foreground, serving GET /tasks?date=YYYY-MM-DD.
    ///
    /// Examples:
    ///   taskd serve
    ///   taskd
    Serve,
    /// List the tasks scheduled for a date.
    ///
    /// Fetches from a running server and prints a plain table, ordered by
    /// priority then creation time. The date defaults to today.
    ///
    /// Examples:
    ///   taskd list
    ///   taskd list 2024-05-01
    List {
        /// Date in YYYY-MM-DD format (default: today)
        date: Option<String>,
    },
    /// Show the task count and total estimated hours for a date.
    ///
    /// Examples:
    ///   taskd total
    ///   taskd total 2024-05-01
    Total {
        /// Date in YYYY-MM-DD format (default: today)
        date: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = Args::parse();
    let command = args.command.take();

    // Client commands default to quiet logging so table output stays clean;
    // an explicit --log / TASKD_LOG still wins.
    let log = args.log.take().or(match command {
        Some(Command::List { .. }) | Some(Command::Total { .. }) => Some("error".to_string()),
        _ => None,
    });

    // Resolve config before logging init so `log` and `log_format` from
    // taskd.toml take effect. CLI/env still have the highest priority.
    let config = Arc::new(ServerConfig::new(
        args.port,
        args.database_url.take(),
        log,
        args.bind.take(),
        args.config.as_deref(),
    ));

    // Init once — must happen before any tracing calls.
    let _file_guard = setup_logging(&config.log, args.log_file.as_deref(), &config.log_format);

    match command {
        Some(Command::List { date }) => {
            cli::run_list(&config, date.as_deref()).await?;
        }
        Some(Command::Total { date }) => {
            cli::run_total(&config, date.as_deref()).await?;
        }
        None | Some(Command::Serve) => {
            run_server(config).await?;
        }
    }

    Ok(())
}

/// Initialize the tracing subscriber.
/// If `log_file` is set, logs go to both stdout and a daily-rolling file.
/// Returns a `WorkerGuard` that must stay alive for the process lifetime.
///
/// `log_format` may be `"pretty"` (default, human-readable compact format) or
/// `"json"` (structured JSON for log aggregators).
///
/// If the log directory cannot be created, falls back to stdout-only logging
/// with a warning — never panics.
fn setup_logging(
    log_level: &str,
    log_file: Option<&std::path::Path>,
    log_format: &str,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let use_json = log_format == "json";

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let filename = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("taskd.log"));

        // Ensure the directory exists before tracing-appender tries to open it.
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "warn: could not create log directory '{}': {e} — falling back to stdout",
                dir.display()
            );
            if use_json {
                tracing_subscriber::fmt().json().with_env_filter(log_level).init();
            } else {
                tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
            }
            return None;
        }

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        if use_json {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().json())
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().compact())
                .with(fmt::layer().with_writer(non_blocking))
                .init();
        }

        Some(guard)
    } else if use_json {
        tracing_subscriber::fmt().json().with_env_filter(log_level).init();
        None
    } else {
        tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
        None
    }
}

/// Startup sequence: store connect + migrate → serve.
/// Any failure before `start_rest_server` is fatal — the process never
/// begins serving traffic.
async fn run_server(config: Arc<ServerConfig>) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "taskd starting");
    info!(
        database_url = %config.database_url,
        bind = %config.bind_address,
        port = config.port,
        "config loaded"
    );

    let storage = Arc::new(
        Storage::connect(&config.database_url, config.slow_query_threshold_ms).await?,
    );

    let ctx = Arc::new(AppContext {
        config: config.clone(),
        storage,
    });

    rest::start_rest_server(ctx).await
}
