use serde::Deserialize;
use std::path::Path;
use tracing::error;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://tasks.db?mode=rwc";
pub const DEFAULT_CONFIG_PATH: &str = "taskd.toml";

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

/// Server configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Store DSN (sqlx SQLite URL).
    pub database_url: String,
    /// HTTP listen port.
    pub port: u16,
    /// Bind address (default: 127.0.0.1; use 0.0.0.0 for LAN access).
    pub bind_address: String,
    /// Log filter (trace, debug, info, warn, error).
    pub log: String,
    /// Log output format: "pretty" (human-readable) | "json" (for log aggregators).
    pub log_format: String,
    /// Base URL the terminal-client commands target.
    pub api_url: String,
    /// Log SQLite queries exceeding this threshold (milliseconds). 0 = disabled.
    pub slow_query_threshold_ms: u64,
}

/// Optional `taskd.toml` — the lowest-priority override layer.
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    database_url: Option<String>,
    port: Option<u16>,
    bind_address: Option<String>,
    log: Option<String>,
    log_format: Option<String>,
    api_url: Option<String>,
    slow_query_threshold_ms: Option<u64>,
}

fn load_toml(path: &Path) -> Option<TomlConfig> {
    let contents = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config file — using defaults");
            None
        }
    }
}

impl ServerConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file at `--config` (default: ./taskd.toml, loaded only if present)
    ///   3. Built-in defaults
    pub fn new(
        port: Option<u16>,
        database_url: Option<String>,
        log: Option<String>,
        bind_address: Option<String>,
        config_path: Option<&Path>,
    ) -> Self {
        let config_path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        let toml = load_toml(config_path).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let database_url = database_url
            .or(toml.database_url)
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let bind_address = bind_address
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);

        let log_format = std::env::var("TASKD_LOG_FORMAT")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        let api_url = std::env::var("TASKD_API_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.api_url)
            .unwrap_or_else(|| format!("http://127.0.0.1:{port}"));

        let slow_query_threshold_ms = toml.slow_query_threshold_ms.unwrap_or(100);

        Self {
            database_url,
            port,
            bind_address,
            log,
            log_format,
            api_url,
            slow_query_threshold_ms,
        }
    }
}
