use anyhow::{Context as _, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteConnectOptions, ConnectOptions, SqlitePool};
use std::str::FromStr;

/// Default timeout for individual SQLite queries.
/// Prevents a hung query from blocking its request indefinitely.
const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Execute a future with the standard query timeout.
/// Returns an error if the operation takes longer than `QUERY_TIMEOUT`.
async fn with_timeout<T>(fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "database query timed out after {}s",
            QUERY_TIMEOUT.as_secs()
        )),
    }
}

/// A scheduled unit of work. Row shape and JSON field mapping coincide:
/// `date` serializes as `YYYY-MM-DD`, timestamps as RFC 3339.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub date: NaiveDate,
    pub title: String,
    pub description: String,
    pub priority: i64,
    pub estimate_minutes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Open the store at `database_url`, verify it answers, and apply migrations.
    ///
    /// `slow_query_ms` is the threshold in milliseconds — queries exceeding it
    /// are logged at WARN level. Set to 0 to disable slow-query logging.
    ///
    /// Any failure here is a startup failure: the caller must not begin
    /// serving traffic.
    pub async fn connect(database_url: &str, slow_query_ms: u64) -> Result<Self> {
        let mut opts = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database URL '{database_url}'"))?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .create_if_missing(true);

        if slow_query_ms > 0 {
            opts = opts.log_slow_statements(
                log::LevelFilter::Warn,
                std::time::Duration::from_millis(slow_query_ms),
            );
        }

        let pool = SqlitePool::connect_with(opts)
            .await
            .context("failed to connect to the database")?;

        // Verify the connection actually works before the server starts.
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .context("database ping failed")?;

        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// Return a clone of the connection pool (cheap — Arc-backed).
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    async fn migrate(pool: &SqlitePool) -> Result<()> {
        sqlx::migrate!("src/storage/migrations")
            .run(pool)
            .await
            .context("failed to run database migrations")?;
        Ok(())
    }

    /// All tasks scheduled for `date`, ascending by priority, ties broken by
    /// creation time. An empty day is an empty vec, not an error.
    pub async fn tasks_for_date(&self, date: NaiveDate) -> Result<Vec<Task>> {
        with_timeout(async {
            Ok(sqlx::query_as(
                "SELECT id, date, title, description, priority, estimate_minutes, created_at, updated_at \
                 FROM tasks WHERE date = ? ORDER BY priority, created_at",
            )
            .bind(date)
            .fetch_all(&self.pool)
            .await?)
        })
        .await
    }
}
