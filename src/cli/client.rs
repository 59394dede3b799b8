//! Lightweight HTTP client for the terminal commands.
//!
//! `taskd list` and `taskd total` use this to fetch tasks from a running
//! server instead of opening the database directly.

use anyhow::{bail, Context as _, Result};
use chrono::NaiveDate;

use crate::storage::Task;

/// A short-lived HTTP client for CLI-to-server calls.
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a client targeting the server at `base_url` (5-second timeout).
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Fetch the tasks scheduled for `date`.
    ///
    /// Non-2xx responses surface as errors carrying the server's plain-text
    /// body; a connection failure suggests the server is not running.
    pub async fn tasks_for_date(&self, date: NaiveDate) -> Result<Vec<Task>> {
        let url = format!("{}/tasks", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("date", date.format("%Y-%m-%d").to_string())])
            .send()
            .await
            .with_context(|| {
                format!(
                    "could not reach taskd at {url}\n  Is the server running? Start it with `taskd serve`."
                )
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read server response")?;
        if !status.is_success() {
            bail!("server returned {status}: {body}");
        }

        serde_json::from_str(&body).context("server returned malformed JSON")
    }
}
