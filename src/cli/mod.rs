//! Terminal commands that talk to a running taskd server.

pub mod client;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;

use crate::config::ServerConfig;
use crate::storage::Task;
use client::ApiClient;

/// Resolve the optional date argument; defaults to today (local time).
fn resolve_date(raw: Option<&str>) -> Result<NaiveDate> {
    match raw {
        None => Ok(chrono::Local::now().date_naive()),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| anyhow!("invalid date '{s}'. Use YYYY-MM-DD")),
    }
}

/// Render the day's tasks as a plain table.
fn render_list(date: NaiveDate, tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return format!("No tasks found for {date}.\n");
    }

    let mut out = format!("Tasks for {date}:\n");
    out.push_str(&format!("{:<6} {:<6} {:<8} TITLE\n", "ID", "PRIO", "EST"));
    out.push_str(&format!("{}\n", "-".repeat(72)));
    for t in tasks {
        out.push_str(&format!(
            "{:<6} {:<6} {:<8} {}\n",
            t.id,
            t.priority,
            format!("{}m", t.estimate_minutes),
            t.title
        ));
        if !t.description.is_empty() {
            // 22-wide pad + the separating space lines the text up under TITLE
            out.push_str(&format!("{:<22} {}\n", "", t.description));
        }
    }
    out.push_str(&format!("\n{} task(s)\n", tasks.len()));
    out
}

/// Render the day's task count and summed estimate in hours.
fn render_total(date: NaiveDate, tasks: &[Task]) -> String {
    let minutes: i64 = tasks.iter().map(|t| t.estimate_minutes).sum();
    format!(
        "{} task(s) scheduled for {date}, totaling {:.1} hours\n",
        tasks.len(),
        minutes as f64 / 60.0
    )
}

/// `taskd list [date]` — print the day's tasks as a plain table.
pub async fn run_list(config: &ServerConfig, date: Option<&str>) -> Result<()> {
    let date = resolve_date(date)?;
    let tasks = ApiClient::new(&config.api_url)?.tasks_for_date(date).await?;
    print!("{}", render_list(date, &tasks));
    Ok(())
}

/// `taskd total [date]` — print the day's task count and summed estimate.
pub async fn run_total(config: &ServerConfig, date: Option<&str>) -> Result<()> {
    let date = resolve_date(date)?;
    let tasks = ApiClient::new(&config.api_url)?.tasks_for_date(date).await?;
    print!("{}", render_total(date, &tasks));
    Ok(())
}
