// rest/routes/tasks.rs — GET /tasks?date=YYYY-MM-DD

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

use crate::storage::Task;
use crate::AppContext;

/// Errors surfaced to HTTP clients as plain-text bodies.
///
/// The 500 body carries the raw store error text, matching the documented
/// contract; the error is also logged so operators do not depend on clients
/// reporting response bodies.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("date parameter is required")]
    MissingDate,
    #[error("invalid date format. Use YYYY-MM-DD")]
    InvalidDate,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::MissingDate | ApiError::InvalidDate => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

#[derive(Deserialize)]
pub struct TasksQuery {
    pub date: Option<String>,
}

/// Parse a `YYYY-MM-DD` date, rejecting non-canonical spellings.
///
/// `chrono` alone would accept `2024-1-1`; requiring the input to round-trip
/// to its canonical form keeps the accepted grammar strict.
fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| ApiError::InvalidDate)?;
    if date.format("%Y-%m-%d").to_string() != raw {
        return Err(ApiError::InvalidDate);
    }
    Ok(date)
}

pub async fn list_tasks(
    State(ctx): State<Arc<AppContext>>,
    Query(q): Query<TasksQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let raw = q.date.as_deref().unwrap_or("");
    if raw.is_empty() {
        return Err(ApiError::MissingDate);
    }
    let date = parse_date(raw)?;

    let tasks = ctx.storage.tasks_for_date(date).await.map_err(|e| {
        error!(date = %date, err = %e, "task query failed");
        ApiError::Store(e)
    })?;

    Ok(Json(tasks))
}
