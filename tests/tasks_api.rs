//! End-to-end tests for GET /tasks.
//! Spins up the REST server on a random port and sends raw HTTP requests.

use chrono::NaiveDate;
use std::sync::Arc;
use taskd::{cli::client::ApiClient, config::ServerConfig, rest, storage::Storage, AppContext};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Spin up a server on an ephemeral port backed by a fresh SQLite file.
/// Returns the bound port and the storage handle for seeding.
async fn spawn_test_server(dir: &TempDir) -> (u16, Arc<Storage>) {
    let url = format!("sqlite://{}/tasks.db?mode=rwc", dir.path().display());
    let config = Arc::new(ServerConfig::new(
        None,
        Some(url.clone()),
        Some("error".to_string()),
        None,
        Some(dir.path().join("no-config.toml").as_path()),
    ));
    let storage = Arc::new(Storage::connect(&url, 0).await.unwrap());

    let ctx = Arc::new(AppContext {
        config,
        storage: storage.clone(),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let router = rest::build_router(ctx);
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    (port, storage)
}

/// Send a raw GET request and split the response into (status line, headers, body).
async fn http_get(port: u16, path_and_query: &str) -> (String, String, String) {
    let mut stream = TcpStream::connect(format!("127.0.0.1:{port}"))
        .await
        .unwrap();
    let request =
        format!("GET {path_and_query} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    let response = String::from_utf8_lossy(&buf).into_owned();

    let body_start = response
        .find("\r\n\r\n")
        .map(|i| i + 4)
        .expect("no body in response");
    let head = &response[..body_start];
    let status_line = head.lines().next().unwrap_or("").to_string();
    (status_line, head.to_string(), response[body_start..].to_string())
}

async fn seed_task(storage: &Storage, date: &str, title: &str, priority: i64, created_at: &str) {
    sqlx::query(
        "INSERT INTO tasks (date, title, description, priority, estimate_minutes, created_at, updated_at) \
         VALUES (?, ?, ?, ?, 45, ?, ?)",
    )
    .bind(date)
    .bind(title)
    .bind(format!("{title} details"))
    .bind(priority)
    .bind(created_at)
    .bind(created_at)
    .execute(&storage.pool())
    .await
    .unwrap();
}

#[tokio::test]
async fn missing_date_is_400_with_exact_body() {
    let dir = TempDir::new().unwrap();
    let (port, _storage) = spawn_test_server(&dir).await;

    let (status, _, body) = http_get(port, "/tasks").await;
    assert!(status.contains("400"), "expected 400, got: {status}");
    assert_eq!(body, "date parameter is required");
}

#[tokio::test]
async fn empty_date_is_400_with_exact_body() {
    let dir = TempDir::new().unwrap();
    let (port, _storage) = spawn_test_server(&dir).await;

    let (status, _, body) = http_get(port, "/tasks?date=").await;
    assert!(status.contains("400"), "expected 400, got: {status}");
    assert_eq!(body, "date parameter is required");
}

#[tokio::test]
async fn malformed_date_is_400_with_exact_body() {
    let dir = TempDir::new().unwrap();
    let (port, _storage) = spawn_test_server(&dir).await;

    for date in ["2024%2F01%2F01", "not-a-date", "2024-1-1"] {
        let (status, _, body) = http_get(port, &format!("/tasks?date={date}")).await;
        assert!(status.contains("400"), "expected 400 for {date}, got: {status}");
        assert_eq!(body, "invalid date format. Use YYYY-MM-DD");
    }
}

#[tokio::test]
async fn empty_day_is_200_with_empty_array() {
    let dir = TempDir::new().unwrap();
    let (port, _storage) = spawn_test_server(&dir).await;

    let (status, headers, body) = http_get(port, "/tasks?date=2024-05-03").await;
    assert!(status.contains("200"), "expected 200, got: {status}");
    assert!(
        headers.to_lowercase().contains("content-type: application/json"),
        "expected JSON content type, got: {headers}"
    );
    assert_eq!(body, "[]");
}

#[tokio::test]
async fn tasks_come_back_ordered_by_priority_then_created_at() {
    let dir = TempDir::new().unwrap();
    let (port, storage) = spawn_test_server(&dir).await;

    // ids 1..=3 in insertion order
    seed_task(&storage, "2024-05-01", "second", 2, "2024-04-30T08:00:00.000Z").await;
    seed_task(&storage, "2024-05-01", "first", 1, "2024-04-30T09:00:00.000Z").await;
    seed_task(&storage, "2024-05-02", "other-day", 1, "2024-04-30T08:00:00.000Z").await;

    let (status, _, body) = http_get(port, "/tasks?date=2024-05-01").await;
    assert!(status.contains("200"), "expected 200, got: {status}");

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    let tasks = json.as_array().expect("body is not a JSON array");
    let ids: Vec<i64> = tasks.iter().map(|t| t["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![2, 1]);
    assert_eq!(tasks[0]["title"], "first");
    assert_eq!(tasks[0]["date"], "2024-05-01");
    assert_eq!(tasks[0]["priority"], 1);
    assert_eq!(tasks[0]["estimate_minutes"], 45);
    assert!(tasks[0]["created_at"].is_string());
    assert!(tasks[0]["updated_at"].is_string());

    // the other date stays isolated
    let (_, _, body) = http_get(port, "/tasks?date=2024-05-03").await;
    assert_eq!(body, "[]");
}

#[tokio::test]
async fn equal_priority_breaks_ties_on_created_at() {
    let dir = TempDir::new().unwrap();
    let (port, storage) = spawn_test_server(&dir).await;

    seed_task(&storage, "2024-05-01", "later", 1, "2024-04-30T10:00:00.000Z").await;
    seed_task(&storage, "2024-05-01", "earlier", 1, "2024-04-30T06:00:00.000Z").await;

    let (_, _, body) = http_get(port, "/tasks?date=2024-05-01").await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    let titles: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["earlier", "later"]);
}

#[tokio::test]
async fn api_client_fetches_ordered_tasks() {
    let dir = TempDir::new().unwrap();
    let (port, storage) = spawn_test_server(&dir).await;

    seed_task(&storage, "2024-05-01", "second", 2, "2024-04-30T08:00:00.000Z").await;
    seed_task(&storage, "2024-05-01", "first", 1, "2024-04-30T09:00:00.000Z").await;

    let client = ApiClient::new(&format!("http://127.0.0.1:{port}")).unwrap();

    let tasks = client
        .tasks_for_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
        .await
        .unwrap();
    let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["first", "second"]);
    assert_eq!(tasks[0].estimate_minutes, 45);

    let empty = client
        .tasks_for_date(NaiveDate::from_ymd_opt(2024, 5, 3).unwrap())
        .await
        .unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn api_client_surfaces_server_errors_with_their_body() {
    let dir = TempDir::new().unwrap();
    let (port, storage) = spawn_test_server(&dir).await;
    storage.pool().close().await;

    let client = ApiClient::new(&format!("http://127.0.0.1:{port}")).unwrap();
    let err = client
        .tasks_for_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("server returned 500"), "got: {msg}");
    assert!(msg.contains("pool"), "500 body should carry the store error text, got: {msg}");
}

#[tokio::test]
async fn api_client_reports_an_unreachable_server() {
    // Bind then drop to get a port with nothing listening on it.
    let free_port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let client = ApiClient::new(&format!("http://127.0.0.1:{free_port}")).unwrap();
    let err = client
        .tasks_for_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Is the server running"), "got: {err:#}");
}

#[tokio::test]
async fn store_failure_is_500_and_the_server_survives() {
    let dir = TempDir::new().unwrap();
    let (port, storage) = spawn_test_server(&dir).await;

    // Pull the store out from under the running server.
    storage.pool().close().await;

    let (status, _, body) = http_get(port, "/tasks?date=2024-05-01").await;
    assert!(status.contains("500"), "expected 500, got: {status}");
    assert!(!body.is_empty(), "500 body should carry the error text");

    // The server is still up: validation still answers.
    let (status, _, body) = http_get(port, "/tasks").await;
    assert!(status.contains("400"), "expected 400, got: {status}");
    assert_eq!(body, "date parameter is required");
}
