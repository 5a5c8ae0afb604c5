//! Integration tests for the `effeff serve` HTTP API.
//!
//! Each test starts an in-process fake of the document store (axum on an
//! ephemeral port), launches the server binary against it on a unique port,
//! makes HTTP requests, and verifies the responses and the commands the
//! store received.

use std::io::Read;
use std::net::TcpStream;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

/// Atomic port counter to avoid port conflicts between parallel tests.
/// Base port is derived from process ID so parallel `cargo test --workspace` runs
/// (which spawn separate test binaries) don't collide on the same port range.
static NEXT_PORT: AtomicU16 = AtomicU16::new(0);
static PORT_INIT: std::sync::Once = std::sync::Once::new();

fn next_port() -> u16 {
    PORT_INIT.call_once(|| {
        let base = 20000 + (std::process::id() as u16 % 20000);
        NEXT_PORT.store(base, Ordering::SeqCst);
    });
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

// ──────────────────────────────────────────────
// Fake store
// ──────────────────────────────────────────────

/// Every command received, with the namespace header it carried.
type CommandLog = Arc<Mutex<Vec<(String, String)>>>;

fn ok(rows: Value) -> Json<Value> {
    Json(json!([{ "status": "OK", "time": "10µs", "result": rows }]))
}

async fn fake_sql(State(log): State<CommandLog>, headers: HeaderMap, body: String) -> Json<Value> {
    let ns = headers
        .get("surreal-ns")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    log.lock().unwrap().push((ns, body.clone()));

    let command = body.trim_start();
    if command.starts_with("SELECT * FROM form") {
        if command.contains("slug = 'kontakt'") {
            return ok(json!([{
                "id": "form:abc123",
                "title": "Kontakt",
                "slug": "kontakt",
                "status": "published",
                "settings": {"redirect_url": "https://example.com/danke", "show_progress": null},
                "created_at": "2025-01-01T00:00:00Z"
            }]));
        }
        return ok(json!([]));
    }
    if command.starts_with("SELECT * FROM question") {
        return ok(json!([
            {"id": "question:q2", "form_id": "form:abc123", "type": "email", "title": "E-Mail", "position": 1, "required": false},
            {"id": "q1", "form_id": "form:abc123", "type": "text", "title": "Name", "position": 0, "required": true}
        ]));
    }
    if command.starts_with("CREATE submission") {
        return ok(json!([{"id": "submission:x1", "form_id": "form:abc123"}]));
    }
    if command.starts_with("UPSERT form_stats") {
        return ok(json!([{"id": "form_stats:s1", "total_submissions": 1}]));
    }
    Json(json!([{ "status": "ERR", "result": "unexpected command" }]))
}

/// Start the fake store on a background thread; returns its base URL and
/// the command log.
fn start_fake_store() -> (String, CommandLog) {
    let log: CommandLog = Arc::default();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind fake store");
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/sql", post(fake_sql))
        .with_state(log.clone());

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });

    (format!("http://{}", addr), log)
}

// ──────────────────────────────────────────────
// Server process and raw HTTP helpers
// ──────────────────────────────────────────────

/// Helper: start `effeff serve` on the given port against `store_url`.
fn start_server(port: u16, store_url: &str) -> Child {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_effeff"));
    cmd.arg("serve")
        .arg("--port")
        .arg(port.to_string())
        .arg("--store-url")
        .arg(store_url)
        .arg("--store-ns")
        .arg("formflow_test")
        .arg("--store-wait-attempts")
        .arg("1")
        .arg("--store-timeout-secs")
        .arg("2");
    // Redirect stdout/stderr to avoid blocking
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());

    let child = cmd.spawn().expect("failed to start effeff serve");
    // Wait for server to be ready by polling the port
    for _ in 0..50 {
        if TcpStream::connect(format!("127.0.0.1:{}", port)).is_ok() {
            return child;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    child
}

fn stop(mut child: Child) {
    child.kill().ok();
    child.wait().ok();
}

/// Helper: send a raw HTTP request and return (status, headers, body).
fn http_request(
    port: u16,
    method: &str,
    path: &str,
    extra_headers: &[(&str, &str)],
    body: Option<&str>,
) -> (u16, String, String) {
    let mut stream = TcpStream::connect(format!("127.0.0.1:{}", port)).expect("failed to connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();

    let mut header_lines = String::new();
    for (name, value) in extra_headers {
        header_lines.push_str(&format!("{}: {}\r\n", name, value));
    }
    if let Some(b) = body {
        header_lines.push_str(&format!(
            "Content-Type: application/json\r\nContent-Length: {}\r\n",
            b.len()
        ));
    }

    let request = format!(
        "{} {} HTTP/1.1\r\nHost: localhost:{}\r\n{}Connection: close\r\n\r\n{}",
        method,
        path,
        port,
        header_lines,
        body.unwrap_or_default()
    );
    std::io::Write::write_all(&mut stream, request.as_bytes()).expect("failed to write");

    let mut response = String::new();
    let _ = stream.read_to_string(&mut response);

    parse_http_response_full(&response)
}

fn http_get(port: u16, path: &str) -> (u16, String) {
    let (status, _, body) = http_request(port, "GET", path, &[], None);
    (status, body)
}

fn http_post(port: u16, path: &str, body: &str) -> (u16, String) {
    let (status, _, body) = http_request(port, "POST", path, &[], Some(body));
    (status, body)
}

/// Extract a header value from raw headers string.
fn extract_header<'a>(headers: &'a str, name: &str) -> Option<&'a str> {
    let name_lower = name.to_lowercase();
    for line in headers.lines() {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().to_lowercase() == name_lower {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Parse an HTTP response into (status_code, headers_string, body).
fn parse_http_response_full(response: &str) -> (u16, String, String) {
    let parts: Vec<&str> = response.splitn(2, "\r\n\r\n").collect();
    let headers = parts.first().unwrap_or(&"").to_string();
    let body = parts.get(1).unwrap_or(&"").to_string();

    let status_line = headers.lines().next().unwrap_or("");
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(0);

    let body = if extract_header(&headers, "transfer-encoding") == Some("chunked") {
        decode_chunked(&body)
    } else {
        body
    };

    (status, headers, body)
}

/// Decode chunked transfer encoding.
fn decode_chunked(data: &str) -> String {
    let mut result = String::new();
    let mut remaining = data;

    while let Some(line_end) = remaining.find("\r\n") {
        let size = match usize::from_str_radix(remaining[..line_end].trim(), 16) {
            Ok(s) => s,
            Err(_) => break,
        };
        if size == 0 {
            break;
        }
        let chunk_start = line_end + 2;
        let chunk_end = chunk_start + size;
        if chunk_end > remaining.len() {
            result.push_str(&remaining[chunk_start..]);
            break;
        }
        result.push_str(&remaining[chunk_start..chunk_end]);
        remaining = remaining.get(chunk_end + 2..).unwrap_or("");
    }

    result
}

fn commands(log: &CommandLog) -> Vec<String> {
    log.lock().unwrap().iter().map(|(_, c)| c.clone()).collect()
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[test]
fn health_reports_healthy_store() {
    let (store_url, _) = start_fake_store();
    let port = next_port();
    let child = start_server(port, &store_url);

    let (status, body) = http_get(port, "/health");
    stop(child);

    assert_eq!(status, 200);
    let json: Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "effeff-submissions");
}

#[test]
fn health_reports_unreachable_store() {
    let port = next_port();
    let child = start_server(port, "http://127.0.0.1:9");

    let (status, body) = http_get(port, "/health");
    stop(child);

    assert_eq!(status, 503);
    let json: Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["status"], "unhealthy");
    assert_eq!(json["error"], "store unavailable");
}

#[test]
fn submit_end_to_end() {
    let (store_url, log) = start_fake_store();
    let port = next_port();
    let child = start_server(port, &store_url);

    let (status, body) = http_post(
        port,
        "/submit/kontakt",
        r#"{"answers":[{"question_id":"q1","value":"John"}],"metadata":{"duration_seconds":30}}"#,
    );

    // The stats update is detached; give it a moment to reach the store.
    let mut sent = Vec::new();
    for _ in 0..50 {
        sent = commands(&log);
        if sent.iter().any(|c| c.starts_with("UPSERT form_stats")) {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    stop(child);

    assert_eq!(status, 201, "body: {body}");
    let json: Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["success"], true);
    assert_eq!(json["id"], "submission:x1");
    assert_eq!(json["redirect_url"], "https://example.com/danke");

    assert!(sent[0].contains("slug = 'kontakt' AND status = 'published'"));
    assert!(sent[1].contains("WHERE form_id = form:abc123 ORDER BY position ASC"));
    let create = sent
        .iter()
        .find(|c| c.starts_with("CREATE submission"))
        .expect("create command");
    assert!(create.contains(r#""answer_value":"John""#));
    assert!(create.contains(r#""duration_seconds":30"#));
    let upsert = sent
        .iter()
        .find(|c| c.starts_with("UPSERT form_stats"))
        .expect("stats command");
    assert!(upsert.contains("<float> 30"));

    let namespaces: Vec<String> = log.lock().unwrap().iter().map(|(ns, _)| ns.clone()).collect();
    assert!(namespaces.iter().all(|ns| ns == "formflow_test"));
}

#[test]
fn submit_validation_failure_returns_422() {
    let (store_url, log) = start_fake_store();
    let port = next_port();
    let child = start_server(port, &store_url);

    let (status, body) = http_post(
        port,
        "/submit/kontakt",
        r#"{"answers":[{"question_id":"question:q2","value":"user@"}]}"#,
    );
    stop(child);

    assert_eq!(status, 422);
    let json: Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["error"], "Validation failed");
    assert_eq!(json["details"]["q1"], "'Name' ist ein Pflichtfeld");
    assert_eq!(json["details"]["question:q2"], "Ungültige E-Mail-Adresse");
    assert!(!commands(&log).iter().any(|c| c.starts_with("CREATE")));
}

#[test]
fn submit_unknown_form_returns_404() {
    let (store_url, _) = start_fake_store();
    let port = next_port();
    let child = start_server(port, &store_url);

    let (status, body) = http_post(port, "/submit/unbekannt", r#"{"answers":[]}"#);
    stop(child);

    assert_eq!(status, 404);
    let json: Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["error"], "Form not found or not published");
}

#[test]
fn submit_bad_slug_never_reaches_store() {
    let (store_url, log) = start_fake_store();
    let port = next_port();
    let child = start_server(port, &store_url);

    let (status, _) = http_post(port, "/submit/Bad_Slug", r#"{"answers":[]}"#);
    stop(child);

    assert_eq!(status, 400);
    assert!(commands(&log).is_empty());
}

#[test]
fn submit_with_store_down_returns_500() {
    let port = next_port();
    let child = start_server(port, "http://127.0.0.1:9");

    let (status, body) = http_post(
        port,
        "/submit/kontakt",
        r#"{"answers":[{"question_id":"q1","value":"John"}]}"#,
    );
    stop(child);

    assert_eq!(status, 500);
    let json: Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json, json!({"error": "Failed to load form"}));
}

#[test]
fn unknown_route_returns_404_with_request_id() {
    let (store_url, _) = start_fake_store();
    let port = next_port();
    let child = start_server(port, &store_url);

    let (status, headers, body) = http_request(port, "GET", "/nonexistent", &[], None);
    stop(child);

    assert_eq!(status, 404);
    assert!(extract_header(&headers, "x-request-id").is_some());
    let json: Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["error"], "not found");
}

#[test]
fn cors_allows_default_dev_origin() {
    let (store_url, _) = start_fake_store();
    let port = next_port();
    let child = start_server(port, &store_url);

    let (_, headers, _) = http_request(
        port,
        "GET",
        "/health",
        &[("Origin", "http://localhost:3000")],
        None,
    );
    let (_, foreign, _) = http_request(
        port,
        "GET",
        "/health",
        &[("Origin", "https://evil.example.com")],
        None,
    );
    stop(child);

    assert_eq!(
        extract_header(&headers, "access-control-allow-origin"),
        Some("http://localhost:3000")
    );
    assert_eq!(extract_header(&foreign, "access-control-allow-origin"), None);
}
