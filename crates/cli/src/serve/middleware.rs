//! HTTP middleware: caller resolution and rate limiting.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::state::AppState;

/// Resolve the caller address: first `X-Forwarded-For` entry, then
/// `X-Real-IP`, then the connection address.
pub(crate) fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    };

    if let Some(forwarded) = header("x-forwarded-for") {
        let first = forwarded.split(',').next().unwrap_or_default().trim();
        return first.to_string();
    }
    if let Some(real_ip) = header("x-real-ip") {
        return real_ip.to_string();
    }
    match remote {
        Some(addr) => addr.ip().to_string(),
        None => "unknown".to_string(),
    }
}

/// Connection address recorded by `into_make_service_with_connect_info`.
pub(crate) fn remote_addr(request: &Request) -> Option<SocketAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// Rate limiting middleware. Checks the per-caller request rate before routing.
pub(crate) async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let caller = client_ip(request.headers(), remote_addr(&request));
    match state.rate_limiter.check(&caller).await {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            tracing::warn!(caller = %caller, retry_after, "rate limit exceeded");
            let body = serde_json::json!({
                "error": "rate limit exceeded",
                "retry_after": retry_after,
            });
            (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
        }
    }
}
