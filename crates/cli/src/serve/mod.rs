//! `effeff serve`: HTTP submission service.
//!
//! Endpoints:
//! - GET  /health              - Store liveness (`healthy` / 503 `unhealthy`)
//! - POST /submit/{form_slug}  - Validate and persist a submission (JSON or multipart)
//!
//! Every response carries an `x-request-id`. Requests are rate limited per
//! resolved caller address (default: 60 req/min).

mod handlers;
mod middleware;
mod payload;
mod state;
mod stats;
mod submit;

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Json, Router};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use effeff_storage::{FormStore, StoreConfig, SurrealStore};

use self::handlers::{handle_health, handle_missing_slug, handle_not_found};
use self::middleware::rate_limit_middleware;
use self::state::AppState;
use self::submit::handle_submit;

/// Maximum request body size: 32 MB (multipart uploads).
const MAX_BODY_SIZE: usize = 32 * 1024 * 1024;

/// Rate limit window duration in seconds (1 minute).
const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Reported by GET /health.
const SERVICE_NAME: &str = "effeff-submissions";

/// Resolved `serve` settings.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub port: u16,
    pub store: StoreConfig,
    /// Health probes (one second apart) before the listener starts.
    pub store_wait_attempts: u32,
    /// Requests per minute per caller.
    pub rate_limit: u64,
    pub cors_origins: Vec<String>,
    pub request_timeout: Duration,
}

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// Start the HTTP server.
///
/// Waits for the store first but starts either way; requests that reach an
/// unavailable store answer 500 and `/health` answers 503.
pub async fn start_server(config: ServeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store: Arc<dyn FormStore> = Arc::new(SurrealStore::connect(&config.store));
    wait_for_store(store.as_ref(), config.store_wait_attempts).await;

    tracing::info!("object storage not configured, file uploads disabled");
    tracing::info!(
        rate_limit = config.rate_limit,
        "rate limit: requests per minute per caller"
    );

    let state = Arc::new(AppState::new(store, None, config.rate_limit));
    let app = build_router(state, &config.cors_origins, config.request_timeout);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "effeff submission service listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("server shut down");
    Ok(())
}

/// Assemble routes and middleware around `state`.
pub(crate) fn build_router(
    state: Arc<AppState>,
    cors_origins: &[String],
    request_timeout: Duration,
) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/submit/{form_slug}", post(handle_submit))
        .route("/submit/", post(handle_missing_slug))
        .route("/submit", post(handle_missing_slug))
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o.trim()) {
            // Credentialed CORS cannot use a wildcard origin.
            Ok(v) if v == "*" => {
                tracing::warn!("ignoring wildcard CORS origin, list origins explicitly");
                None
            }
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([HeaderName::from_static("x-request-id")])
        .allow_credentials(true)
        .max_age(Duration::from_secs(300))
}

fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("request handler panicked");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
}

/// Probe the store until it answers or `attempts` probes have failed.
async fn wait_for_store(store: &dyn FormStore, attempts: u32) -> bool {
    tracing::info!("waiting for store");
    for attempt in 1..=attempts {
        match store.health().await {
            Ok(()) => {
                tracing::info!("store connected");
                return true;
            }
            Err(e) => tracing::debug!(attempt, error = %e, "store not ready"),
        }
        if attempt < attempts {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }
    tracing::warn!(attempts, "store not reachable, starting anyway");
    false
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}
