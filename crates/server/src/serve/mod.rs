//! `phishguard serve` — HTTP JSON API for the analysis pipeline.
//!
//! Exposes the pipeline as an async HTTP service using `axum` + `tokio`.
//! Supports concurrent request handling; each request is an independent
//! unit of work scoped to the caller's credentials.
//!
//! Security features:
//! - Bearer authentication on every endpoint except /health
//! - CORS headers on all responses (any origin — the dashboard may be
//!   served from anywhere)
//! - Per-IP rate limiting (default: 60 req/min, configurable)
//! - Request body size limit
//!
//! Endpoints:
//! - GET  /health   - Server status (exempt from auth)
//! - POST /analyze  - Run the analysis pipeline on one message
//! - GET  /logs     - The caller's scam-log records, newest first
//!
//! All responses use Content-Type: application/json.

mod handlers;
mod middleware;
mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Json, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::auth::CredentialVerifier;
use crate::classify::ClassificationProvider;
use crate::config::Config;
use crate::pipeline::AnalysisPipeline;
use phishguard_storage::ScamLogStore;

use self::handlers::{handle_analyze, handle_health, handle_list_logs, handle_not_found};
use self::middleware::{auth_middleware, rate_limit_middleware};
pub use self::state::{AppState, RateLimiter};

/// Maximum request body size: 10 MB (audio payloads are base64).
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Rate limit window duration in seconds (1 minute).
const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// Like [`json_error`] but with a `details` field for the caller.
fn json_error_details(status: StatusCode, message: &str, details: &str) -> impl IntoResponse {
    (
        status,
        Json(serde_json::json!({"error": message, "details": details})),
    )
}

/// Build the router over shared application state.
///
/// Separated from [`start_server`] so integration tests can mount the
/// router with test doubles on an ephemeral port.
pub fn build_router(state: Arc<AppState>) -> Router {
    // CORS: cross-origin access is permitted from any origin for this API.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/analyze", post(handle_analyze))
        .route("/logs", get(handle_list_logs))
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Start the HTTP server on the given port with the injected components.
///
/// Components are constructed once at startup from [`Config`] and passed
/// in explicitly, never looked up ambiently inside the pipeline.
pub async fn start_server(
    port: u16,
    config: &Config,
    verifier: Arc<dyn CredentialVerifier>,
    classifier: Arc<dyn ClassificationProvider>,
    store: Arc<dyn ScamLogStore>,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState {
        verifier,
        pipeline: AnalysisPipeline::new(classifier, store.clone()),
        store,
        rate_limiter: RateLimiter::new(config.rate_limit),
    });

    log::info!("rate limit: {} requests per minute per IP", config.rate_limit);

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("phishguard listening on http://{addr}");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    log::info!("server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    log::info!("received shutdown signal");
}
