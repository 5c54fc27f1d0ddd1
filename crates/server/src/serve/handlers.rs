//! HTTP route handlers: health, analyze, logs.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;

use super::state::AppState;
use super::{json_error, json_error_details};
use crate::auth::AuthenticatedUser;
use crate::classify::ClassificationError;
use crate::pipeline::PipelineError;
use phishguard_core::validate::RawAnalysisRequest;
use phishguard_storage::AuthScope;

/// Default number of records returned by GET /logs.
const DEFAULT_LOG_LIMIT: usize = 100;

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

/// POST /analyze
///
/// Runs the pipeline for the authenticated caller and returns the
/// verdict. The error envelope's status code reflects the failure kind:
/// 400 validation, 429 throttled upstream, 402 exhausted credits,
/// 502 other upstream failure, 500 persistence or local failure.
pub(crate) async fn handle_analyze(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(raw): Json<RawAnalysisRequest>,
) -> impl IntoResponse {
    match state.pipeline.run(&user, raw).await {
        Ok(verdict) => (StatusCode::OK, Json(verdict)).into_response(),
        Err(PipelineError::Validation(err)) => {
            json_error_details(StatusCode::BAD_REQUEST, "Validation failed", &err.details())
                .into_response()
        }
        Err(PipelineError::Classification(ClassificationError::RateLimited)) => json_error(
            StatusCode::TOO_MANY_REQUESTS,
            "AI rate limit exceeded. Please try again later.",
        )
        .into_response(),
        Err(PipelineError::Classification(ClassificationError::QuotaExhausted)) => json_error(
            StatusCode::PAYMENT_REQUIRED,
            "AI credits exhausted. Please add credits to continue.",
        )
        .into_response(),
        // A local failure inside the classification client is not an
        // upstream fault; it gets the generic 500 envelope.
        Err(PipelineError::Classification(ClassificationError::Internal(detail))) => {
            log::error!("classification client error for user {}: {detail}", user.user_id);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
        Err(PipelineError::Classification(err)) => {
            log::error!("classification failed for user {}: {err}", user.user_id);
            json_error(StatusCode::BAD_GATEWAY, "AI analysis failed").into_response()
        }
        Err(PipelineError::Persistence(err)) => {
            log::error!("scam log insert failed for user {}: {err}", user.user_id);
            json_error_details(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save analysis",
                &err.to_string(),
            )
            .into_response()
        }
        Err(PipelineError::Internal(detail)) => {
            log::error!("internal pipeline error for user {}: {detail}", user.user_id);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct LogsQuery {
    limit: Option<usize>,
}

/// GET /logs
///
/// The caller's own scam-log records, newest first. The storage scope is
/// built from the verified identity on the request, never from a query
/// parameter.
pub(crate) async fn handle_list_logs(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<LogsQuery>,
) -> impl IntoResponse {
    let scope = AuthScope {
        user_id: user.user_id.clone(),
        bearer_token: user.bearer_token.clone(),
    };
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT);

    match state.store.list_scam_logs(&scope, limit).await {
        Ok(records) => {
            let response = serde_json::json!({ "logs": records });
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => {
            log::error!("scam log list failed for user {}: {err}", user.user_id);
            json_error_details(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load logs",
                &err.to_string(),
            )
            .into_response()
        }
    }
}
