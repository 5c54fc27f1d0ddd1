//! HTTP middleware: rate limiting and bearer authentication.

use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::state::AppState;
use crate::auth::{AuthError, MIN_TOKEN_LEN};

/// Rate limiting middleware. Checks per-IP request rate before routing.
pub(crate) async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let ip = addr.ip();
    match state.rate_limiter.check(ip).await {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            let body = serde_json::json!({
                "error": "rate limit exceeded",
                "retry_after": retry_after,
            });
            (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
        }
    }
}

/// Bearer authentication middleware.
///
/// Every request (except /health) must carry `Authorization: Bearer
/// <token>`; the token is verified against the auth service before any
/// pipeline work, so unauthenticated callers never reach the
/// classification endpoint. On success the resolved
/// [`crate::auth::AuthenticatedUser`] is attached as a request extension.
pub(crate) async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    // /health is exempt from auth (for load balancer health checks)
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let auth_header = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(t) => t.trim(),
        None => {
            return super::json_error(
                StatusCode::UNAUTHORIZED,
                &AuthError::MissingCredential.to_string(),
            )
            .into_response()
        }
    };

    // Cheap format pre-check before the auth-service round trip.
    if token.len() < MIN_TOKEN_LEN {
        return super::json_error(
            StatusCode::UNAUTHORIZED,
            &AuthError::MalformedToken.to_string(),
        )
        .into_response();
    }

    match state.verifier.verify(token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(AuthError::Backend(detail)) => {
            log::error!("auth service failure: {detail}");
            super::json_error(StatusCode::INTERNAL_SERVER_ERROR, "authentication unavailable")
                .into_response()
        }
        Err(err) => {
            log::warn!("rejected credential: {err}");
            super::json_error_details(
                StatusCode::UNAUTHORIZED,
                "Authentication failed",
                &err.to_string(),
            )
            .into_response()
        }
    }
}
