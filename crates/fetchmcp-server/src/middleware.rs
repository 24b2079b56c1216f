//! Host and origin guards enforced only in production deployment mode.
//!
//! Each guard is an `axum::middleware::from_fn_with_state` function
//! that inspects headers and either forwards the request or
//! short-circuits with a typed error response.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// Rejects requests whose `Host` header is absent or not present in the
/// configured allow-list. A no-op in development mode.
pub async fn host_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.config.deployment.enforces_guards() || state.config.allowed_hosts.is_empty() {
        return next.run(request).await;
    }

    let host = request
        .headers()
        .get(axum::http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(|h| h.split(':').next().unwrap_or(h).to_string());

    let Some(host) = host else {
        return rejected("missing Host header");
    };

    if state.config.allowed_hosts.iter().any(|m| m.matches(&host)) {
        next.run(request).await
    } else {
        rejected(&format!("host {host} is not in the allow-list"))
    }
}

fn rejected(message: &str) -> Response {
    tracing::warn!(reason = message, "rejected by host guard");
    (StatusCode::FORBIDDEN, Json(json!({ "error": { "type": "host_not_allowed", "message": message } }))).into_response()
}

/// Guards `/metrics/reset` behind a shared key when `METRICS_AUTH_ENABLED`
/// is set. Development mode and a disabled flag both bypass the check.
pub async fn metrics_auth_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.config.deployment.enforces_guards() || !state.config.metrics_auth_enabled {
        return next.run(request).await;
    }

    let provided = request
        .headers()
        .get("x-metrics-key")
        .and_then(|v| v.to_str().ok());

    if provided.is_some() && provided == state.config.metrics_auth_key.as_deref() {
        next.run(request).await
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": { "type": "auth_error", "message": "invalid or missing metrics key" } }))).into_response()
    }
}
