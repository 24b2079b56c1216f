//! HTTP surface: the streamable-HTTP MCP transport plus health, metrics,
//! and (conditionally) OAuth discovery endpoints.
//!
//! Layers apply in order: host/auth guard, then tracing, then timeout,
//! then CORS, all wrapping a single `/mcp` resource that carries a
//! JSON-RPC 2.0 session transport.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use fetchmcp_types::event::EventId;
use fetchmcp_types::session::SessionId;

use crate::config::DeploymentMode;
use crate::error::{ServerError, ServerResult};
use crate::middleware::{host_guard, metrics_auth_guard};
use crate::protocol::{self, JsonRpcRequest};
use crate::state::AppState;

pub const SESSION_HEADER: &str = "mcp-session-id";

pub fn build_router(state: AppState) -> Router {
    let cors = build_cors(&state);

    let mcp = Router::new()
        .route("/mcp", post(post_mcp).get(get_mcp).delete(delete_mcp))
        .route_layer(from_fn_with_state(state.clone(), host_guard));

    let oauth = Router::new()
        .route("/register", post(oauth_disabled))
        .route("/authorize", get(oauth_disabled));

    let metrics = Router::new()
        .route("/metrics", get(metrics_text))
        .route("/metrics/json", get(metrics_json))
        .route(
            "/metrics/reset",
            post(metrics_reset).route_layer(from_fn_with_state(state.clone(), metrics_auth_guard)),
        );

    Router::new()
        .route("/health", get(health))
        .merge(mcp)
        .merge(oauth)
        .merge(metrics)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(tower_http::timeout::TimeoutLayer::new(Duration::from_secs(120)))
        .with_state(state)
}

fn build_cors(state: &AppState) -> CorsLayer {
    let expose = HeaderName::from_static("mcp-session-id");
    if state.config.allowed_origins.is_empty() {
        return CorsLayer::permissive().expose_headers([expose]);
    }
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    CorsLayer::new().allow_origin(origins).expose_headers([expose]).allow_methods(tower_http::cors::Any)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "transport": "http",
        "sessions": state.sessions.len(),
        "deployment": matches!(state.config.deployment, DeploymentMode::Production),
    }))
}

async fn metrics_text(State(state): State<AppState>) -> String {
    let snap = state.metrics.snapshot();
    format!(
        "requests_total {}\nrequests_error {}\ncache_hits {}\ncache_misses {}\ncache_hit_rate {:.4}\nlatency_p50_ms {}\nlatency_p95_ms {}\nlatency_p99_ms {}\n",
        snap.requests_total,
        snap.requests_error,
        snap.cache_hits,
        snap.cache_misses,
        snap.cache_hit_rate,
        snap.latency_p50_ms,
        snap.latency_p95_ms,
        snap.latency_p99_ms,
    )
}

async fn metrics_json(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::to_value(state.metrics.snapshot()).unwrap_or_default())
}

async fn metrics_reset(State(state): State<AppState>) -> StatusCode {
    state.metrics.reset();
    StatusCode::NO_CONTENT
}

async fn oauth_disabled(State(state): State<AppState>) -> Response {
    if state.config.enable_oauth {
        return (StatusCode::NOT_IMPLEMENTED, Json(json!({ "error": "oauth flow not implemented" }))).into_response();
    }
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": { "type": "oauth_disabled", "message": "OAuth is disabled on this deployment" } })),
    )
        .into_response()
}

fn session_id_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()).map(|s| SessionId(s.to_string()))
}

async fn post_mcp(State(state): State<AppState>, headers: HeaderMap, Json(frame): Json<JsonRpcRequest>) -> Response {
    let existing = session_id_from_headers(&headers);

    let session = if frame.method == "initialize" {
        if existing.is_some() {
            return ServerError::InvalidRequest("initialize must not carry a session id".to_string()).into_response();
        }
        state.sessions.create()
    } else {
        let Some(id) = existing else {
            return ServerError::Session(fetchmcp_session::SessionError::MissingOrInvalidInit).into_response();
        };
        match state.sessions.get(&id) {
            Ok(session) => session,
            Err(err) => return ServerError::from(err).into_response(),
        }
    };

    let is_notification = frame.is_notification();
    let session_id = session.id.clone();
    let response = protocol::handle_frame(&state, &session, frame).await;

    match response {
        None => {
            let _ = is_notification;
            (StatusCode::ACCEPTED, session_header(&session_id)).into_response()
        }
        Some(body) => (StatusCode::OK, session_header(&session_id), Json(body)).into_response(),
    }
}

fn session_header(id: &SessionId) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        headers.insert(HeaderName::from_static("mcp-session-id"), value);
    }
    headers
}

#[derive(Debug, Deserialize)]
struct StreamQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

async fn get_mcp(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<StreamQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, Response> {
    let id = session_id_from_headers(&headers)
        .or_else(|| query.session_id.map(SessionId))
        .ok_or_else(|| ServerError::Session(fetchmcp_session::SessionError::MissingOrInvalidInit).into_response())?;
    let session = state.sessions.get(&id).map_err(|e| ServerError::from(e).into_response())?;
    session.touch();

    let stream_id = protocol::stream_id_for(&id);
    let last_event_id = headers
        .get("last-event-id")
        .and_then(|v| v.to_str().ok())
        .and_then(EventId::parse);

    let replayed = std::sync::Mutex::new(Vec::new());
    state
        .events
        .replay_after(&stream_id, last_event_id.as_ref(), &|event| {
            replayed.lock().unwrap().push(event.clone());
        })
        .await;
    let replay = futures::stream::iter(replayed.into_inner().unwrap());

    let (broadcast_tx, mut broadcast_rx) = tokio::sync::broadcast::channel(256);
    state.stream_hub.insert(id.clone(), broadcast_tx);

    let live = async_stream::stream! {
        while let Ok(event) = broadcast_rx.recv().await {
            yield event;
        }
    };

    let combined = replay.chain(live).map(|event| {
        Ok(Event::default().id(event.id.to_string()).json_data(event.message).unwrap_or_else(|_| Event::default()))
    });

    Ok(Sse::new(combined).keep_alive(KeepAlive::default()))
}

async fn delete_mcp(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(id) = session_id_from_headers(&headers) else {
        return ServerError::Session(fetchmcp_session::SessionError::MissingOrInvalidInit).into_response();
    };
    state.sessions.close(&id);
    state.events.drop_stream(&protocol::stream_id_for(&id)).await;
    state.stream_hub.remove(&id);
    StatusCode::NO_CONTENT.into_response()
}

pub async fn serve(state: AppState, bind_addr: std::net::SocketAddr) -> ServerResult<()> {
    let app = build_router(state.clone());
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|e| ServerError::InvalidRequest(format!("failed to bind {bind_addr}: {e}")))?;

    tracing::info!(%bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;

    state.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async { tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler") };
    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
