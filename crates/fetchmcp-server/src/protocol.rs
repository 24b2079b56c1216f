//! JSON-RPC 2.0 envelope types and the method dispatch both transports
//! (HTTP and stdio) drive identically.
//!
//! Tool schemas are static data tables, not assembled at runtime.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use fetchmcp_session::Session;
use fetchmcp_types::session::SessionId;

use crate::error::{ServerError, ServerResult};
use crate::handlers;
use crate::state::AppState;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// A notification carries no `id`; the server never replies to one.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorObject>,
}

impl JsonRpcResponse {
    pub fn ok(id: Option<Value>, result: Value) -> Self {
        Self { jsonrpc: JSONRPC_VERSION, id: id.unwrap_or(Value::Null), result: Some(result), error: None }
    }

    pub fn error(id: Option<Value>, error: JsonRpcErrorObject) -> Self {
        Self { jsonrpc: JSONRPC_VERSION, id: id.unwrap_or(Value::Null), result: None, error: Some(error) }
    }
}

/// A server-initiated message not in direct response to a request (a
/// streamed progress notification, for instance). Stored and replayed
/// by the session's event stream.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self { jsonrpc: JSONRPC_VERSION, method: method.into(), params }
    }
}

/// The four tool schemas, emitted verbatim by `tools/list`. Kept as a
/// static table instead of assembled from validators at startup.
pub fn tool_definitions() -> Vec<Value> {
    vec![
        json!({
            "name": "scrape",
            "description": "Fetch a single URL and return its content, optionally cleaned to Markdown or LLM-extracted.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "url": {"type": "string"},
                    "timeout": {"type": "integer", "default": 60000},
                    "maxChars": {"type": "integer", "default": 100000},
                    "startIndex": {"type": "integer", "default": 0},
                    "resultHandling": {"type": "string", "enum": ["saveOnly", "saveAndReturn", "returnOnly"], "default": "saveAndReturn"},
                    "forceRescrape": {"type": "boolean", "default": false},
                    "cleanScrape": {"type": "boolean", "default": true},
                    "extract": {"type": "string"},
                    "formats": {"type": "array", "items": {"type": "string"}},
                    "actions": {"type": "array", "items": {"type": "object"}}
                },
                "required": ["url"]
            }
        }),
        json!({
            "name": "map",
            "description": "Discover URLs reachable from a site.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "url": {"type": "string"},
                    "search": {"type": "string"},
                    "maxResults": {"type": "integer", "default": 200},
                    "sitemap": {"type": "string", "enum": ["skip", "include", "only"], "default": "include"},
                    "includeSubdomains": {"type": "boolean", "default": true},
                    "ignoreQueryParameters": {"type": "boolean", "default": true},
                    "location": {"type": "string"},
                    "startIndex": {"type": "integer", "default": 0},
                    "resultHandling": {"type": "string", "enum": ["saveOnly", "saveAndReturn", "returnOnly"], "default": "saveAndReturn"}
                },
                "required": ["url"]
            }
        }),
        json!({
            "name": "search",
            "description": "Run a web search query.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "limit": {"type": "integer", "default": 5},
                    "sources": {"type": "array", "items": {"type": "string", "enum": ["web", "images", "news"]}},
                    "categories": {"type": "array", "items": {"type": "string", "enum": ["github", "research", "pdf"]}},
                    "country": {"type": "string"},
                    "lang": {"type": "string", "default": "en"},
                    "location": {"type": "string"},
                    "tbs": {"type": "string"},
                    "scrapeOptions": {"type": "object"}
                },
                "required": ["query"]
            }
        }),
        json!({
            "name": "crawl",
            "description": "Start, poll, or cancel a multi-page crawl job.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "url": {"type": "string"},
                    "jobId": {"type": "string"},
                    "cancel": {"type": "boolean", "default": false},
                    "limit": {"type": "integer"},
                    "maxDepth": {"type": "integer"},
                    "includePaths": {"type": "array", "items": {"type": "string"}},
                    "excludePaths": {"type": "array", "items": {"type": "string"}},
                    "sitemap": {"type": "string", "enum": ["skip", "include", "only"]}
                }
            }
        }),
    ]
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {},
            "resources": {}
        },
        "serverInfo": {
            "name": "fetchmcp-server",
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

/// Dispatches one frame for an already-identified session, returning
/// `None` for notifications (the server never replies to those).
pub async fn handle_frame(
    state: &AppState,
    session: &Arc<Session>,
    frame: JsonRpcRequest,
) -> Option<JsonRpcResponse> {
    session.touch();
    let id = frame.id.clone();
    let is_notification = frame.is_notification();

    let outcome = dispatch_method(state, session, &frame).await;

    if is_notification {
        if let Err(err) = outcome {
            tracing::warn!(method = %frame.method, error = %err, "notification handling failed");
        }
        return None;
    }

    Some(match outcome {
        Ok(result) => JsonRpcResponse::ok(id, result),
        Err(err) => JsonRpcResponse::error(id, err.to_json_rpc_error()),
    })
}

async fn dispatch_method(state: &AppState, session: &Arc<Session>, frame: &JsonRpcRequest) -> ServerResult<Value> {
    match frame.method.as_str() {
        "initialize" => {
            session.mark_initialized().map_err(ServerError::from)?;
            Ok(initialize_result())
        }
        "notifications/initialized" => {
            session.mark_serving();
            Ok(Value::Null)
        }
        "tools/list" => Ok(json!({ "tools": tool_definitions() })),
        "tools/call" => {
            let params = frame.params.clone().ok_or_else(|| ServerError::InvalidParams("missing params".into()))?;
            let name = params
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| ServerError::InvalidParams("missing tool name".into()))?
                .to_string();
            let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
            let response = handlers::tools::dispatch_tool_call(state, &name, arguments).await?;
            Ok(serde_json::to_value(response).map_err(|e| ServerError::InvalidParams(e.to_string()))?)
        }
        "resources/list" => {
            let resources = handlers::resources::list(state).await?;
            Ok(json!({ "resources": resources }))
        }
        "resources/read" => {
            let params = frame.params.clone().ok_or_else(|| ServerError::InvalidParams("missing params".into()))?;
            let uri = params
                .get("uri")
                .and_then(Value::as_str)
                .ok_or_else(|| ServerError::InvalidParams("missing uri".into()))?;
            let contents = handlers::resources::read(state, uri).await?;
            Ok(json!({ "contents": [contents] }))
        }
        other => Err(ServerError::MethodNotFound(other.to_string())),
    }
}

/// Identifies which session header/id a frame belongs to, distinct from
/// the HTTP vs. stdio plumbing that extracts the raw id. `stream_id` for
/// the event store is the session id's string form.
pub fn stream_id_for(session_id: &SessionId) -> String {
    session_id.to_string()
}
