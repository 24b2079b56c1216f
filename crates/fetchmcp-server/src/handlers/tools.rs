//! `tools/call` dispatch: routes a tool name to its handler. An unknown
//! name is a protocol-level failure (`-32601`), not a tool error —
//! every known tool always returns `Ok`, folding its own failures into
//! the response envelope's `isError` flag instead.

use fetchmcp_types::content::ToolResponse;
use serde_json::Value;

use super::{crawl, map, scrape, search};
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

pub async fn dispatch_tool_call(state: &AppState, name: &str, arguments: Value) -> ServerResult<ToolResponse> {
    match name {
        "scrape" => Ok(scrape::handle(state, arguments).await),
        "map" => Ok(map::handle(state, arguments).await),
        "search" => Ok(search::handle(state, arguments).await),
        "crawl" => Ok(crawl::handle(state, arguments).await),
        other => Err(ServerError::MethodNotFound(format!("unknown tool: {other}"))),
    }
}
