//! The `search` tool: a web search query run through the enhanced
//! fetcher, with one synthetic resource per requested source.

use serde_json::Value;

use fetchmcp_fetch::{EnhancedCallKind, FetchOptions};
use fetchmcp_types::content::{ContentBlock, EmbeddedResource, ToolResponse};

use super::arg_str;
use crate::state::AppState;

const VALID_SOURCES: &[&str] = &["web", "images", "news"];
const VALID_CATEGORIES: &[&str] = &["github", "research", "pdf"];
const DEFAULT_LIMIT: u64 = 5;

pub async fn handle(state: &AppState, arguments: Value) -> ToolResponse {
    let Some(query) = arg_str(&arguments, "query").filter(|q| !q.trim().is_empty()) else {
        return ToolResponse::error("search requires a non-empty \"query\" string argument");
    };

    let limit = arguments.get("limit").and_then(Value::as_u64).unwrap_or(DEFAULT_LIMIT).clamp(1, 100);

    let sources = match string_list(&arguments, "sources", VALID_SOURCES) {
        Ok(sources) if sources.is_empty() => vec!["web".to_string()],
        Ok(sources) => sources,
        Err(bad) => return ToolResponse::error(format!("invalid search source: {bad}")),
    };
    let categories = match string_list(&arguments, "categories", VALID_CATEGORIES) {
        Ok(categories) => categories,
        Err(bad) => return ToolResponse::error(format!("invalid search category: {bad}")),
    };

    let mut body = serde_json::json!({
        "query": query,
        "limit": limit,
        "sources": sources,
        "categories": categories,
        "lang": arg_str(&arguments, "lang").unwrap_or_else(|| "en".to_string()),
    });
    for key in ["country", "location", "tbs"] {
        if let Some(value) = arg_str(&arguments, key) {
            body[key] = Value::String(value);
        }
    }
    if let Some(scrape_options) = arguments.get("scrapeOptions").cloned() {
        body["scrapeOptions"] = scrape_options;
    }

    let raw = match state.enhanced.call(EnhancedCallKind::Search, body, &FetchOptions::default()).await {
        Ok(raw) => raw,
        Err(err) => return ToolResponse::error(err.to_string()),
    };

    let ts = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let content = sources
        .iter()
        .map(|source| {
            let results = raw.get(source).cloned().unwrap_or(Value::Array(Vec::new()));
            ContentBlock::Resource {
                resource: EmbeddedResource {
                    uri: format!("fetchmcp://search/{source}/{ts}"),
                    name: Some(source.clone()),
                    mime_type: Some("application/json".to_string()),
                    description: None,
                    text: Some(results.to_string()),
                },
            }
        })
        .collect();

    ToolResponse::ok(content)
}

fn string_list(args: &Value, key: &str, allowed: &[&str]) -> Result<Vec<String>, String> {
    let Some(items) = args.get(key).and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for item in items {
        let Some(s) = item.as_str() else {
            return Err(item.to_string());
        };
        if !allowed.contains(&s) {
            return Err(s.to_string());
        }
        out.push(s.to_string());
    }
    Ok(out)
}
