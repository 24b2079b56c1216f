//! The `map` tool: site-wide URL discovery via the enhanced fetcher.
//! Results never touch the three-tier scrape store — they're wrapped in
//! a synthetic `fetchmcp://map/...` resource URI instead.

use std::collections::HashSet;

use serde_json::Value;

use fetchmcp_fetch::{EnhancedCallKind, FetchOptions};
use fetchmcp_types::content::{ContentBlock, EmbeddedResource, ToolResponse};
use fetchmcp_types::ResultHandling;

use super::{arg_bool, arg_str, arg_usize, normalize_url};
use crate::state::AppState;

const DEFAULT_MAX_RESULTS: usize = 200;
const MAX_RESULTS_CEILING: usize = 5000;

pub async fn handle(state: &AppState, arguments: Value) -> ToolResponse {
    let Some(raw_url) = arg_str(&arguments, "url") else {
        return ToolResponse::error("map requires a \"url\" string argument");
    };
    let url = normalize_url(&raw_url);

    let sitemap = match arguments.get("sitemap").and_then(Value::as_str) {
        None => "include",
        Some(mode @ ("skip" | "include" | "only")) => mode,
        Some(other) => return ToolResponse::error(format!("invalid sitemap mode: {other}")),
    };

    let result_handling = match arguments.get("resultHandling").and_then(Value::as_str) {
        None => ResultHandling::SaveAndReturn,
        Some("saveOnly") => ResultHandling::SaveOnly,
        Some("saveAndReturn") => ResultHandling::SaveAndReturn,
        Some("returnOnly") => ResultHandling::ReturnOnly,
        Some(other) => return ToolResponse::error(format!("invalid resultHandling: {other}")),
    };

    let max_results = arg_usize(&arguments, "maxResults", DEFAULT_MAX_RESULTS).clamp(1, MAX_RESULTS_CEILING);
    let start_index = arg_usize(&arguments, "startIndex", 0);

    let mut body = serde_json::json!({
        "url": url,
        "limit": max_results,
        "sitemap": sitemap,
        "includeSubdomains": arg_bool(&arguments, "includeSubdomains", true),
        "ignoreQueryParameters": arg_bool(&arguments, "ignoreQueryParameters", true),
    });
    if let Some(search) = arg_str(&arguments, "search") {
        body["search"] = Value::String(search);
    }
    if let Some(location) = arg_str(&arguments, "location") {
        body["location"] = Value::String(location);
    }

    let raw = match state.enhanced.call(EnhancedCallKind::Map, body, &FetchOptions::default()).await {
        Ok(raw) => raw,
        Err(err) => return ToolResponse::error(err.to_string()),
    };

    let urls: Vec<String> = raw
        .get("links")
        .or_else(|| raw.get("urls"))
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();

    let unique_hostnames: HashSet<String> = urls
        .iter()
        .filter_map(|u| url::Url::parse(u).ok())
        .filter_map(|parsed| parsed.host_str().map(str::to_string))
        .collect();

    let end = start_index.saturating_add(max_results).min(urls.len());
    let page = urls.get(start_index.min(urls.len())..end).unwrap_or_default().to_vec();
    let next_start_index = if end < urls.len() { Some(end) } else { None };

    let summary = serde_json::json!({
        "total": urls.len(),
        "uniqueHostnames": unique_hostnames.len(),
        "urls": page,
        "nextStartIndex": next_start_index,
    });

    let host = url::Url::parse(&url).ok().and_then(|u| u.host_str().map(str::to_string)).unwrap_or_else(|| "unknown".to_string());
    let ts = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let cursor = start_index / max_results.max(1);
    let uri = format!("fetchmcp://map/{host}/{ts}/page-{cursor}");

    if !result_handling.should_return_content() {
        return ToolResponse::ok(vec![ContentBlock::resource_link(uri, Some("application/json".to_string()))]);
    }

    ToolResponse::ok(vec![ContentBlock::Resource {
        resource: EmbeddedResource {
            uri,
            name: None,
            mime_type: Some("application/json".to_string()),
            description: None,
            text: Some(summary.to_string()),
        },
    }])
}
