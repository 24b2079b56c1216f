//! The `crawl` tool: dual-mode start/status/cancel over a multi-page
//! job the upstream enhanced fetcher owns. The server's `CrawlJobHandle`
//! is a local pointer, never an authoritative status.

use serde_json::Value;

use fetchmcp_fetch::{EnhancedCallKind, FetchOptions};
use fetchmcp_types::content::{ContentBlock, EmbeddedResource, ToolResponse};
use fetchmcp_types::crawl::{CrawlJobHandle, CrawlJobStatus};

use super::{arg_bool, arg_str};
use crate::state::AppState;

pub async fn handle(state: &AppState, arguments: Value) -> ToolResponse {
    match arg_str(&arguments, "jobId") {
        Some(job_id) if arg_bool(&arguments, "cancel", false) => cancel(state, job_id).await,
        Some(job_id) => status(state, job_id).await,
        None => start(state, arguments).await,
    }
}

async fn start(state: &AppState, arguments: Value) -> ToolResponse {
    let Some(raw_url) = arg_str(&arguments, "url") else {
        return ToolResponse::error("crawl requires a \"url\" argument when starting a new job");
    };
    let url = super::normalize_url(&raw_url);

    let mut body = serde_json::json!({ "url": url });
    if let Some(limit) = arguments.get("limit").and_then(Value::as_u64) {
        body["limit"] = Value::from(limit);
    }
    if let Some(max_depth) = arguments.get("maxDepth").and_then(Value::as_u64) {
        body["maxDepth"] = Value::from(max_depth);
    }
    for key in ["includePaths", "excludePaths"] {
        if let Some(paths) = arguments.get(key).cloned() {
            body[key] = paths;
        }
    }
    if let Some(sitemap) = arg_str(&arguments, "sitemap") {
        body["sitemap"] = Value::String(sitemap);
    }

    let raw = match state.enhanced.call(EnhancedCallKind::Crawl, body, &FetchOptions::default()).await {
        Ok(raw) => raw,
        Err(err) => return ToolResponse::error(err.to_string()),
    };

    let Some(job_id) = raw.get("jobId").or_else(|| raw.get("id")).and_then(Value::as_str) else {
        return ToolResponse::error("upstream crawl response did not include a job id");
    };

    state.crawl_jobs.insert(job_id.to_string(), CrawlJobHandle::new(job_id.to_string(), url));

    ToolResponse::ok(vec![ContentBlock::text(format!("crawl started: jobId={job_id}"))])
}

async fn status(state: &AppState, job_id: String) -> ToolResponse {
    let raw = match state.enhanced.crawl_status(&job_id).await {
        Ok(raw) => raw,
        Err(err) => return ToolResponse::error(err.to_string()),
    };

    let upstream_status = raw.get("status").and_then(Value::as_str).unwrap_or("");
    let status = match upstream_status {
        "submitted" | "queued" | "pending" => CrawlJobStatus::Submitted,
        "scraping" | "running" | "in_progress" => CrawlJobStatus::Scraping,
        "completed" | "done" => CrawlJobStatus::Completed,
        "failed" | "error" => CrawlJobStatus::Failed,
        "cancelled" | "canceled" => CrawlJobStatus::Cancelled,
        _ => CrawlJobStatus::Scraping,
    };

    if let Some(mut handle) = state.crawl_jobs.get_mut(&job_id) {
        handle.status = status;
        if let Some(pages) = raw.get("completed").and_then(Value::as_u64) {
            handle.pages_seen = pages;
        }
    }

    let ts = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let summary = serde_json::json!({
        "jobId": job_id,
        "status": status,
        "pagesSeen": raw.get("completed").cloned().unwrap_or(Value::Null),
        "total": raw.get("total").cloned().unwrap_or(Value::Null),
        "results": raw.get("data").or_else(|| raw.get("results")).cloned().unwrap_or(Value::Array(Vec::new())),
    });

    ToolResponse::ok(vec![ContentBlock::Resource {
        resource: EmbeddedResource {
            uri: format!("fetchmcp://crawl/results/{ts}"),
            name: None,
            mime_type: Some("application/json".to_string()),
            description: None,
            text: Some(summary.to_string()),
        },
    }])
}

async fn cancel(state: &AppState, job_id: String) -> ToolResponse {
    if let Some(handle) = state.crawl_jobs.get(&job_id) {
        if !handle.status.can_cancel() {
            return ToolResponse::error(format!("job {job_id} is in a terminal state and cannot be cancelled"));
        }
    }

    if let Err(err) = state.enhanced.crawl_cancel(&job_id).await {
        return ToolResponse::error(err.to_string());
    }

    if let Some(mut handle) = state.crawl_jobs.get_mut(&job_id) {
        handle.locally_cancelled = true;
        handle.status = CrawlJobStatus::Cancelled;
    }

    ToolResponse::ok(vec![ContentBlock::text(format!("crawl job {job_id} cancelled"))])
}
