//! The `scrape` tool: fetches a single URL through the pipeline and
//! shapes the outcome into a tool-call content envelope.

use serde_json::Value;

use fetchmcp_fetch::{EnhancedFormat, FetchOptions};
use fetchmcp_pipeline::{PipelineError, ScrapeOutcome, ScrapePipeline, ScrapeRequest, ScrapeSource};
use fetchmcp_types::content::{ContentBlock, EmbeddedResource, ToolResponse};
use fetchmcp_types::resource::ResourceTier;
use fetchmcp_types::ResultHandling;

use super::{arg_bool, arg_str, arg_str_array, arg_u64, arg_usize, normalize_url, paginate};
use crate::state::AppState;

const DEFAULT_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_MAX_CHARS: usize = 100_000;

pub async fn handle(state: &AppState, arguments: Value) -> ToolResponse {
    let Some(raw_url) = arg_str(&arguments, "url") else {
        return ToolResponse::error("scrape requires a \"url\" string argument");
    };
    let url = normalize_url(&raw_url);

    let result_handling = match arguments.get("resultHandling").and_then(Value::as_str) {
        None => ResultHandling::SaveAndReturn,
        Some("saveOnly") => ResultHandling::SaveOnly,
        Some("saveAndReturn") => ResultHandling::SaveAndReturn,
        Some("returnOnly") => ResultHandling::ReturnOnly,
        Some(other) => return ToolResponse::error(format!("invalid resultHandling: {other}")),
    };

    let mut formats = Vec::new();
    for raw in arg_str_array(&arguments, "formats") {
        match serde_json::from_value::<EnhancedFormat>(Value::String(raw.clone())) {
            Ok(format) => formats.push(format),
            Err(_) => return ToolResponse::error(format!("unknown format: {raw}")),
        }
    }
    let actions = arguments.get("actions").and_then(Value::as_array).cloned().unwrap_or_default();

    let request = ScrapeRequest {
        url,
        optimize_for: state.config.optimize_for,
        force_rescrape: arg_bool(&arguments, "forceRescrape", false),
        result_handling,
        clean_scrape: arg_bool(&arguments, "cleanScrape", true),
        extract_prompt: arg_str(&arguments, "extract"),
        fetch_options: FetchOptions {
            timeout_ms: arg_u64(&arguments, "timeout", DEFAULT_TIMEOUT_MS),
            formats,
            actions,
            extra: Default::default(),
        },
    };

    let start_index = arg_usize(&arguments, "startIndex", 0);
    let max_chars = arg_usize(&arguments, "maxChars", DEFAULT_MAX_CHARS);

    match state.pipeline.run(request).await {
        Ok(outcome) => build_response(outcome, result_handling, start_index, max_chars),
        Err(PipelineError::Ingest(err)) => ToolResponse::error(err.to_string()),
        Err(PipelineError::Exhausted { message, attempted, diagnostics }) => {
            let diagnostics = serde_json::json!({
                "attempted": attempted,
                "strategyErrors": diagnostics.strategy_errors,
                "timingMs": diagnostics.timing_ms,
                "authError": diagnostics.auth_error,
            });
            ToolResponse::error_with_diagnostics(message, &diagnostics)
        }
    }
}

fn build_response(outcome: ScrapeOutcome, handling: ResultHandling, start_index: usize, max_chars: usize) -> ToolResponse {
    if !handling.should_return_content() {
        let mut content = Vec::new();
        if let Some(uri) = &outcome.raw_uri {
            content.push(ContentBlock::resource_link(uri.clone(), None));
        }
        if let Some(uri) = &outcome.cleaned_uri {
            content.push(ContentBlock::resource_link(uri.clone(), None));
        }
        if let Some(uri) = &outcome.extracted_uri {
            content.push(ContentBlock::resource_link(uri.clone(), None));
        }
        return ToolResponse::ok(content);
    }

    let (sliced, next_index) = paginate(&outcome.display_content, start_index, max_chars);
    let text = match next_index {
        Some(n) => format!("{sliced}\n\n[content truncated; continue with startIndex={n}]"),
        None => sliced,
    };

    if handling.should_persist() {
        let uri = match outcome.tier {
            ResourceTier::Raw => outcome.raw_uri.clone(),
            ResourceTier::Cleaned => outcome.cleaned_uri.clone(),
            ResourceTier::Extracted => outcome.extracted_uri.clone(),
        };
        match uri {
            Some(uri) => ToolResponse::ok(vec![ContentBlock::Resource {
                resource: EmbeddedResource { uri, name: None, mime_type: None, description: None, text: Some(text) },
            }]),
            None => ToolResponse::ok(vec![ContentBlock::text(text)]),
        }
    } else {
        let source = match (outcome.source, outcome.strategy.as_deref()) {
            (ScrapeSource::Cache, _) => "cache".to_string(),
            (ScrapeSource::Fetched, Some(strategy)) => strategy.to_string(),
            (ScrapeSource::Fetched, None) => "unknown".to_string(),
        };
        ToolResponse::ok(vec![ContentBlock::text(format!("{text}\n\n[source: {source}]"))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(source: ScrapeSource, strategy: Option<&str>, tier: ResourceTier) -> ScrapeOutcome {
        ScrapeOutcome {
            display_content: "hello world".to_string(),
            tier,
            source,
            timestamp_nanos: 0,
            raw_uri: Some("memory://raw/x_1".to_string()),
            cleaned_uri: None,
            extracted_uri: None,
            strategy: strategy.map(str::to_string),
        }
    }

    #[test]
    fn return_only_text_names_the_fetch_source() {
        let response = build_response(
            outcome(ScrapeSource::Fetched, Some("native"), ResourceTier::Raw),
            ResultHandling::ReturnOnly,
            0,
            1000,
        );
        let ContentBlock::Text { text } = &response.content[0] else { panic!("expected text block") };
        assert!(text.ends_with("[source: native]"));
    }

    #[test]
    fn save_and_return_wraps_content_in_a_resource_block() {
        let response = build_response(
            outcome(ScrapeSource::Fetched, Some("native"), ResourceTier::Raw),
            ResultHandling::SaveAndReturn,
            0,
            1000,
        );
        assert!(matches!(response.content[0], ContentBlock::Resource { .. }));
    }

    #[test]
    fn save_only_skips_pagination_and_emits_links() {
        let response = build_response(
            outcome(ScrapeSource::Fetched, Some("enhanced"), ResourceTier::Raw),
            ResultHandling::SaveOnly,
            0,
            3,
        );
        assert!(matches!(response.content[0], ContentBlock::ResourceLink { .. }));
    }

    #[test]
    fn truncated_content_carries_a_continuation_marker() {
        let response = build_response(
            outcome(ScrapeSource::Cache, None, ResourceTier::Raw),
            ResultHandling::ReturnOnly,
            0,
            5,
        );
        let ContentBlock::Text { text } = &response.content[0] else { panic!("expected text block") };
        assert!(text.contains("startIndex=5"));
    }
}
