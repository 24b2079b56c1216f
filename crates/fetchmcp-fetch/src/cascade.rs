//! The strategy cascade: picks native vs. enhanced per call, consulting
//! the learned registry and recording diagnostics either way.

use crate::enhanced::EnhancedFetcher;
use crate::native::NativeFetcher;
use crate::{FetchOptions, FetchResult};
use fetchmcp_strategy::StrategyRegistry;
use fetchmcp_types::error::IngestError;
use fetchmcp_types::strategy::{FetchStrategy, OptimizeFor};
use fetchmcp_types::ScrapeDiagnostics;
use std::time::Instant;

#[derive(Debug)]
pub struct CascadeOutcome {
    pub result: FetchResult,
    pub strategy: FetchStrategy,
    pub diagnostics: ScrapeDiagnostics,
}

/// A cascade failure always carries the diagnostics accumulated across
/// every attempt, not just the last error, so the caller can report what
/// was tried.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct CascadeError {
    pub error: IngestError,
    pub diagnostics: ScrapeDiagnostics,
}

pub type CascadeResult<T> = Result<T, CascadeError>;

/// Runs the cascade for one scrape call and, on success, feeds the
/// winning strategy back into the registry for that URL's pattern.
pub async fn cascade_fetch(
    native: &NativeFetcher,
    enhanced: &EnhancedFetcher,
    registry: &StrategyRegistry,
    url: &str,
    optimize_for: OptimizeFor,
    options: &FetchOptions,
) -> CascadeResult<CascadeOutcome> {
    let mut diagnostics = ScrapeDiagnostics::default();

    if options.wants_screenshot() {
        let outcome = run_enhanced(enhanced, url, &mut diagnostics, options).await?;
        registry.upsert_for_url(url, FetchStrategy::Enhanced);
        return Ok(outcome);
    }

    let registry_override = registry.get_strategy(url);
    let skip_native = registry_override == Some(FetchStrategy::Enhanced)
        || optimize_for == OptimizeFor::Speed;

    if !skip_native {
        match run_native(native, url, &mut diagnostics, options).await {
            Ok(result) => {
                registry.upsert_for_url(url, FetchStrategy::Native);
                return Ok(CascadeOutcome { result, strategy: FetchStrategy::Native, diagnostics });
            }
            Err(err) if err.is_auth() => {
                diagnostics.auth_error = true;
                return Err(CascadeError { error: err, diagnostics });
            }
            Err(_) => {}
        }
    }

    let outcome = run_enhanced(enhanced, url, &mut diagnostics, options).await?;
    registry.upsert_for_url(url, FetchStrategy::Enhanced);
    Ok(outcome)
}

async fn run_native(
    native: &NativeFetcher,
    url: &str,
    diagnostics: &mut ScrapeDiagnostics,
    options: &FetchOptions,
) -> Result<FetchResult, IngestError> {
    let start = Instant::now();
    let outcome = native.fetch(url, options).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;
    match &outcome {
        Ok(_) => diagnostics.record_attempt("native", elapsed_ms, None),
        Err(err) => diagnostics.record_attempt("native", elapsed_ms, Some(&err.to_string())),
    }
    outcome
}

async fn run_enhanced(
    enhanced: &EnhancedFetcher,
    url: &str,
    diagnostics: &mut ScrapeDiagnostics,
    options: &FetchOptions,
) -> CascadeResult<CascadeOutcome> {
    let start = Instant::now();
    let outcome = enhanced.scrape(url, &options.formats, options).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;
    match outcome {
        Ok(result) => {
            diagnostics.record_attempt("enhanced", elapsed_ms, None);
            Ok(CascadeOutcome { result, strategy: FetchStrategy::Enhanced, diagnostics: diagnostics.clone() })
        }
        Err(err) => {
            diagnostics.record_attempt("enhanced", elapsed_ms, Some(&err.to_string()));
            if err.is_auth() {
                diagnostics.auth_error = true;
            }
            Err(CascadeError { error: err, diagnostics: diagnostics.clone() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EnhancedFormat;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn cost_mode_prefers_native_on_success() {
        let native_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_string("native body"))
            .mount(&native_server)
            .await;
        let enhanced_server = MockServer::start().await;

        let native = NativeFetcher::new().unwrap();
        let enhanced = EnhancedFetcher::new(enhanced_server.uri(), "key").unwrap();
        let registry = StrategyRegistry::new(None);

        let outcome = cascade_fetch(
            &native,
            &enhanced,
            &registry,
            &format!("{}/ok", native_server.uri()),
            OptimizeFor::Cost,
            &FetchOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.strategy, FetchStrategy::Native);
        assert_eq!(outcome.result.content, b"native body");
    }

    #[tokio::test]
    async fn cost_mode_falls_back_to_enhanced_on_native_failure() {
        let native_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fail"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&native_server)
            .await;
        let enhanced_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/scrape"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"markdown": "enhanced body"})))
            .mount(&enhanced_server)
            .await;

        let native = NativeFetcher::new().unwrap();
        let enhanced = EnhancedFetcher::new(enhanced_server.uri(), "key").unwrap();
        let registry = StrategyRegistry::new(None);

        let outcome = cascade_fetch(
            &native,
            &enhanced,
            &registry,
            &format!("{}/fail", native_server.uri()),
            OptimizeFor::Cost,
            &FetchOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.strategy, FetchStrategy::Enhanced);
        assert_eq!(outcome.diagnostics.strategies_attempted, vec!["native", "enhanced"]);
    }

    #[tokio::test]
    async fn speed_mode_skips_native_entirely() {
        let native_server = MockServer::start().await;
        let enhanced_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/scrape"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"markdown": "enhanced body"})))
            .mount(&enhanced_server)
            .await;

        let native = NativeFetcher::new().unwrap();
        let enhanced = EnhancedFetcher::new(enhanced_server.uri(), "key").unwrap();
        let registry = StrategyRegistry::new(None);

        let outcome = cascade_fetch(
            &native,
            &enhanced,
            &registry,
            &format!("{}/anything", native_server.uri()),
            OptimizeFor::Speed,
            &FetchOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.strategy, FetchStrategy::Enhanced);
        assert_eq!(outcome.diagnostics.strategies_attempted, vec!["enhanced"]);
    }

    #[tokio::test]
    async fn auth_failure_on_native_short_circuits_fallback() {
        let native_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/denied"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&native_server)
            .await;
        let enhanced_server = MockServer::start().await;

        let native = NativeFetcher::new().unwrap();
        let enhanced = EnhancedFetcher::new(enhanced_server.uri(), "key").unwrap();
        let registry = StrategyRegistry::new(None);

        let err = cascade_fetch(
            &native,
            &enhanced,
            &registry,
            &format!("{}/denied", native_server.uri()),
            OptimizeFor::Cost,
            &FetchOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(err.error.is_auth());
        assert!(err.diagnostics.auth_error);
    }

    #[tokio::test]
    async fn screenshot_request_bypasses_cascade() {
        let native_server = MockServer::start().await;
        let enhanced_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/scrape"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "markdown": "body",
                "screenshot": "base64data",
            })))
            .mount(&enhanced_server)
            .await;

        let native = NativeFetcher::new().unwrap();
        let enhanced = EnhancedFetcher::new(enhanced_server.uri(), "key").unwrap();
        let registry = StrategyRegistry::new(None);
        let options = FetchOptions { formats: vec![EnhancedFormat::Screenshot], ..FetchOptions::default() };

        let outcome = cascade_fetch(
            &native,
            &enhanced,
            &registry,
            &format!("{}/anything", native_server.uri()),
            OptimizeFor::Cost,
            &options,
        )
        .await
        .unwrap();

        assert_eq!(outcome.strategy, FetchStrategy::Enhanced);
        assert_eq!(outcome.result.screenshot_base64.as_deref(), Some("base64data"));
    }
}
