//! The scrape pipeline: cache lookup, the fetch cascade, content
//! processing, and persistence, coalesced per in-flight fingerprint.
//!
//! Cache lookup happens before the fetch cascade, read-through style;
//! the fingerprint coalescer uses the same `DashMap`-backed concurrent
//! keyed-map shape as the session table to track in-flight requests.

mod coalesce;

pub use coalesce::FingerprintCoalescer;

use dashmap::DashMap;
use fetchmcp_content::{clean_html, detect_content_type, DetectedType, ExtractionProvider};
use fetchmcp_fetch::{cascade_fetch, EnhancedFetcher, FetchOptions, NativeFetcher};
use fetchmcp_store::{ResourceStore, WriteMeta};
use fetchmcp_strategy::StrategyRegistry;
use fetchmcp_types::error::{IngestError, IngestResult};
use fetchmcp_types::resource::ResourceTier;
use fetchmcp_types::strategy::OptimizeFor;
use fetchmcp_types::{ResultHandling, ScrapeDiagnostics};
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub url: String,
    pub optimize_for: OptimizeFor,
    pub force_rescrape: bool,
    pub result_handling: ResultHandling,
    pub clean_scrape: bool,
    pub extract_prompt: Option<String>,
    pub fetch_options: FetchOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeSource {
    Cache,
    Fetched,
}

#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub display_content: String,
    pub tier: ResourceTier,
    pub source: ScrapeSource,
    pub timestamp_nanos: u128,
    pub raw_uri: Option<String>,
    pub cleaned_uri: Option<String>,
    pub extracted_uri: Option<String>,
    /// The fetcher strategy that produced this content. `None` for a
    /// cache hit, since the store does not replay which strategy
    /// originally wrote the entry to the caller.
    pub strategy: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("scrape failed after trying {attempted:?}: {message}")]
    Exhausted { message: String, attempted: Vec<String>, diagnostics: ScrapeDiagnostics },
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Builds the `(url, extract)` fingerprint in-flight requests coalesce on.
fn fingerprint(url: &str, extract_prompt: Option<&str>) -> String {
    match extract_prompt {
        Some(p) => format!("{url}\u{0}{p}"),
        None => url.to_string(),
    }
}

pub struct ScrapePipeline {
    store: Arc<ResourceStore>,
    strategy: Arc<StrategyRegistry>,
    native: Arc<NativeFetcher>,
    enhanced: Arc<EnhancedFetcher>,
    extraction: Arc<dyn ExtractionProvider>,
    coalescer: FingerprintCoalescer,
    per_host_concurrency: usize,
    host_semaphores: DashMap<String, Arc<Semaphore>>,
}

impl ScrapePipeline {
    pub fn new(
        store: Arc<ResourceStore>,
        strategy: Arc<StrategyRegistry>,
        native: Arc<NativeFetcher>,
        enhanced: Arc<EnhancedFetcher>,
        extraction: Arc<dyn ExtractionProvider>,
    ) -> Self {
        Self::with_per_host_concurrency(store, strategy, native, enhanced, extraction, 4)
    }

    /// `per_host_concurrency` bounds how many in-flight fetches may target
    /// the same host at once, independent of the fingerprint coalescer
    /// (which dedupes identical requests, not merely same-host ones).
    pub fn with_per_host_concurrency(
        store: Arc<ResourceStore>,
        strategy: Arc<StrategyRegistry>,
        native: Arc<NativeFetcher>,
        enhanced: Arc<EnhancedFetcher>,
        extraction: Arc<dyn ExtractionProvider>,
        per_host_concurrency: usize,
    ) -> Self {
        Self {
            store,
            strategy,
            native,
            enhanced,
            extraction,
            coalescer: FingerprintCoalescer::default(),
            per_host_concurrency: per_host_concurrency.max(1),
            host_semaphores: DashMap::new(),
        }
    }

    fn host_semaphore(&self, url: &str) -> Arc<Semaphore> {
        let host = url::Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_string)).unwrap_or_else(|| url.to_string());
        self.host_semaphores
            .entry(host)
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_host_concurrency)))
            .clone()
    }

    pub async fn run(&self, request: ScrapeRequest) -> PipelineResult<ScrapeOutcome> {
        let key = fingerprint(&request.url, request.extract_prompt.as_deref());
        let outcome = self
            .coalescer
            .run(key, || self.run_uncoalesced(request.clone()))
            .await;
        Arc::try_unwrap(outcome).unwrap_or_else(|arc| clone_result(&arc))
    }

    async fn run_uncoalesced(&self, request: ScrapeRequest) -> PipelineResult<ScrapeOutcome> {
        let skip_cache = request.force_rescrape
            || request.result_handling.skips_cache_lookup()
            || request.fetch_options.wants_screenshot();

        if !skip_cache {
            if let Some(cached) = self
                .store
                .find_best_cached(&request.url, request.extract_prompt.as_deref())
                .await
                .map_err(|e| IngestError::internal(e.to_string()))?
            {
                let uri = cached.header.uri.to_string();
                let (raw_uri, cleaned_uri, extracted_uri) = match cached.header.tier {
                    ResourceTier::Raw => (Some(uri), None, None),
                    ResourceTier::Cleaned => (None, Some(uri), None),
                    ResourceTier::Extracted => (None, None, Some(uri)),
                };
                return Ok(ScrapeOutcome {
                    display_content: cached.content_as_str(),
                    tier: cached.header.tier,
                    source: ScrapeSource::Cache,
                    timestamp_nanos: cached.header.timestamp_nanos,
                    raw_uri,
                    cleaned_uri,
                    extracted_uri,
                    strategy: None,
                });
            }
        }

        let permit = self
            .host_semaphore(&request.url)
            .acquire_owned()
            .await
            .expect("host semaphore is never closed");

        let fetched = cascade_fetch(
            &self.native,
            &self.enhanced,
            &self.strategy,
            &request.url,
            request.optimize_for,
            &request.fetch_options,
        )
        .await;
        drop(permit);
        let fetched = fetched.map_err(|err| PipelineError::Exhausted {
            message: err.error.to_string(),
            attempted: err.diagnostics.strategies_attempted.clone(),
            diagnostics: err.diagnostics,
        })?;

        let raw_body = fetched.result.content;
        let detected = detect_content_type(&raw_body);
        let raw_text = String::from_utf8_lossy(&raw_body).into_owned();

        let cleaned = if request.clean_scrape && detected == DetectedType::Html {
            Some(clean_html(&raw_text))
        } else {
            None
        };

        let extracted = if let Some(prompt) = &request.extract_prompt {
            if self.extraction.is_configured() {
                let basis = cleaned.as_deref().unwrap_or(&raw_text);
                match self.extraction.extract(basis, prompt).await {
                    Ok(outcome) => Some(outcome.text),
                    Err(err) => {
                        tracing::warn!(url = %request.url, error = %err, "extraction failed, using pre-extraction content");
                        None
                    }
                }
            } else {
                None
            }
        } else {
            None
        };

        let mime_type = detected.mime_type().to_string();
        let meta = WriteMeta { mime_type, source_strategy: Some(fetched.strategy.as_str().to_string()), extract_prompt: None };

        let write_result = if request.result_handling.should_persist() {
            Some(
                self.store
                    .write_multi(
                        &request.url,
                        raw_body.clone(),
                        cleaned.clone().map(String::into_bytes),
                        extracted.clone().map(|text| (text.into_bytes(), request.extract_prompt.clone().unwrap_or_default())),
                        meta,
                    )
                    .await
                    .map_err(|e| IngestError::internal(e.to_string()))?,
            )
        } else {
            None
        };

        let (display_content, tier) = match (&extracted, &cleaned) {
            (Some(text), _) => (text.clone(), ResourceTier::Extracted),
            (None, Some(text)) => (text.clone(), ResourceTier::Cleaned),
            (None, None) => (raw_text, ResourceTier::Raw),
        };

        Ok(ScrapeOutcome {
            display_content,
            tier,
            source: ScrapeSource::Fetched,
            timestamp_nanos: chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default() as u128,
            raw_uri: write_result.as_ref().map(|r| r.raw_uri.to_string()),
            cleaned_uri: write_result.as_ref().and_then(|r| r.cleaned_uri.as_ref().map(|u| u.to_string())),
            extracted_uri: write_result.as_ref().and_then(|r| r.extracted_uri.as_ref().map(|u| u.to_string())),
            strategy: Some(fetched.strategy.as_str().to_string()),
        })
    }
}

fn clone_result(arc: &Arc<PipelineResult<ScrapeOutcome>>) -> PipelineResult<ScrapeOutcome> {
    match arc.as_ref() {
        Ok(outcome) => Ok(outcome.clone()),
        Err(PipelineError::Ingest(err)) => Err(PipelineError::Ingest(IngestError::internal(err.to_string()))),
        Err(PipelineError::Exhausted { message, attempted, diagnostics }) => Err(PipelineError::Exhausted {
            message: message.clone(),
            attempted: attempted.clone(),
            diagnostics: diagnostics.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fetchmcp_content::NoExtractionProvider;
    use fetchmcp_metrics::MetricsCollector;
    use fetchmcp_store::{EvictionLimits, MemoryBackend, ResourceStore};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn harness(native_base: String, enhanced_base: String) -> ScrapePipeline {
        let store = Arc::new(ResourceStore::new(
            Arc::new(MemoryBackend::new(EvictionLimits::default())),
            Arc::new(MetricsCollector::default()),
            Duration::from_secs(3600),
        ));
        let strategy = Arc::new(StrategyRegistry::new(None));
        let native = Arc::new(NativeFetcher::new().unwrap());
        let enhanced = Arc::new(EnhancedFetcher::new(enhanced_base, "key").unwrap());
        let extraction = Arc::new(NoExtractionProvider);
        let _ = native_base;
        ScrapePipeline::new(store, strategy, native, enhanced, extraction)
    }

    fn request(url: &str) -> ScrapeRequest {
        ScrapeRequest {
            url: url.to_string(),
            optimize_for: OptimizeFor::Cost,
            force_rescrape: false,
            result_handling: ResultHandling::SaveAndReturn,
            clean_scrape: true,
            extract_prompt: None,
            fetch_options: FetchOptions::default(),
        }
    }

    #[tokio::test]
    async fn native_success_is_cached_on_repeat_call() {
        let native_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Hello"))
            .mount(&native_server)
            .await;
        let enhanced_server = MockServer::start().await;

        let pipeline = harness(native_server.uri(), enhanced_server.uri());
        let url = format!("{}/a", native_server.uri());

        let first = pipeline.run(request(&url)).await.unwrap();
        assert_eq!(first.source, ScrapeSource::Fetched);
        assert!(first.raw_uri.is_some());

        let second = pipeline.run(request(&url)).await.unwrap();
        assert_eq!(second.source, ScrapeSource::Cache);
        assert_eq!(second.display_content, first.display_content);
    }

    #[tokio::test]
    async fn fallback_to_enhanced_on_native_failure_updates_strategy_registry() {
        let native_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&native_server)
            .await;
        let enhanced_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/scrape"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"markdown": "# Title"})))
            .mount(&enhanced_server)
            .await;

        let pipeline = harness(native_server.uri(), enhanced_server.uri());
        let url = format!("{}/b", native_server.uri());

        let outcome = pipeline.run(request(&url)).await.unwrap();
        assert_eq!(outcome.source, ScrapeSource::Fetched);
        assert!(outcome.raw_uri.is_some());
    }

    #[tokio::test]
    async fn auth_error_aborts_without_trying_enhanced() {
        let native_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/denied"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&native_server)
            .await;
        let enhanced_server = MockServer::start().await;

        let pipeline = harness(native_server.uri(), enhanced_server.uri());
        let url = format!("{}/denied", native_server.uri());

        let err = pipeline.run(request(&url)).await.unwrap_err();
        match err {
            PipelineError::Exhausted { attempted, diagnostics, .. } => {
                assert_eq!(attempted, vec!["native".to_string()]);
                assert!(diagnostics.auth_error);
            }
            other => panic!("expected exhausted error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn host_semaphore_is_shared_across_urls_on_the_same_host() {
        let native_server_base = "https://example.com".to_string();
        let pipeline = harness(native_server_base, "https://upstream.example".to_string());
        let a = pipeline.host_semaphore("https://example.com/a");
        let b = pipeline.host_semaphore("https://example.com/b");
        let c = pipeline.host_semaphore("https://other.example/a");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(a.available_permits(), 4);
    }

    #[tokio::test]
    async fn return_only_does_not_persist() {
        let native_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/c"))
            .respond_with(ResponseTemplate::new(200).set_body_string("plain body"))
            .mount(&native_server)
            .await;
        let enhanced_server = MockServer::start().await;

        let pipeline = harness(native_server.uri(), enhanced_server.uri());
        let mut req = request(&format!("{}/c", native_server.uri()));
        req.clean_scrape = false;
        req.result_handling = ResultHandling::ReturnOnly;

        let outcome = pipeline.run(req).await.unwrap();
        assert!(outcome.raw_uri.is_none());
        assert!(outcome.cleaned_uri.is_none());
        assert_eq!(outcome.display_content, "plain body");
    }
}
