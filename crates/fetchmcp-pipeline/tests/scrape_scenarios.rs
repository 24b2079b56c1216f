//! End-to-end scrape-pipeline scenarios exercising the public
//! `ScrapePipeline` surface against real (mocked) HTTP fetchers: a cache
//! hit that never touches the cascade, and concurrent identical scrapes
//! coalescing into a single fetch.

use std::sync::Arc;
use std::time::Duration;

use fetchmcp_content::NoExtractionProvider;
use fetchmcp_fetch::{EnhancedFetcher, FetchOptions, NativeFetcher};
use fetchmcp_metrics::MetricsCollector;
use fetchmcp_pipeline::{ScrapePipeline, ScrapeRequest, ScrapeSource};
use fetchmcp_store::{EvictionLimits, MemoryBackend, ResourceStore, WriteMeta};
use fetchmcp_strategy::StrategyRegistry;
use fetchmcp_types::resource::ResourceTier;
use fetchmcp_types::strategy::OptimizeFor;
use fetchmcp_types::ResultHandling;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

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
async fn cache_hit_never_consults_the_cascade() {
    let store = Arc::new(ResourceStore::new(
        Arc::new(MemoryBackend::new(EvictionLimits::default())),
        Arc::new(MetricsCollector::default()),
        Duration::from_secs(3600),
    ));

    let url = "https://example.com/a";
    store
        .write(url, ResourceTier::Cleaned, b"cached body".to_vec(), WriteMeta::default())
        .await
        .unwrap();

    let native_server = MockServer::start().await;
    let enhanced_server = MockServer::start().await;
    // No mocks are registered; if the cascade reaches either server the
    // unmatched request will surface as a 404 and fail the assertions below.

    let strategy = Arc::new(StrategyRegistry::new(None));
    let native = Arc::new(NativeFetcher::new().unwrap());
    let enhanced = Arc::new(EnhancedFetcher::new(enhanced_server.uri(), "key").unwrap());
    let pipeline = ScrapePipeline::new(store, strategy.clone(), native, enhanced, Arc::new(NoExtractionProvider));

    let outcome = pipeline.run(request(url)).await.unwrap();

    assert_eq!(outcome.source, ScrapeSource::Cache);
    assert_eq!(outcome.display_content, "cached body");
    assert!(outcome.strategy.is_none());
    assert!(strategy.snapshot().is_empty());
    assert!(native_server.received_requests().await.unwrap().is_empty());
    assert!(enhanced_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_identical_scrapes_coalesce_into_one_fetch() {
    let native_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_body_string("slow body").set_delay(Duration::from_millis(200)))
        .mount(&native_server)
        .await;
    let enhanced_server = MockServer::start().await;

    let store = Arc::new(ResourceStore::new(
        Arc::new(MemoryBackend::new(EvictionLimits::default())),
        Arc::new(MetricsCollector::default()),
        Duration::from_secs(3600),
    ));
    let strategy = Arc::new(StrategyRegistry::new(None));
    let native = Arc::new(NativeFetcher::new().unwrap());
    let enhanced = Arc::new(EnhancedFetcher::new(enhanced_server.uri(), "key").unwrap());
    let pipeline = Arc::new(ScrapePipeline::new(store, strategy, native, enhanced, Arc::new(NoExtractionProvider)));

    let url = format!("{}/slow", native_server.uri());
    let mut calls = Vec::new();
    for _ in 0..5 {
        let pipeline = pipeline.clone();
        let url = url.clone();
        calls.push(tokio::spawn(async move { pipeline.run(request(&url)).await.unwrap() }));
    }

    for call in calls {
        let outcome = call.await.unwrap();
        assert_eq!(outcome.display_content, "slow body");
    }

    assert_eq!(native_server.received_requests().await.unwrap().len(), 1);
}
