//! Process-wide application state: the metrics collector, resource
//! store, strategy registry, fetchers, and content processors, plus the
//! session runtime and the bookkeeping the tool handlers and transports
//! share.
//!
//! One `Clone`-cheap struct of `Arc`s built once at startup and
//! threaded through every handler via axum's `State` extractor.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::broadcast;

use fetchmcp_content::{ExtractionProvider, NoExtractionProvider};
use fetchmcp_fetch::{EnhancedFetcher, NativeFetcher};
use fetchmcp_metrics::MetricsCollector;
use fetchmcp_pipeline::ScrapePipeline;
use fetchmcp_session::{spawn_idle_sweeper, EventStore, IdleSweeperHandle, MemoryEventStore, SessionTable};
use fetchmcp_store::{FilesystemBackend, MemoryBackend, ResourceBackend, ResourceStore};
use fetchmcp_strategy::StrategyRegistry;
use fetchmcp_types::crawl::CrawlJobHandle;
use fetchmcp_types::event::StreamEvent;
use fetchmcp_types::session::SessionId;

use crate::config::{ResourceStorageKind, ServiceConfig};

/// Everything a tool handler or transport needs, cloned cheaply per
/// request since every field is an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub metrics: Arc<MetricsCollector>,
    pub store: Arc<ResourceStore>,
    pub strategy: Arc<StrategyRegistry>,
    pub native: Arc<NativeFetcher>,
    pub enhanced: Arc<EnhancedFetcher>,
    pub pipeline: Arc<ScrapePipeline>,
    pub sessions: Arc<SessionTable>,
    pub events: Arc<dyn EventStore>,
    /// Server-initiated events for a live `GET /mcp` subscriber, keyed
    /// by session id. Replay of past events goes through `events`;
    /// this only carries events as they're produced.
    pub stream_hub: Arc<DashMap<SessionId, broadcast::Sender<StreamEvent>>>,
    /// Crawl jobs this process knows about, keyed by upstream job id.
    pub crawl_jobs: Arc<DashMap<String, CrawlJobHandle>>,
    sweeper: Arc<IdleSweeperHandle>,
    strategy_flush: Arc<fetchmcp_strategy::FlushHandle>,
}

impl AppState {
    pub async fn build(config: ServiceConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let metrics = Arc::new(MetricsCollector::new(config.ring_buffer_size));

        let backend: Arc<dyn ResourceBackend> = match config.resource_storage {
            ResourceStorageKind::Memory => Arc::new(MemoryBackend::new(fetchmcp_store::EvictionLimits {
                ttl_secs: config.resource_ttl_secs,
                max_items: config.resource_max_items,
                max_bytes: config.resource_max_bytes,
            })),
            ResourceStorageKind::Filesystem => {
                let root = config.resource_root.clone().unwrap_or_else(|| "./data/resources".into());
                Arc::new(
                    FilesystemBackend::open(
                        root,
                        fetchmcp_store::EvictionLimits {
                            ttl_secs: config.resource_ttl_secs,
                            max_items: config.resource_max_items,
                            max_bytes: config.resource_max_bytes,
                        },
                    )
                    .await?,
                )
            }
        };
        let store = Arc::new(ResourceStore::new(
            backend,
            metrics.clone(),
            Duration::from_secs(config.sweep_interval_secs),
        ));

        let strategy = Arc::new(StrategyRegistry::new(config.strategy_registry_path.clone()));
        if let Some(path) = &config.strategy_registry_path {
            if path.exists() {
                strategy.load_seed(path).await;
            }
        }
        let strategy_flush = Arc::new(
            strategy
                .clone()
                .spawn_flush_task(Duration::from_secs(config.sweep_interval_secs)),
        );

        let native = Arc::new(NativeFetcher::new()?);
        let enhanced = Arc::new(EnhancedFetcher::new(config.upstream_base_url.clone(), config.upstream_api_key.clone())?);

        let extraction: Arc<dyn ExtractionProvider> = Arc::new(NoExtractionProvider);

        let pipeline = Arc::new(ScrapePipeline::with_per_host_concurrency(
            store.clone(),
            strategy.clone(),
            native.clone(),
            enhanced.clone(),
            extraction,
            config.per_host_concurrency,
        ));

        let sessions = Arc::new(SessionTable::new(Duration::from_secs(config.session_idle_timeout_secs)));
        let events: Arc<dyn EventStore> = Arc::new(MemoryEventStore::new());
        let sweeper = Arc::new(spawn_idle_sweeper(
            sessions.clone(),
            events.clone(),
            Duration::from_secs(config.sweep_interval_secs),
        ));

        Ok(Self {
            config,
            metrics,
            store,
            strategy,
            native,
            enhanced,
            pipeline,
            sessions,
            events,
            stream_hub: Arc::new(DashMap::new()),
            crawl_jobs: Arc::new(DashMap::new()),
            sweeper,
            strategy_flush,
        })
    }

    /// Broadcasts `event` to a live `GET /mcp` subscriber for `session_id`,
    /// if one is attached. Silently a no-op otherwise — the event is
    /// still durable via `events` for a later reconnect's replay.
    pub fn publish_live(&self, session_id: &SessionId, event: StreamEvent) {
        if let Some(sender) = self.stream_hub.get(session_id) {
            let _ = sender.send(event);
        }
    }

    pub fn shutdown(&self) {
        self.sweeper.stop();
        self.strategy_flush.stop();
        self.store.shutdown();
    }
}
