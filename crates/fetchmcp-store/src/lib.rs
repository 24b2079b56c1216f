//! The resource store: a keyed content cache with TTL expiry and LRU
//! eviction, backed by either an in-memory map or a filesystem tree.
//!
//! Entries and their metadata are split so eviction bookkeeping (TTL,
//! LRU order, byte accounting) doesn't need to touch the stored body;
//! every eviction is fed back into the metrics collector.

mod eviction;
mod filesystem;
mod memory;
mod sweeper;

use async_trait::async_trait;
use fetchmcp_metrics::{CacheEvent, MetricsCollector};
use fetchmcp_types::resource::{Resource, ResourceHeader, ResourceTier, ResourceUri};
use std::sync::Arc;
use thiserror::Error;

pub use eviction::EvictionLimits;
pub use filesystem::FilesystemBackend;
pub use memory::MemoryBackend;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Default)]
pub struct WriteMeta {
    pub mime_type: String,
    pub source_strategy: Option<String>,
    pub extract_prompt: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub item_count: usize,
    pub total_bytes: u64,
}

/// The backend contract both the memory and filesystem implementations
/// satisfy. `write`/`write_multi` return the URI(s) just created.
#[async_trait]
pub trait ResourceBackend: Send + Sync {
    async fn list(&self) -> StoreResult<Vec<ResourceHeader>>;

    /// Reads content and bumps `last_access_time`. Returns `NotFound` if
    /// the entry is absent or has expired under the TTL policy.
    async fn read(&self, uri: &ResourceUri) -> StoreResult<Resource>;

    async fn write(
        &self,
        url: &str,
        tier: ResourceTier,
        content: Vec<u8>,
        meta: WriteMeta,
    ) -> StoreResult<ResourceUri>;

    async fn exists(&self, uri: &ResourceUri) -> StoreResult<bool>;

    async fn delete(&self, uri: &ResourceUri) -> StoreResult<()>;

    async fn find_by_url(&self, url: &str) -> StoreResult<Vec<ResourceHeader>>;

    async fn stats(&self) -> StoreResult<StoreStats>;

    /// Sweeps expired and over-limit entries, returning how many were
    /// evicted so the caller can report them to the metrics collector.
    /// Called both after every write and on a fixed interval by the
    /// background sweeper.
    async fn enforce_limits(&self) -> StoreResult<usize>;
}

#[derive(Debug, Clone)]
pub struct WriteMultiResult {
    pub raw_uri: ResourceUri,
    pub cleaned_uri: Option<ResourceUri>,
    pub extracted_uri: Option<ResourceUri>,
}

/// The `ResourceStore` is the public facade the scrape pipeline and tool
/// handlers use: it owns a backend, the metrics collector reference, and
/// the background TTL sweeper's lifetime.
pub struct ResourceStore {
    backend: Arc<dyn ResourceBackend>,
    metrics: Arc<MetricsCollector>,
    sweeper: sweeper::SweeperHandle,
}

impl ResourceStore {
    pub fn new(
        backend: Arc<dyn ResourceBackend>,
        metrics: Arc<MetricsCollector>,
        sweep_interval: std::time::Duration,
    ) -> Self {
        let sweeper = sweeper::spawn(backend.clone(), metrics.clone(), sweep_interval);
        Self { backend, metrics, sweeper }
    }

    pub async fn write(
        &self,
        url: &str,
        tier: ResourceTier,
        content: Vec<u8>,
        meta: WriteMeta,
    ) -> StoreResult<ResourceUri> {
        let uri = self.backend.write(url, tier, content, meta).await?;
        self.metrics.record_cache(CacheEvent::Write);
        match self.backend.enforce_limits().await {
            Ok(evicted) => {
                for _ in 0..evicted {
                    self.metrics.record_cache(CacheEvent::Eviction);
                }
            }
            Err(err) => tracing::warn!(error = %err, "eviction pass failed after write"),
        }
        Ok(uri)
    }

    /// Writes the raw tier always, and cleaned/extracted tiers when
    /// provided, as one logical unit.
    pub async fn write_multi(
        &self,
        url: &str,
        raw: Vec<u8>,
        cleaned: Option<Vec<u8>>,
        extracted: Option<(Vec<u8>, String)>,
        meta: WriteMeta,
    ) -> StoreResult<WriteMultiResult> {
        let raw_uri = self
            .write(url, ResourceTier::Raw, raw, meta.clone())
            .await?;

        let cleaned_uri = match cleaned {
            Some(body) => Some(self.write(url, ResourceTier::Cleaned, body, meta.clone()).await?),
            None => None,
        };

        let extracted_uri = match extracted {
            Some((body, prompt)) => {
                let mut extract_meta = meta;
                extract_meta.extract_prompt = Some(prompt);
                Some(self.write(url, ResourceTier::Extracted, body, extract_meta).await?)
            }
            None => None,
        };

        Ok(WriteMultiResult { raw_uri, cleaned_uri, extracted_uri })
    }

    pub async fn read(&self, uri: &ResourceUri) -> StoreResult<Resource> {
        match self.backend.read(uri).await {
            Ok(resource) => {
                self.metrics.record_cache(CacheEvent::Hit);
                Ok(resource)
            }
            Err(err) => {
                self.metrics.record_cache(CacheEvent::Miss);
                Err(err)
            }
        }
    }

    pub async fn exists(&self, uri: &ResourceUri) -> StoreResult<bool> {
        self.backend.exists(uri).await
    }

    pub async fn delete(&self, uri: &ResourceUri) -> StoreResult<()> {
        self.backend.delete(uri).await
    }

    pub async fn list(&self) -> StoreResult<Vec<ResourceHeader>> {
        self.backend.list().await
    }

    pub async fn stats(&self) -> StoreResult<StoreStats> {
        self.backend.stats().await
    }

    pub async fn find_by_url(&self, url: &str) -> StoreResult<Vec<ResourceHeader>> {
        self.backend.find_by_url(url).await
    }

    pub async fn find_by_url_and_extract(
        &self,
        url: &str,
        prompt: Option<&str>,
    ) -> StoreResult<Vec<ResourceHeader>> {
        let headers = self.backend.find_by_url(url).await?;
        Ok(headers
            .into_iter()
            .filter(|h| match (h.tier, prompt) {
                (ResourceTier::Extracted, Some(p)) => h.extract_prompt.as_deref() == Some(p),
                (ResourceTier::Extracted, None) => false,
                _ => true,
            })
            .collect())
    }

    /// Returns the best cached resource for `(url, extract)` in
    /// preference order cleaned > extracted > raw, reading its content.
    pub async fn find_best_cached(
        &self,
        url: &str,
        extract_prompt: Option<&str>,
    ) -> StoreResult<Option<Resource>> {
        let mut headers = self.find_by_url_and_extract(url, extract_prompt).await?;
        headers.sort_by_key(|h| h.tier.preference_rank());
        let Some(best) = headers.into_iter().next() else {
            return Ok(None);
        };
        match self.read(&best.uri).await {
            Ok(resource) => Ok(Some(resource)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn shutdown(&self) {
        self.sweeper.stop();
    }
}

impl Drop for ResourceStore {
    fn drop(&mut self) {
        self.sweeper.stop();
    }
}
