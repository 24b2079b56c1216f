//! In-memory resource backend: an LRU-ordered map from URI to resource,
//! so recency bumps and victim selection on eviction are both O(1)
//! instead of a full scan, with a running byte counter so `stats()`
//! never has to sum every entry.

use crate::eviction::{self, EvictionLimits};
use crate::{ResourceBackend, StoreError, StoreResult, StoreStats, WriteMeta};
use async_trait::async_trait;
use fetchmcp_types::resource::{Resource, ResourceHeader, ResourceTier, ResourceUri, StoreScheme};
use lru::LruCache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

pub struct MemoryBackend {
    entries: RwLock<LruCache<ResourceUri, Resource>>,
    total_bytes: AtomicU64,
    limits: EvictionLimits,
}

impl MemoryBackend {
    pub fn new(limits: EvictionLimits) -> Self {
        Self {
            entries: RwLock::new(LruCache::unbounded()),
            total_bytes: AtomicU64::new(0),
            limits,
        }
    }

    fn header_snapshot(&self) -> Vec<ResourceHeader> {
        self.entries.read().unwrap().iter().map(|(_, r)| r.header.clone()).collect()
    }

    fn pop(entries: &mut LruCache<ResourceUri, Resource>, total_bytes: &AtomicU64, uri: &ResourceUri) -> Option<Resource> {
        let removed = entries.pop(uri);
        if let Some(removed) = &removed {
            total_bytes.fetch_sub(removed.header.byte_size, Ordering::Relaxed);
        }
        removed
    }
}

#[async_trait]
impl ResourceBackend for MemoryBackend {
    async fn list(&self) -> StoreResult<Vec<ResourceHeader>> {
        Ok(self.header_snapshot())
    }

    async fn read(&self, uri: &ResourceUri) -> StoreResult<Resource> {
        let now = eviction::now_nanos();
        let mut entries = self.entries.write().unwrap();
        let Some(resource) = entries.get_mut(uri) else {
            return Err(StoreError::NotFound(uri.to_string()));
        };
        if eviction::is_expired(&resource.header, &self.limits, now) {
            Self::pop(&mut entries, &self.total_bytes, uri);
            return Err(StoreError::NotFound(uri.to_string()));
        }
        resource.header.last_access_nanos = now;
        Ok(resource.clone())
    }

    async fn write(
        &self,
        url: &str,
        tier: ResourceTier,
        content: Vec<u8>,
        meta: WriteMeta,
    ) -> StoreResult<ResourceUri> {
        let mut now = eviction::now_nanos();
        let mut entries = self.entries.write().unwrap();

        // Timestamps have sub-millisecond granularity; on the rare
        // collision, bump by one tick rather than overwrite silently.
        let mut uri = ResourceUri::new(StoreScheme::Memory, tier, url, now);
        while entries.contains(&uri) {
            now += 1;
            uri = ResourceUri::new(StoreScheme::Memory, tier, url, now);
        }

        // Supersede any existing live resource for this exact
        // (url, tier, extract_prompt) triple.
        let superseded: Vec<ResourceUri> = entries
            .iter()
            .filter(|(_, r)| {
                r.header.url == url && r.header.tier == tier && r.header.extract_prompt == meta.extract_prompt
            })
            .map(|(u, _)| u.clone())
            .collect();
        for victim in &superseded {
            Self::pop(&mut entries, &self.total_bytes, victim);
        }

        let header = ResourceHeader::new(
            uri.clone(),
            url.to_string(),
            tier,
            now,
            content.len() as u64,
            meta.mime_type,
            meta.source_strategy,
            meta.extract_prompt,
        );
        self.total_bytes.fetch_add(header.byte_size, Ordering::Relaxed);
        entries.put(uri.clone(), Resource::new(header, content));
        Ok(uri)
    }

    async fn exists(&self, uri: &ResourceUri) -> StoreResult<bool> {
        Ok(self.entries.read().unwrap().contains(uri))
    }

    async fn delete(&self, uri: &ResourceUri) -> StoreResult<()> {
        let mut entries = self.entries.write().unwrap();
        Self::pop(&mut entries, &self.total_bytes, uri);
        Ok(())
    }

    async fn find_by_url(&self, url: &str) -> StoreResult<Vec<ResourceHeader>> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .iter()
            .filter(|(_, r)| r.header.url == url)
            .map(|(_, r)| r.header.clone())
            .collect())
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        Ok(StoreStats {
            item_count: self.entries.read().unwrap().len(),
            total_bytes: self.total_bytes.load(Ordering::Relaxed),
        })
    }

    async fn enforce_limits(&self) -> StoreResult<usize> {
        let now = eviction::now_nanos();
        let mut entries = self.entries.write().unwrap();
        let mut evicted = 0usize;

        // TTL first: expiry isn't tied to recency order, so this is the
        // one scan in the pass.
        let expired: Vec<ResourceUri> = entries
            .iter()
            .filter(|(_, r)| eviction::is_expired(&r.header, &self.limits, now))
            .map(|(u, _)| u.clone())
            .collect();
        for uri in &expired {
            if Self::pop(&mut entries, &self.total_bytes, uri).is_some() {
                evicted += 1;
            }
        }

        // Count, then bytes: each victim is the current LRU tail, an
        // O(1) pop with no re-sort needed.
        while entries.len() > self.limits.max_items {
            let Some((_, removed)) = entries.pop_lru() else { break };
            self.total_bytes.fetch_sub(removed.header.byte_size, Ordering::Relaxed);
            evicted += 1;
        }
        while self.total_bytes.load(Ordering::Relaxed) > self.limits.max_bytes {
            let Some((_, removed)) = entries.pop_lru() else { break };
            self.total_bytes.fetch_sub(removed.header.byte_size, Ordering::Relaxed);
            evicted += 1;
        }

        Ok(evicted)
    }
}
