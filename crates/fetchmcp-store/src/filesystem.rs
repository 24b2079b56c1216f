//! Filesystem-backed store: one file per resource under
//! `<root>/<tier>/<sanitized_url>_<timestamp>`, with a JSON header
//! sidecar next to the content. An in-memory index is rebuilt from disk
//! at startup so reads don't need to stat every file.

use crate::eviction::{self, EvictionLimits};
use crate::{ResourceBackend, StoreError, StoreResult, StoreStats, WriteMeta};
use async_trait::async_trait;
use fetchmcp_types::resource::{Resource, ResourceHeader, ResourceTier, ResourceUri, StoreScheme};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::io::AsyncWriteExt;

fn tier_dir(root: &Path, tier: ResourceTier) -> PathBuf {
    root.join(tier.as_str())
}

fn content_path(root: &Path, header: &ResourceHeader) -> PathBuf {
    let file_name = header.uri.as_str().rsplit('/').next().unwrap_or(header.uri.as_str());
    tier_dir(root, header.tier).join(file_name)
}

fn header_path(root: &Path, header: &ResourceHeader) -> PathBuf {
    content_path(root, header).with_extension("json")
}

pub struct FilesystemBackend {
    root: PathBuf,
    index: RwLock<HashMap<ResourceUri, ResourceHeader>>,
    limits: EvictionLimits,
}

impl FilesystemBackend {
    /// Opens (creating if absent) the tier subdirectories under `root`
    /// and rebuilds the header index from whatever sidecars are found.
    pub async fn open(root: PathBuf, limits: EvictionLimits) -> StoreResult<Self> {
        for tier in [ResourceTier::Raw, ResourceTier::Cleaned, ResourceTier::Extracted] {
            tokio::fs::create_dir_all(tier_dir(&root, tier)).await?;
        }

        let mut index = HashMap::new();
        for tier in [ResourceTier::Raw, ResourceTier::Cleaned, ResourceTier::Extracted] {
            let dir = tier_dir(&root, tier);
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let raw = match tokio::fs::read(&path).await {
                    Ok(raw) => raw,
                    Err(err) => {
                        tracing::warn!(path = %path.display(), error = %err, "failed to read resource header during index rebuild");
                        continue;
                    }
                };
                match serde_json::from_slice::<ResourceHeader>(&raw) {
                    Ok(header) => {
                        index.insert(header.uri.clone(), header);
                    }
                    Err(err) => {
                        tracing::warn!(path = %path.display(), error = %err, "skipping corrupt resource header during index rebuild");
                    }
                }
            }
        }

        Ok(Self { root, index: RwLock::new(index), limits })
    }

    fn header_snapshot(&self) -> Vec<ResourceHeader> {
        self.index.read().unwrap().values().cloned().collect()
    }

    async fn remove_files(&self, header: &ResourceHeader) -> StoreResult<()> {
        let content = content_path(&self.root, header);
        let sidecar = header_path(&self.root, header);
        if let Err(err) = tokio::fs::remove_file(&content).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                return Err(err.into());
            }
        }
        if let Err(err) = tokio::fs::remove_file(&sidecar).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                return Err(err.into());
            }
        }
        Ok(())
    }

    /// Writes content and header via a temp file plus rename, so a crash
    /// mid-write never leaves a partial file at the real path.
    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> StoreResult<()> {
        let tmp_path = path.with_extension(format!(
            "{}.tmp",
            path.extension().and_then(|e| e.to_str()).unwrap_or("")
        ));
        {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
        }
        tokio::fs::rename(&tmp_path, path).await?;
        Ok(())
    }
}

#[async_trait]
impl ResourceBackend for FilesystemBackend {
    async fn list(&self) -> StoreResult<Vec<ResourceHeader>> {
        Ok(self.header_snapshot())
    }

    async fn read(&self, uri: &ResourceUri) -> StoreResult<Resource> {
        let now = eviction::now_nanos();
        let header = {
            let index = self.index.read().unwrap();
            index.get(uri).cloned()
        };
        let Some(mut header) = header else {
            return Err(StoreError::NotFound(uri.to_string()));
        };
        if eviction::is_expired(&header, &self.limits, now) {
            self.index.write().unwrap().remove(uri);
            self.remove_files(&header).await?;
            return Err(StoreError::NotFound(uri.to_string()));
        }

        let content = match tokio::fs::read(content_path(&self.root, &header)).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                self.index.write().unwrap().remove(uri);
                return Err(StoreError::NotFound(uri.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        header.last_access_nanos = now;
        self.write_atomic(&header_path(&self.root, &header), &serde_json::to_vec(&header)?).await?;
        self.index.write().unwrap().insert(uri.clone(), header.clone());

        Ok(Resource::new(header, content))
    }

    async fn write(
        &self,
        url: &str,
        tier: ResourceTier,
        content: Vec<u8>,
        meta: WriteMeta,
    ) -> StoreResult<ResourceUri> {
        let mut now = eviction::now_nanos();
        let mut uri = ResourceUri::new(StoreScheme::File, tier, url, now);
        while self.index.read().unwrap().contains_key(&uri) {
            now += 1;
            uri = ResourceUri::new(StoreScheme::File, tier, url, now);
        }

        let header = ResourceHeader::new(
            uri.clone(),
            url.to_string(),
            tier,
            now,
            content.len() as u64,
            meta.mime_type,
            meta.source_strategy,
            meta.extract_prompt.clone(),
        );

        self.write_atomic(&content_path(&self.root, &header), &content).await?;
        self.write_atomic(&header_path(&self.root, &header), &serde_json::to_vec(&header)?).await?;

        // Supersede any existing live resource for this exact
        // (url, tier, extract_prompt) triple.
        let superseded: Vec<ResourceHeader> = {
            let mut index = self.index.write().unwrap();
            let victims: Vec<ResourceUri> = index
                .values()
                .filter(|h| h.url == url && h.tier == tier && h.extract_prompt == meta.extract_prompt)
                .map(|h| h.uri.clone())
                .collect();
            let mut removed = Vec::with_capacity(victims.len());
            for victim_uri in victims {
                if let Some(victim) = index.remove(&victim_uri) {
                    removed.push(victim);
                }
            }
            index.insert(uri.clone(), header);
            removed
        };
        for victim in superseded {
            self.remove_files(&victim).await?;
        }

        Ok(uri)
    }

    async fn exists(&self, uri: &ResourceUri) -> StoreResult<bool> {
        Ok(self.index.read().unwrap().contains_key(uri))
    }

    async fn delete(&self, uri: &ResourceUri) -> StoreResult<()> {
        let header = self.index.write().unwrap().remove(uri);
        if let Some(header) = header {
            self.remove_files(&header).await?;
        }
        Ok(())
    }

    async fn find_by_url(&self, url: &str) -> StoreResult<Vec<ResourceHeader>> {
        Ok(self
            .index
            .read()
            .unwrap()
            .values()
            .filter(|h| h.url == url)
            .cloned()
            .collect())
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let index = self.index.read().unwrap();
        Ok(StoreStats {
            item_count: index.len(),
            total_bytes: index.values().map(|h| h.byte_size).sum(),
        })
    }

    async fn enforce_limits(&self) -> StoreResult<usize> {
        let victims = eviction::plan_eviction(&self.header_snapshot(), &self.limits);
        if victims.is_empty() {
            return Ok(0);
        }
        let removed: Vec<ResourceHeader> = {
            let mut index = self.index.write().unwrap();
            victims.iter().filter_map(|uri| index.remove(uri)).collect()
        };
        let evicted = removed.len();
        for header in removed {
            self.remove_files(&header).await?;
        }
        Ok(evicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn backend(limits: EvictionLimits) -> (tempfile::TempDir, FilesystemBackend) {
        let dir = tempfile::tempdir().unwrap();
        let b = FilesystemBackend::open(dir.path().to_path_buf(), limits).await.unwrap();
        (dir, b)
    }

    #[tokio::test]
    async fn write_then_read_returns_written_content() {
        let (_dir, b) = backend(EvictionLimits::default()).await;
        let uri = b
            .write("https://x.io/a", ResourceTier::Raw, b"hello".to_vec(), WriteMeta::default())
            .await
            .unwrap();
        let resource = b.read(&uri).await.unwrap();
        assert_eq!(resource.content, b"hello");
    }

    #[tokio::test]
    async fn index_rebuilds_from_disk_on_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let uri = {
            let b = FilesystemBackend::open(dir.path().to_path_buf(), EvictionLimits::default())
                .await
                .unwrap();
            b.write("https://x.io/a", ResourceTier::Raw, b"hello".to_vec(), WriteMeta::default())
                .await
                .unwrap()
        };

        let reopened = FilesystemBackend::open(dir.path().to_path_buf(), EvictionLimits::default())
            .await
            .unwrap();
        let resource = reopened.read(&uri).await.unwrap();
        assert_eq!(resource.content, b"hello");
    }

    #[tokio::test]
    async fn write_supersedes_prior_entry_for_same_triple() {
        let (_dir, b) = backend(EvictionLimits::default()).await;
        b.write("https://x.io/a", ResourceTier::Raw, b"v1".to_vec(), WriteMeta::default())
            .await
            .unwrap();
        b.write("https://x.io/a", ResourceTier::Raw, b"v2".to_vec(), WriteMeta::default())
            .await
            .unwrap();
        let headers = b.find_by_url("https://x.io/a").await.unwrap();
        assert_eq!(headers.len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_content_and_sidecar_files() {
        let (dir, b) = backend(EvictionLimits::default()).await;
        let uri = b
            .write("https://x.io/a", ResourceTier::Raw, b"v1".to_vec(), WriteMeta::default())
            .await
            .unwrap();
        b.delete(&uri).await.unwrap();
        assert!(matches!(b.read(&uri).await, Err(StoreError::NotFound(_))));

        let mut remaining = tokio::fs::read_dir(dir.path().join("raw")).await.unwrap();
        assert!(remaining.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_read_reports_not_found_and_clears_index() {
        let (_dir, b) = backend(EvictionLimits { ttl_secs: 1, ..EvictionLimits::default() }).await;
        let uri = b
            .write("https://x.io/a", ResourceTier::Raw, b"x".to_vec(), WriteMeta::default())
            .await
            .unwrap();
        {
            let mut index = b.index.write().unwrap();
            index.get_mut(&uri).unwrap().timestamp_nanos = 0;
        }
        assert!(matches!(b.read(&uri).await, Err(StoreError::NotFound(_))));
        assert_eq!(b.stats().await.unwrap().item_count, 0);
    }
}
