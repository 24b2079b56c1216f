//! The strategy registry: a learned, persisted mapping from URL pattern
//! to preferred fetch strategy.
//!
//! Writes go through a write-behind path: `upsert_for_url` only mutates
//! the in-memory map and sets a dirty flag, returning immediately. A
//! background flush task picks up the dirty flag on a fixed interval
//! and is what actually rewrites the on-disk seed file.

use fetchmcp_types::strategy::{FetchStrategy, StrategyEntry};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::warn;

/// Extract the `host/a/b/` pattern from a URL: host plus the path prefix
/// up to and including the last `/`.
pub fn pattern_for_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let path = parsed.path();
    let prefix = match path.rfind('/') {
        Some(idx) => &path[..=idx],
        None => "/",
    };
    Some(format!("{host}{prefix}"))
}

#[derive(Default)]
struct Registry {
    /// Most-recent-first, matching the persisted ordering contract.
    entries: Vec<StrategyEntry>,
}

impl Registry {
    fn upsert(&mut self, pattern: String, strategy: FetchStrategy) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.pattern == pattern) {
            existing.preferred_strategy = strategy;
            existing.learned_at = chrono::Utc::now();
            existing.sample_count += 1;
            let entry = existing.clone();
            self.entries.retain(|e| e.pattern != pattern);
            self.entries.insert(0, entry);
        } else {
            self.entries.insert(
                0,
                StrategyEntry {
                    pattern,
                    preferred_strategy: strategy,
                    learned_at: chrono::Utc::now(),
                    sample_count: 1,
                    notes: None,
                },
            );
        }
    }

    /// Longest-prefix match among patterns sharing the URL's host.
    fn lookup(&self, url: &str) -> Option<FetchStrategy> {
        let parsed = url::Url::parse(url).ok()?;
        let host = parsed.host_str()?;
        let path = parsed.path();
        self.entries
            .iter()
            .filter(|e| e.pattern.starts_with(&format!("{host}/")))
            .filter(|e| {
                let prefix = e.pattern.strip_prefix(host).unwrap_or("");
                path.starts_with(prefix)
            })
            .max_by_key(|e| e.pattern.len())
            .map(|e| e.preferred_strategy)
    }
}

/// Process-wide strategy registry, optionally backed by a persisted file.
pub struct StrategyRegistry {
    registry: RwLock<Registry>,
    persist_path: Option<PathBuf>,
    dirty: AtomicBool,
}

impl StrategyRegistry {
    pub fn new(persist_path: Option<PathBuf>) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            persist_path,
            dirty: AtomicBool::new(false),
        }
    }

    /// Load a seed sequence from `path`, skipping invalid entries with a
    /// warning rather than aborting startup.
    pub async fn load_seed(&self, path: &std::path::Path) {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read strategy seed file");
                return;
            }
        };
        let seeds: Vec<StrategyEntry> = match serde_json::from_str(&content) {
            Ok(s) => s,
            Err(err) => {
                warn!(error = %err, "strategy seed file is not valid JSON, skipping");
                return;
            }
        };
        let mut registry = self.registry.write().unwrap();
        for seed in seeds {
            if seed.pattern.trim().is_empty() {
                warn!("skipping strategy seed with empty pattern");
                continue;
            }
            registry.upsert(seed.pattern, seed.preferred_strategy);
        }
    }

    pub fn get_strategy(&self, url: &str) -> Option<FetchStrategy> {
        self.registry.read().unwrap().lookup(url)
    }

    /// Update the in-memory registry for `url`'s pattern and mark it
    /// dirty. This returns immediately; the background flush task (see
    /// [`Self::spawn_flush_task`]) is what actually writes the file, so
    /// this never blocks the caller on disk I/O.
    pub fn upsert_for_url(&self, url: &str, strategy: FetchStrategy) {
        let Some(pattern) = pattern_for_url(url) else {
            return;
        };
        let mut registry = self.registry.write().unwrap();
        registry.upsert(pattern, strategy);
        drop(registry);
        self.dirty.store(true, Ordering::Release);
    }

    /// Writes the current registry to `persist_path` if dirty, clearing
    /// the flag first so an upsert that lands mid-write is picked up by
    /// the next flush rather than lost.
    async fn flush_if_dirty(&self) {
        if self.persist_path.is_none() {
            return;
        }
        if self.dirty.swap(false, Ordering::AcqRel) {
            self.persist().await;
        }
    }

    async fn persist(&self) {
        let Some(path) = &self.persist_path else {
            return;
        };
        let snapshot = {
            let registry = self.registry.read().unwrap();
            registry.entries.clone()
        };
        let serialized = match serde_json::to_string_pretty(&snapshot) {
            Ok(s) => s,
            Err(err) => {
                warn!(error = %err, "failed to serialize strategy registry");
                return;
            }
        };
        if let Err(err) = tokio::fs::write(path, serialized).await {
            warn!(path = %path.display(), error = %err, "failed to persist strategy registry");
        }
    }

    pub fn snapshot(&self) -> Vec<StrategyEntry> {
        self.registry.read().unwrap().entries.clone()
    }

    #[cfg(test)]
    pub fn entry_count(&self) -> usize {
        self.registry.read().unwrap().entries.len()
    }

    /// Spawns the background flush loop that catches up the on-disk
    /// seed file with whatever `upsert_for_url` accumulated since the
    /// last tick.
    pub fn spawn_flush_task(self: Arc<Self>, interval: Duration) -> FlushHandle {
        let shutdown = Arc::new(Notify::new());
        let shutdown_rx = shutdown.clone();
        let registry = self;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => registry.flush_if_dirty().await,
                    _ = shutdown_rx.notified() => {
                        tracing::debug!("strategy flush task shutting down");
                        return;
                    }
                }
            }
        });

        FlushHandle { shutdown, task: Some(task) }
    }
}

pub struct FlushHandle {
    shutdown: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl FlushHandle {
    /// Signals the flush loop to stop. Idempotent; safe to call more than
    /// once (e.g. once explicitly and again from `Drop`).
    pub fn stop(&self) {
        self.shutdown.notify_one();
    }
}

impl Drop for FlushHandle {
    fn drop(&mut self) {
        self.shutdown.notify_one();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
