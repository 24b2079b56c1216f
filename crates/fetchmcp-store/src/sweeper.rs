//! Background TTL/LRU sweeper: calls `enforce_limits` on a fixed
//! interval so eviction isn't solely driven by the write path.

use crate::ResourceBackend;
use fetchmcp_metrics::{CacheEvent, MetricsCollector};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

pub struct SweeperHandle {
    shutdown: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Signals the sweep loop to stop. Idempotent; safe to call more than
    /// once (e.g. once explicitly and again from `Drop`).
    pub fn stop(&self) {
        self.shutdown.notify_one();
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.shutdown.notify_one();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

pub fn spawn(
    backend: Arc<dyn ResourceBackend>,
    metrics: Arc<MetricsCollector>,
    interval: Duration,
) -> SweeperHandle {
    let shutdown = Arc::new(Notify::new());
    let shutdown_rx = shutdown.clone();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match backend.enforce_limits().await {
                        Ok(evicted) => {
                            for _ in 0..evicted {
                                metrics.record_cache(CacheEvent::Eviction);
                            }
                        }
                        Err(err) => tracing::warn!(error = %err, "background sweep failed"),
                    }
                }
                _ = shutdown_rx.notified() => {
                    tracing::debug!("store sweeper shutting down");
                    return;
                }
            }
        }
    });

    SweeperHandle { shutdown, task: Some(task) }
}
