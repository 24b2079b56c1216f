//! Background idle-session sweeper, the session-table counterpart to the
//! resource store's TTL/LRU sweeper: same shutdown-notify shape, a
//! different fixed-interval job.

use crate::events::EventStore;
use crate::table::SessionTable;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

pub struct IdleSweeperHandle {
    shutdown: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl IdleSweeperHandle {
    pub fn stop(&self) {
        self.shutdown.notify_one();
    }
}

impl Drop for IdleSweeperHandle {
    fn drop(&mut self) {
        self.shutdown.notify_one();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Sweeps `table` on `interval`, freeing each timed-out session's event
/// stream exactly as an explicit DELETE would.
pub fn spawn_idle_sweeper(table: Arc<SessionTable>, events: Arc<dyn EventStore>, interval: Duration) -> IdleSweeperHandle {
    let shutdown = Arc::new(Notify::new());
    let shutdown_rx = shutdown.clone();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    for id in table.sweep_idle() {
                        tracing::info!(session_id = %id, "session timed out, freeing event stream");
                        events.drop_stream(&id.to_string()).await;
                    }
                }
                _ = shutdown_rx.notified() => {
                    tracing::debug!("session idle sweeper shutting down");
                    return;
                }
            }
        }
    });

    IdleSweeperHandle { shutdown, task: Some(task) }
}
