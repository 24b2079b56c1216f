//! The resumable event store: `store` appends a server-initiated message
//! to a stream, `replay_after` drives `send_fn` for everything the
//! client missed.

use async_trait::async_trait;
use dashmap::DashMap;
use fetchmcp_types::event::{EventId, StreamEvent};
use std::sync::atomic::{AtomicU64, Ordering};

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn store(&self, stream_id: &str, message: serde_json::Value) -> EventId;

    /// Invokes `send_fn` once per event in `stream_id` whose suffix is
    /// strictly greater than `last_event_id`'s, in suffix order.
    async fn replay_after(&self, stream_id: &str, last_event_id: Option<&EventId>, send_fn: &(dyn for<'a> Fn(&'a StreamEvent) + Send + Sync));

    async fn drop_stream(&self, stream_id: &str);
}

/// One monotonic counter per stream, guarding a `Vec<StreamEvent>` kept
/// in insertion (and therefore suffix) order.
#[derive(Default)]
pub struct MemoryEventStore {
    streams: DashMap<String, (AtomicU64, std::sync::RwLock<Vec<StreamEvent>>)>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn store(&self, stream_id: &str, message: serde_json::Value) -> EventId {
        let entry = self
            .streams
            .entry(stream_id.to_string())
            .or_insert_with(|| (AtomicU64::new(0), std::sync::RwLock::new(Vec::new())));
        let suffix = entry.0.fetch_add(1, Ordering::SeqCst);
        let id = EventId::new(stream_id, suffix);
        entry.1.write().unwrap().push(StreamEvent { id: id.clone(), message });
        id
    }

    async fn replay_after(&self, stream_id: &str, last_event_id: Option<&EventId>, send_fn: &(dyn for<'a> Fn(&'a StreamEvent) + Send + Sync)) {
        let Some(entry) = self.streams.get(stream_id) else {
            return;
        };
        let floor = last_event_id.map(|e| e.suffix);
        let guard = entry.1.read().unwrap();
        for event in guard.iter() {
            if floor.map_or(true, |f| event.id.suffix > f) {
                send_fn(event);
            }
        }
    }

    async fn drop_stream(&self, stream_id: &str) {
        self.streams.remove(stream_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replay_after_none_sends_everything() {
        let store = MemoryEventStore::new();
        store.store("s1", serde_json::json!({"n": 1})).await;
        store.store("s1", serde_json::json!({"n": 2})).await;

        let seen = std::sync::Mutex::new(Vec::new());
        store
            .replay_after("s1", None, &|event| seen.lock().unwrap().push(event.message.clone()))
            .await;

        assert_eq!(seen.into_inner().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn replay_after_skips_seen_events() {
        let store = MemoryEventStore::new();
        let first = store.store("s1", serde_json::json!({"n": 1})).await;
        store.store("s1", serde_json::json!({"n": 2})).await;
        store.store("s1", serde_json::json!({"n": 3})).await;

        let seen = std::sync::Mutex::new(Vec::new());
        store
            .replay_after("s1", Some(&first), &|event| seen.lock().unwrap().push(event.message.clone()))
            .await;

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen, vec![serde_json::json!({"n": 2}), serde_json::json!({"n": 3})]);
    }

    #[tokio::test]
    async fn replay_on_unknown_stream_sends_nothing() {
        let store = MemoryEventStore::new();
        let seen = std::sync::Mutex::new(Vec::new());
        store.replay_after("missing", None, &|event| seen.lock().unwrap().push(event.message.clone())).await;
        assert!(seen.into_inner().unwrap().is_empty());
    }

    #[tokio::test]
    async fn drop_stream_clears_its_events() {
        let store = MemoryEventStore::new();
        store.store("s1", serde_json::json!({"n": 1})).await;
        store.drop_stream("s1").await;

        let seen = std::sync::Mutex::new(Vec::new());
        store.replay_after("s1", None, &|event| seen.lock().unwrap().push(event.message.clone())).await;
        assert!(seen.into_inner().unwrap().is_empty());
    }
}
