//! End-to-end eviction scenarios against the public `ResourceStore`
//! facade: TTL expiry and LRU eviction under a count limit, both
//! checked for the metrics side effects a background sweep produces.

use std::sync::Arc;
use std::time::Duration;

use fetchmcp_metrics::MetricsCollector;
use fetchmcp_store::{EvictionLimits, MemoryBackend, ResourceStore, WriteMeta};
use fetchmcp_types::resource::ResourceTier;

fn store(limits: EvictionLimits, sweep_interval: Duration) -> (Arc<ResourceStore>, Arc<MetricsCollector>) {
    let metrics = Arc::new(MetricsCollector::default());
    let backend = Arc::new(MemoryBackend::new(limits));
    let store = Arc::new(ResourceStore::new(backend, metrics.clone(), sweep_interval));
    (store, metrics)
}

#[tokio::test]
async fn ttl_eviction_drops_entry_and_records_one_eviction() {
    let (store, metrics) = store(
        EvictionLimits { ttl_secs: 1, ..EvictionLimits::default() },
        Duration::from_millis(200),
    );

    let uri = store
        .write("https://x.io/ttl", ResourceTier::Raw, b"stale".to_vec(), WriteMeta::default())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(1_500)).await;

    assert!(store.read(&uri).await.is_err());
    assert_eq!(store.stats().await.unwrap().item_count, 0);
    assert_eq!(metrics.snapshot().cache_evictions, 1);

    store.shutdown();
}

#[tokio::test]
async fn lru_eviction_picks_the_least_recently_used_entry() {
    let (store, metrics) = store(
        EvictionLimits { max_items: 3, ..EvictionLimits::default() },
        Duration::from_secs(3600),
    );

    store.write("https://x.io/a", ResourceTier::Raw, b"a".to_vec(), WriteMeta::default()).await.unwrap();
    store.write("https://x.io/b", ResourceTier::Raw, b"b".to_vec(), WriteMeta::default()).await.unwrap();
    store.write("https://x.io/c", ResourceTier::Raw, b"c".to_vec(), WriteMeta::default()).await.unwrap();

    // Touch `a` so `b` becomes the least recently used before `d` pushes
    // the store over its item limit.
    let a_headers = store.find_by_url("https://x.io/a").await.unwrap();
    store.read(&a_headers[0].uri).await.unwrap();

    store.write("https://x.io/d", ResourceTier::Raw, b"d".to_vec(), WriteMeta::default()).await.unwrap();

    assert!(store.find_by_url("https://x.io/b").await.unwrap().is_empty());
    assert!(!store.find_by_url("https://x.io/a").await.unwrap().is_empty());
    assert!(!store.find_by_url("https://x.io/d").await.unwrap().is_empty());

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.item_count, 3);
    assert_eq!(metrics.snapshot().cache_evictions, 1);

    store.shutdown();
}
