//! Process-wide metrics singleton.
//!
//! Latencies land in a fixed-size ring buffer for percentile
//! calculation; counters are plain atomics for lock-light concurrent
//! updates. Snapshots are point-in-time approximations; writers never
//! block on a snapshot in progress beyond the brief critical section
//! needed to copy the ring.

mod ring;

use ring::DurationRing;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

const DEFAULT_RING_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEvent {
    Hit,
    Miss,
    Write,
    Eviction,
}

#[derive(Debug, Default)]
struct StrategyCounters {
    success: AtomicU64,
    failure: AtomicU64,
    fallback: AtomicU64,
    total_duration_ms: AtomicU64,
}

/// Process-wide metrics collector. Cheap to clone (it's an `Arc` in
/// practice via callers holding `Arc<MetricsCollector>`); all interior
/// state is behind atomics or short-lived locks.
pub struct MetricsCollector {
    requests_total: AtomicU64,
    requests_error: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_writes: AtomicU64,
    cache_evictions: AtomicU64,
    durations: Mutex<DurationRing>,
    strategies: RwLock<HashMap<String, StrategyCounters>>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(DEFAULT_RING_CAPACITY)
    }
}

impl MetricsCollector {
    pub fn new(ring_capacity: usize) -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            requests_error: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            cache_writes: AtomicU64::new(0),
            cache_evictions: AtomicU64::new(0),
            durations: Mutex::new(DurationRing::new(ring_capacity)),
            strategies: RwLock::new(HashMap::new()),
        }
    }

    pub fn record_request(&self, duration_ms: u64, is_error: bool) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if is_error {
            self.requests_error.fetch_add(1, Ordering::Relaxed);
        }
        if let Ok(mut ring) = self.durations.lock() {
            ring.push(duration_ms);
        }
    }

    pub fn record_cache(&self, event: CacheEvent) {
        let counter = match event {
            CacheEvent::Hit => &self.cache_hits,
            CacheEvent::Miss => &self.cache_misses,
            CacheEvent::Write => &self.cache_writes,
            CacheEvent::Eviction => &self.cache_evictions,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_strategy(&self, name: &str, duration_ms: u64, success: bool, is_fallback: bool) {
        if let Ok(map) = self.strategies.read() {
            if let Some(counters) = map.get(name) {
                Self::bump_strategy(counters, duration_ms, success, is_fallback);
                return;
            }
        }
        let mut map = match self.strategies.write() {
            Ok(map) => map,
            Err(_) => return,
        };
        let counters = map.entry(name.to_string()).or_default();
        Self::bump_strategy(counters, duration_ms, success, is_fallback);
    }

    fn bump_strategy(counters: &StrategyCounters, duration_ms: u64, success: bool, is_fallback: bool) {
        if success {
            counters.success.fetch_add(1, Ordering::Relaxed);
        } else {
            counters.failure.fetch_add(1, Ordering::Relaxed);
        }
        if is_fallback {
            counters.fallback.fetch_add(1, Ordering::Relaxed);
        }
        counters.total_duration_ms.fetch_add(duration_ms, Ordering::Relaxed);
    }

    /// A consistent copy of the collector's state, including derived
    /// rates and latency quantiles computed from the current ring.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let hit_rate = if hits + misses > 0 {
            hits as f64 / (hits + misses) as f64
        } else {
            0.0
        };

        let (p50, p95, p99) = self
            .durations
            .lock()
            .map(|ring| ring.quantiles(&[0.50, 0.95, 0.99]))
            .unwrap_or((0, 0, 0));

        let strategies = self
            .strategies
            .read()
            .map(|map| {
                map.iter()
                    .map(|(name, c)| {
                        let success = c.success.load(Ordering::Relaxed);
                        let failure = c.failure.load(Ordering::Relaxed);
                        (
                            name.clone(),
                            StrategySnapshot {
                                success,
                                failure,
                                fallback: c.fallback.load(Ordering::Relaxed),
                                total_duration_ms: c.total_duration_ms.load(Ordering::Relaxed),
                            },
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_error: self.requests_error.load(Ordering::Relaxed),
            cache_hits: hits,
            cache_misses: misses,
            cache_writes: self.cache_writes.load(Ordering::Relaxed),
            cache_evictions: self.cache_evictions.load(Ordering::Relaxed),
            cache_hit_rate: hit_rate,
            latency_p50_ms: p50,
            latency_p95_ms: p95,
            latency_p99_ms: p99,
            strategies,
        }
    }

    /// Test-only: zero all state.
    pub fn reset(&self) {
        self.requests_total.store(0, Ordering::Relaxed);
        self.requests_error.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.cache_writes.store(0, Ordering::Relaxed);
        self.cache_evictions.store(0, Ordering::Relaxed);
        if let Ok(mut ring) = self.durations.lock() {
            ring.clear();
        }
        if let Ok(mut map) = self.strategies.write() {
            map.clear();
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct StrategySnapshot {
    pub success: u64,
    pub failure: u64,
    pub fallback: u64,
    pub total_duration_ms: u64,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub requests_error: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_writes: u64,
    pub cache_evictions: u64,
    pub cache_hit_rate: f64,
    pub latency_p50_ms: u64,
    pub latency_p95_ms: u64,
    pub latency_p99_ms: u64,
    pub strategies: HashMap<String, StrategySnapshot>,
}
