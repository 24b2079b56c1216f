//! Eviction policy: TTL, then count, then bytes, against an in-memory
//! index of resource headers. Backend-agnostic — both the memory and
//! filesystem backends hand this module a snapshot of their headers and
//! act on the returned victim list.

use fetchmcp_types::resource::ResourceHeader;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy)]
pub struct EvictionLimits {
    pub ttl_secs: u64,
    pub max_items: usize,
    pub max_bytes: u64,
}

impl Default for EvictionLimits {
    fn default() -> Self {
        Self { ttl_secs: 0, max_items: usize::MAX, max_bytes: u64::MAX }
    }
}

pub fn now_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
}

/// An entry is expired once its age exceeds the configured TTL. TTL of
/// zero means "infinite" (never expires).
pub fn is_expired(header: &ResourceHeader, limits: &EvictionLimits, now: u128) -> bool {
    if limits.ttl_secs == 0 {
        return false;
    }
    let age_nanos = now.saturating_sub(header.timestamp_nanos);
    age_nanos > (limits.ttl_secs as u128) * 1_000_000_000
}

/// Computes which URIs should be evicted given the current index and
/// limits, in the order TTL → count → bytes, as required by the store
/// contract. The returned list is authoritative but the policy itself
/// does not delete anything — callers own the backend-specific delete.
pub fn plan_eviction(
    headers: &[ResourceHeader],
    limits: &EvictionLimits,
) -> Vec<fetchmcp_types::resource::ResourceUri> {
    let now = now_nanos();
    let mut victims = Vec::new();
    let mut survivors: Vec<&ResourceHeader> = Vec::with_capacity(headers.len());

    for header in headers {
        if is_expired(header, limits, now) {
            victims.push(header.uri.clone());
        } else {
            survivors.push(header);
        }
    }

    survivors.sort_by_key(|h| h.last_access_nanos);

    let mut total_bytes: u64 = survivors.iter().map(|h| h.byte_size).sum();
    let mut count = survivors.len();
    let mut idx = 0;
    while count > limits.max_items && idx < survivors.len() {
        victims.push(survivors[idx].uri.clone());
        total_bytes = total_bytes.saturating_sub(survivors[idx].byte_size);
        count -= 1;
        idx += 1;
    }
    while total_bytes > limits.max_bytes && idx < survivors.len() {
        victims.push(survivors[idx].uri.clone());
        total_bytes = total_bytes.saturating_sub(survivors[idx].byte_size);
        idx += 1;
    }

    victims
}

#[cfg(test)]
mod tests {
    use super::*;
    use fetchmcp_types::resource::{ResourceTier, ResourceUri, StoreScheme};

    fn header(uri: &str, last_access: u128, size: u64, created: u128) -> ResourceHeader {
        ResourceHeader::new(
            ResourceUri(uri.to_string()),
            "https://x.io".to_string(),
            ResourceTier::Raw,
            created,
            size,
            "text/plain".to_string(),
            None,
            None,
        )
        .tap_last_access(last_access)
    }

    trait TapLastAccess {
        fn tap_last_access(self, v: u128) -> Self;
    }
    impl TapLastAccess for ResourceHeader {
        fn tap_last_access(mut self, v: u128) -> Self {
            self.last_access_nanos = v;
            self
        }
    }

    #[test]
    fn count_limit_evicts_smallest_last_access() {
        let headers = vec![
            header("a", 1, 10, 1),
            header("b", 2, 10, 2),
            header("c", 3, 10, 3),
        ];
        let limits = EvictionLimits { ttl_secs: 0, max_items: 2, max_bytes: u64::MAX };
        let victims = plan_eviction(&headers, &limits);
        assert_eq!(victims, vec![ResourceUri("a".to_string())]);
    }

    #[test]
    fn byte_limit_evicts_until_under_budget() {
        let headers = vec![
            header("a", 1, 50, 1),
            header("b", 2, 50, 2),
            header("c", 3, 50, 3),
        ];
        let limits = EvictionLimits { ttl_secs: 0, max_items: usize::MAX, max_bytes: 60 };
        let victims = plan_eviction(&headers, &limits);
        assert_eq!(victims, vec![ResourceUri("a".to_string()), ResourceUri("b".to_string())]);
    }

    #[test]
    fn expired_entries_are_evicted_regardless_of_recency() {
        let old = header("old", now_nanos(), 10, 0);
        let limits = EvictionLimits { ttl_secs: 1, max_items: usize::MAX, max_bytes: u64::MAX };
        let victims = plan_eviction(&[old], &limits);
        assert_eq!(victims, vec![ResourceUri("old".to_string())]);
    }

    #[test]
    fn fresh_entry_within_ttl_survives() {
        let fresh = header("fresh", now_nanos(), 10, now_nanos());
        let limits = EvictionLimits { ttl_secs: 100, max_items: usize::MAX, max_bytes: u64::MAX };
        assert!(plan_eviction(&[fresh], &limits).is_empty());
    }
}
