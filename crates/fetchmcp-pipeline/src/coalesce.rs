//! Coalesces concurrent scrape requests that share a fingerprint into a
//! single in-flight fetch. Grounded on the `DashMap`-keyed concurrent
//! session table pattern used for the MCP session runtime, combined
//! with tokio's `OnceCell` for the single-flight semantics: the first
//! caller for a fingerprint runs the work, every other caller for the
//! same fingerprint awaits the same cell instead of repeating it.

use crate::{PipelineResult, ScrapeOutcome};
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

type Slot = Arc<OnceCell<Arc<PipelineResult<ScrapeOutcome>>>>;

#[derive(Default)]
pub struct FingerprintCoalescer {
    inflight: DashMap<String, Slot>,
}

impl FingerprintCoalescer {
    /// Runs `work` for `fingerprint`, or joins an already in-flight call
    /// for the same fingerprint. The entry is removed once settled so a
    /// later, independent call re-fetches rather than serving a stale
    /// coalesced result forever.
    pub async fn run<F, Fut>(&self, fingerprint: String, work: F) -> Arc<PipelineResult<ScrapeOutcome>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = PipelineResult<ScrapeOutcome>>,
    {
        let slot = self
            .inflight
            .entry(fingerprint.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let result = slot.get_or_init(|| async { Arc::new(work().await) }).await.clone();

        self.inflight.remove_if(&fingerprint, |_, v| Arc::ptr_eq(v, &slot));

        result
    }
}
