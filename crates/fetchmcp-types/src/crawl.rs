//! Crawl job handle: a thin, server-side pointer to upstream job state.

use serde::{Deserialize, Serialize};

/// Mirrors only the states the upstream provider itself reports; the server
/// never invents a crawl status of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlJobStatus {
    Submitted,
    Scraping,
    Completed,
    Failed,
    Cancelled,
}

impl CrawlJobStatus {
    /// `cancelled` is only reachable from `scraping` via an explicit cancel.
    pub fn can_cancel(&self) -> bool {
        matches!(self, CrawlJobStatus::Scraping | CrawlJobStatus::Submitted)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CrawlJobStatus::Completed | CrawlJobStatus::Failed | CrawlJobStatus::Cancelled
        )
    }
}

/// Server-side bookkeeping for one crawl job. No state here is
/// authoritative beyond what the upstream last reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlJobHandle {
    pub job_id: String,
    pub start_url: String,
    pub pages_seen: u64,
    pub cursor: u64,
    pub status: CrawlJobStatus,
    pub locally_cancelled: bool,
}

impl CrawlJobHandle {
    pub fn new(job_id: String, start_url: String) -> Self {
        Self {
            job_id,
            start_url,
            pages_seen: 0,
            cursor: 0,
            status: CrawlJobStatus::Submitted,
            locally_cancelled: false,
        }
    }
}
