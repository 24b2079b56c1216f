//! Resumable event-stream records for the session runtime.

use serde::{Deserialize, Serialize};

/// An event id is `<stream_id>_<monotonic_suffix>`. The suffix alone is
/// compared for ordering within a stream; the struct keeps both parts so
/// a raw `Last-Event-ID` header can be parsed back into a stream scope.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId {
    pub stream_id: String,
    pub suffix: u64,
}

impl EventId {
    pub fn new(stream_id: impl Into<String>, suffix: u64) -> Self {
        Self {
            stream_id: stream_id.into(),
            suffix,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let (stream_id, suffix) = raw.rsplit_once('_')?;
        let suffix = suffix.parse().ok()?;
        Some(Self {
            stream_id: stream_id.to_string(),
            suffix,
        })
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.stream_id, self.suffix)
    }
}

/// A single server-initiated message retained for replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    pub id: EventId,
    pub message: serde_json::Value,
}
