//! Fetchers: a native direct-HTTP client, an enhanced upstream-API
//! client, and the strategy cascade that picks between them.
//!
//! The native client is a plain timeouts-plus-gzip/brotli `reqwest`
//! client; the enhanced client layers a bearer-token JSON upstream API
//! on top of the same transport.

mod cascade;
mod enhanced;
mod native;

pub use cascade::{cascade_fetch, CascadeError, CascadeOutcome, CascadeResult};
pub use enhanced::{EnhancedCallKind, EnhancedFetcher, EnhancedFormat};
pub use native::NativeFetcher;

use serde::{Deserialize, Serialize};

/// The common result shape both fetchers return on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    pub content: Vec<u8>,
    pub mime_type: String,
    pub raw_metadata: serde_json::Value,
    pub screenshot_base64: Option<String>,
    pub links: Option<Vec<String>>,
}

impl FetchResult {
    pub fn text(content: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            mime_type: mime_type.into(),
            raw_metadata: serde_json::Value::Null,
            screenshot_base64: None,
            links: None,
        }
    }
}

/// Per-call fetch options understood by both fetchers. Fields not
/// meaningful to a given fetcher (e.g. `formats` for native) are ignored
/// rather than rejected.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub timeout_ms: u64,
    pub formats: Vec<EnhancedFormat>,
    pub actions: Vec<serde_json::Value>,
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl FetchOptions {
    pub fn wants_screenshot(&self) -> bool {
        self.formats.iter().any(|f| matches!(f, EnhancedFormat::Screenshot))
    }
}
