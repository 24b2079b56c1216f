//! Direct HTTP fetcher: no upstream API, just a GET against the target
//! URL. Cannot produce screenshots or run browser actions.

use crate::{FetchOptions, FetchResult};
use fetchmcp_types::error::{IngestError, IngestResult};
use std::time::Duration;

#[derive(Debug)]
pub struct NativeFetcher {
    client: reqwest::Client,
}

impl NativeFetcher {
    pub fn new() -> IngestResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent("fetchmcp/0.1")
            .gzip(true)
            .brotli(true)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| IngestError::internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// A GET with a configurable per-call timeout. Success requires a
    /// 2xx status and a non-empty body; 401/403 are surfaced as auth
    /// errors so the cascade can skip the enhanced fallback.
    pub async fn fetch(&self, url: &str, options: &FetchOptions) -> IngestResult<FetchResult> {
        let timeout = if options.timeout_ms > 0 {
            Duration::from_millis(options.timeout_ms)
        } else {
            Duration::from_secs(60)
        };

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(IngestError::from)?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(IngestError::auth(format!("native fetch rejected with {status}")));
        }
        if !status.is_success() {
            return Err(IngestError::network(format!("native fetch returned {status}")));
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let body = response.bytes().await.map_err(IngestError::from)?;
        if body.is_empty() {
            return Err(IngestError::network("native fetch returned an empty body"));
        }

        Ok(FetchResult {
            content: body.to_vec(),
            mime_type,
            raw_metadata: serde_json::json!({ "status": status.as_u16() }),
            screenshot_base64: None,
            links: None,
        })
    }
}
