//! Thin bearer-token client over the upstream scrape/search/map/crawl
//! API: an API-key-as-header JSON client with categorized-status error
//! mapping.

use crate::{FetchOptions, FetchResult};
use fetchmcp_types::error::{IngestError, IngestResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One of the additional formats the upstream `scrape` call can return
/// alongside the primary content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnhancedFormat {
    Markdown,
    Html,
    RawHtml,
    Links,
    Images,
    Screenshot,
    Summary,
    Branding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnhancedCallKind {
    Scrape,
    Search,
    Map,
    Crawl,
}

impl EnhancedCallKind {
    fn endpoint(&self) -> &'static str {
        match self {
            EnhancedCallKind::Scrape => "/v1/scrape",
            EnhancedCallKind::Search => "/v1/search",
            EnhancedCallKind::Map => "/v1/map",
            EnhancedCallKind::Crawl => "/v1/crawl",
        }
    }
}

#[derive(Debug)]
pub struct EnhancedFetcher {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl EnhancedFetcher {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> IngestResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent("fetchmcp/0.1")
            .gzip(true)
            .brotli(true)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| IngestError::internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, base_url: base_url.into(), api_key: api_key.into() })
    }

    /// Issues one call against the upstream API. The request body is
    /// caller-assembled JSON; the response body is returned as-is for the
    /// caller to interpret per call kind.
    pub async fn call(
        &self,
        kind: EnhancedCallKind,
        body: serde_json::Value,
        options: &FetchOptions,
    ) -> IngestResult<serde_json::Value> {
        let timeout = if options.timeout_ms > 0 {
            Duration::from_millis(options.timeout_ms)
        } else {
            Duration::from_secs(60)
        };
        let url = format!("{}{}", self.base_url, kind.endpoint());

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(IngestError::from)?;

        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(IngestError::from);
        }

        let detail = response.text().await.unwrap_or_default();
        Err(classify_status(status, detail))
    }

    /// `scrape` is the only call kind with a typed result shape in this
    /// service (the others return caller-shaped JSON resources directly).
    pub async fn scrape(
        &self,
        url: &str,
        formats: &[EnhancedFormat],
        options: &FetchOptions,
    ) -> IngestResult<FetchResult> {
        let mut body = serde_json::json!({ "url": url, "formats": formats });
        if let serde_json::Value::Object(map) = &mut body {
            map.extend(options.extra.clone());
            if !options.actions.is_empty() {
                map.insert("actions".to_string(), serde_json::Value::Array(options.actions.clone()));
            }
        }

        let raw = self.call(EnhancedCallKind::Scrape, body, options).await?;

        let content = raw
            .get("markdown")
            .or_else(|| raw.get("content"))
            .or_else(|| raw.get("rawHtml"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .as_bytes()
            .to_vec();

        let screenshot_base64 = raw
            .get("screenshot")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let links = raw.get("links").and_then(|v| v.as_array()).map(|arr| {
            arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()
        });

        Ok(FetchResult {
            content,
            mime_type: "text/markdown".to_string(),
            raw_metadata: raw,
            screenshot_base64,
            links,
        })
    }

    /// Polls the status of a previously started crawl job. Returns the
    /// upstream's job document as-is; the caller maps it onto
    /// `CrawlJobStatus`.
    pub async fn crawl_status(&self, job_id: &str) -> IngestResult<serde_json::Value> {
        let url = format!("{}/v1/crawl/{job_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(IngestError::from)?;

        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(IngestError::from);
        }

        let detail = response.text().await.unwrap_or_default();
        Err(classify_status(status, detail))
    }

    /// Requests cancellation of a previously started crawl job.
    pub async fn crawl_cancel(&self, job_id: &str) -> IngestResult<()> {
        let url = format!("{}/v1/crawl/{job_id}", self.base_url);
        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(IngestError::from)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        Err(classify_status(status, detail))
    }
}

/// Maps upstream HTTP status categories onto the shared error taxonomy.
fn classify_status(status: reqwest::StatusCode, detail: String) -> IngestError {
    match status.as_u16() {
        401 | 403 => IngestError::auth(detail),
        402 => IngestError::Payment { message: detail },
        408 => IngestError::network(format!("request timed out: {detail}")),
        429 => {
            let retry_after = None;
            IngestError::rate_limit(detail, retry_after)
        }
        404 => IngestError::NotFound(detail),
        400..=499 => IngestError::Validation { message: detail },
        500..=599 => IngestError::server(detail),
        _ => IngestError::network(format!("unexpected status {status}: {detail}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn scrape_extracts_markdown_and_links() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/scrape"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "markdown": "# hi",
                "links": ["https://a.io", "https://b.io"],
            })))
            .mount(&server)
            .await;

        let fetcher = EnhancedFetcher::new(server.uri(), "key").unwrap();
        let result = fetcher
            .scrape("https://x.io", &[EnhancedFormat::Markdown], &FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(result.content, b"# hi");
        assert_eq!(result.links.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/scrape"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let fetcher = EnhancedFetcher::new(server.uri(), "key").unwrap();
        let err = fetcher
            .scrape("https://x.io", &[], &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn rate_limited_maps_to_rate_limit_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/scrape"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let fetcher = EnhancedFetcher::new(server.uri(), "key").unwrap();
        let err = fetcher
            .scrape("https://x.io", &[], &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::RateLimit { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn server_error_maps_to_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/scrape"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let fetcher = EnhancedFetcher::new(server.uri(), "key").unwrap();
        let err = fetcher
            .scrape("https://x.io", &[], &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Server { .. }));
    }

    #[tokio::test]
    async fn crawl_status_returns_upstream_job_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/crawl/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "running",
                "completed": 3,
                "total": 10,
            })))
            .mount(&server)
            .await;

        let fetcher = EnhancedFetcher::new(server.uri(), "key").unwrap();
        let doc = fetcher.crawl_status("job-1").await.unwrap();
        assert_eq!(doc["status"], "running");
        assert_eq!(doc["completed"], 3);
    }

    #[tokio::test]
    async fn crawl_status_not_found_maps_to_not_found_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/crawl/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such job"))
            .mount(&server)
            .await;

        let fetcher = EnhancedFetcher::new(server.uri(), "key").unwrap();
        let err = fetcher.crawl_status("missing").await.unwrap_err();
        assert!(matches!(err, IngestError::NotFound(_)));
    }

    #[tokio::test]
    async fn crawl_cancel_succeeds_on_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/crawl/job-1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let fetcher = EnhancedFetcher::new(server.uri(), "key").unwrap();
        fetcher.crawl_cancel("job-1").await.unwrap();
    }

    #[tokio::test]
    async fn crawl_cancel_unauthorized_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/crawl/job-1"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let fetcher = EnhancedFetcher::new(server.uri(), "key").unwrap();
        let err = fetcher.crawl_cancel("job-1").await.unwrap_err();
        assert!(err.is_auth());
    }
}
