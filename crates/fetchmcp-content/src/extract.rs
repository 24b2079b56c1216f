//! The LLM-extraction seam: a narrow trait so the pipeline can run
//! without ever depending on a particular model provider. Hook-based
//! extraction, disabled gracefully when unconfigured, prompt + content
//! in, structured text out.

use async_trait::async_trait;
use fetchmcp_types::error::IngestResult;

#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub text: String,
}

/// A provider turns (content, prompt) into extracted text. Implementors
/// own their own upstream client, auth, and retry policy; this crate
/// only defines the seam.
#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    async fn extract(&self, content: &str, prompt: &str) -> IngestResult<ExtractionOutcome>;

    /// Whether this provider is usable right now (e.g. has credentials).
    /// The pipeline treats `extract` being present with no configured,
    /// enabled provider as "extraction not configured" rather than an
    /// error.
    fn is_configured(&self) -> bool {
        true
    }
}

/// The default provider when no LLM is configured. The pipeline checks
/// `is_configured()` before calling `extract` at all, so this exists
/// mainly to give callers a concrete type to hold when wiring optional
/// extraction through the server without an `Option<dyn Trait>` at every
/// call site.
pub struct NoExtractionProvider;

#[async_trait]
impl ExtractionProvider for NoExtractionProvider {
    async fn extract(&self, _content: &str, _prompt: &str) -> IngestResult<ExtractionOutcome> {
        Err(fetchmcp_types::error::IngestError::internal(
            "no LLM extraction provider is configured",
        ))
    }

    fn is_configured(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_provider_reports_unconfigured() {
        let provider = NoExtractionProvider;
        assert!(!provider.is_configured());
        assert!(provider.extract("body", "summarize").await.is_err());
    }
}
