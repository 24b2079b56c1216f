//! The error taxonomy shared across every crate boundary.
//!
//! One flat enum with helper constructors, a retryability predicate,
//! and an abstract "kind" string for logging and client identification,
//! kept independent of any particular transport (HTTP status codes are
//! assigned at the network edge, not here).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Rate limit exceeded: {message}")]
    RateLimit { message: String, retry_after_secs: Option<u64> },

    #[error("Payment required: {message}")]
    Payment { message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Upstream server error: {message}")]
    Server { message: String },

    #[error("Processing error: {message}")]
    Processing { message: String },

    #[error("Session error: {message}")]
    Session { message: String },

    #[error("Protocol error: {message}")]
    Protocol { message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl IngestError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth { message: message.into() }
    }

    pub fn rate_limit(message: impl Into<String>, retry_after_secs: Option<u64>) -> Self {
        Self::RateLimit { message: message.into(), retry_after_secs }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::Server { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Abstract error kind, used for logging and client-visible
    /// identification; never a Rust type name.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Validation { .. } => "validation_error",
            IngestError::Auth { .. } => "auth_error",
            IngestError::RateLimit { .. } => "rate_limit_error",
            IngestError::Payment { .. } => "payment_error",
            IngestError::Network { .. } => "network_error",
            IngestError::Server { .. } => "server_error",
            IngestError::Processing { .. } => "processing_error",
            IngestError::Session { .. } => "session_error",
            IngestError::Protocol { .. } => "protocol_error",
            IngestError::NotFound(_) => "not_found",
            IngestError::Internal { .. } => "internal_error",
        }
    }

    /// Whether the cascade (or the client) should retry this category.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IngestError::RateLimit { .. } | IngestError::Network { .. } | IngestError::Server { .. }
        )
    }

    /// Auth errors short-circuit the strategy cascade: no fallback is
    /// attempted once one is observed.
    pub fn is_auth(&self) -> bool {
        matches!(self, IngestError::Auth { .. })
    }
}

pub type IngestResult<T> = Result<T, IngestError>;

impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            IngestError::network(format!("timed out: {err}"))
        } else if err.is_connect() {
            IngestError::network(format!("connection failed: {err}"))
        } else {
            IngestError::network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        IngestError::Protocol { message: format!("JSON error: {err}") }
    }
}
