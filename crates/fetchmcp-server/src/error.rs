//! The error taxonomy's transport-facing half: mapping `IngestError` and
//! the session/pipeline error types onto JSON-RPC error objects and, for
//! the handful of errors that occur before a JSON-RPC frame can even be
//! parsed, onto HTTP status codes.
//!
//! A flat enum with a status/kind per variant and a single
//! `IntoResponse` impl, mapped to JSON-RPC error codes instead of a
//! REST body since every in-protocol failure is carried inside a 200
//! JSON-RPC envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fetchmcp_pipeline::PipelineError;
use fetchmcp_session::SessionError;
use fetchmcp_types::error::IngestError;
use thiserror::Error;

use crate::protocol::JsonRpcErrorObject;

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
pub const SESSION_ERROR: i64 = -32000;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("malformed JSON-RPC frame: {0}")]
    Parse(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("unknown method: {0}")]
    MethodNotFound(String),
    #[error("invalid params: {0}")]
    InvalidParams(String),
}

impl ServerError {
    /// JSON-RPC error code for this failure, per the error handling
    /// design's taxonomy table.
    pub fn json_rpc_code(&self) -> i64 {
        match self {
            ServerError::Parse(_) => PARSE_ERROR,
            ServerError::InvalidRequest(_) => INVALID_REQUEST,
            ServerError::MethodNotFound(_) => METHOD_NOT_FOUND,
            ServerError::InvalidParams(_) => INVALID_PARAMS,
            ServerError::Session(_) => SESSION_ERROR,
            ServerError::Ingest(_) | ServerError::Pipeline(_) => INTERNAL_ERROR,
        }
    }

    pub fn to_json_rpc_error(&self) -> JsonRpcErrorObject {
        JsonRpcErrorObject {
            code: self.json_rpc_code(),
            message: self.to_string(),
            data: None,
        }
    }

    /// HTTP status used only for failures the session/tool layer never
    /// sees: a request body that cannot even be parsed as JSON-RPC.
    pub fn http_status(&self) -> StatusCode {
        match self {
            ServerError::Parse(_) | ServerError::InvalidRequest(_) | ServerError::InvalidParams(_) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::MethodNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Session(_) => StatusCode::BAD_REQUEST,
            ServerError::Ingest(_) | ServerError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let error = self.to_json_rpc_error();
        tracing::warn!(code = error.code, message = %error.message, "request rejected before dispatch");
        (status, Json(crate::protocol::JsonRpcResponse::error(None, error))).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
