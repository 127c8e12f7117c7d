//! Errors surfaced to ingestion callers.
//!
//! Only authentication, input and fatal storage failures reach the caller.
//! Detection and alerting failures are logged inside the pipeline.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use shared::decode::envelope::EnvelopeError;
use shared::decode::DecodeError;
use thiserror::Error;

/// JSON error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// HTTP status code.
    pub code: u16,
    /// Human-readable description.
    pub message: String,
}

/// Ingestion failures.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Missing or wrong credential.
    #[error("Invalid or missing API key")]
    Auth,

    /// Empty body, bad envelope or a pinned dialect that failed to decode.
    #[error("Malformed request: {0}")]
    Malformed(String),

    /// No dialect in the detection chain accepted the body.
    #[error("{0}")]
    Ambiguous(String),

    /// Every record in the batch failed to store.
    #[error("Storage failed: {0}")]
    Storage(String),
}

impl IngestError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Auth => StatusCode::FORBIDDEN,
            Self::Malformed(_) | Self::Ambiguous(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DecodeError> for IngestError {
    fn from(err: DecodeError) -> Self {
        if err.is_ambiguous() {
            Self::Ambiguous(err.to_string())
        } else {
            Self::Malformed(err.to_string())
        }
    }
}

impl From<EnvelopeError> for IngestError {
    fn from(err: EnvelopeError) -> Self {
        Self::Malformed(err.to_string())
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            code: status.as_u16(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
