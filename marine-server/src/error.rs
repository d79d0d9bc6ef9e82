//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use marine_core::MarineError;
use thiserror::Error;

use crate::db::StoreError;
use crate::ingest::IngestError;
use crate::relay::RelayError;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Not found - requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Nothing is queued for crawling
    #[error("No URLs submitted.")]
    EmptyQueue,

    /// Internal server error - unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// An upstream collaborator could not be reached or refused the request
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::EmptyQueue => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Get the error code for programmatic error handling
    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::EmptyQueue => "EMPTY_QUEUE",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            Self::BadRequest(msg) | Self::NotFound(msg) => msg.clone(),
            Self::EmptyQueue => self.to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            Self::UpstreamUnavailable(_) => "Upstream service unavailable".to_string(),
        }
    }
}

impl From<MarineError> for ApiError {
    fn from(err: MarineError) -> Self {
        match err {
            MarineError::Validation(msg) | MarineError::Parse(msg) => Self::BadRequest(msg),
            MarineError::EmptyQueue => Self::EmptyQueue,
            MarineError::Transport(_) | MarineError::Timeout(_) | MarineError::Remote { .. } => {
                Self::UpstreamUnavailable(err.to_string())
            }
            MarineError::Io(_) | MarineError::Persistence(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Validation(msg) => Self::BadRequest(msg),
            IngestError::Io(_) | IngestError::Persistence(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        Self::UpstreamUnavailable(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        // Log based on severity, always including internal details
        match &self {
            Self::BadRequest(_) | Self::NotFound(_) | Self::EmptyQueue => {
                tracing::warn!(
                    status = %status,
                    code = code,
                    error = %internal_message,
                    "Client error"
                );
            }
            Self::UpstreamUnavailable(_) => {
                tracing::warn!(
                    status = %status,
                    code = code,
                    error = %internal_message,
                    "Upstream error"
                );
            }
            Self::Internal(_) => {
                tracing::error!(
                    status = %status,
                    code = code,
                    error = %internal_message,
                    "Server error"
                );
            }
        }

        // All error responses include a `code` field for programmatic error handling
        let body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}
