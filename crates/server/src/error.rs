//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream fetch failed: {0}")]
    UpstreamFetch(String),

    #[error("resource stuck: {0}")]
    ResourceStuck(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("core error: {0}")]
    Core(#[from] knox_core::Error),

    #[error("metadata error: {0}")]
    Metadata(#[from] knox_metadata::MetadataError),

    #[error("storage error: {0}")]
    Storage(#[from] knox_storage::StorageError),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::UpstreamFetch(_) => "upstream_fetch_failed",
            Self::ResourceStuck(_) => "resource_stuck",
            Self::Internal(_) => "internal_error",
            Self::Core(_) => "core_error",
            Self::Metadata(_) => "metadata_error",
            Self::Storage(_) => "storage_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UpstreamFetch(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ResourceStuck(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Core(e) => match e {
                // A key or URL the client handed us; its problem.
                knox_core::Error::InvalidKey(_) => StatusCode::BAD_REQUEST,
                knox_core::Error::InvalidUrl(_) => StatusCode::BAD_REQUEST,
                // A stored header block we failed to parse back; ours.
                knox_core::Error::HeaderParse(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Metadata(e) => match e {
                knox_metadata::MetadataError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
