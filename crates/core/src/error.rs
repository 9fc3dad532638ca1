//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid cache key: {0}")]
    InvalidKey(String),

    #[error("invalid source url: {0}")]
    InvalidUrl(String),

    #[error("header parse error: {0}")]
    HeaderParse(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
