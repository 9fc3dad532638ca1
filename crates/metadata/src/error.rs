//! Metadata store error types.

use thiserror::Error;

/// Metadata store operation errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// No live row exists where one was required.
    #[error("not found: {0}")]
    NotFound(String),

    /// A row exists but its download has not completed; callers on the
    /// waiter path poll until this clears.
    #[error("not ready: {0}")]
    NotReady(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for metadata operations.
pub type MetadataResult<T> = std::result::Result<T, MetadataError>;
