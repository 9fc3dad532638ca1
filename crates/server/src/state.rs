//! Application state shared across handlers.

use knox_core::config::AppConfig;
use knox_metadata::MetadataStore;
use knox_storage::BlobStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Metadata index, shared with any other instance pointed at the
    /// same database file.
    pub metadata: Arc<dyn MetadataStore>,
    /// Compressed blob store.
    pub blobs: Arc<BlobStore>,
    /// Upstream HTTP client.
    pub http: reqwest::Client,
}

impl AppState {
    /// Create a new application state.
    pub fn new(config: AppConfig, metadata: Arc<dyn MetadataStore>, blobs: Arc<BlobStore>) -> Self {
        Self {
            config: Arc::new(config),
            metadata,
            blobs,
            http: reqwest::Client::new(),
        }
    }
}
