//! Server test utilities.

use knox_core::config::AppConfig;
use knox_core::encoder;
use knox_metadata::{MetadataStore, SqliteStore};
use knox_server::{create_router, AppState};
use knox_storage::BlobStore;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// A Knox instance listening on an ephemeral port over a real store.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    _temp_dir: Option<TempDir>,
}

#[allow(dead_code)]
impl TestServer {
    /// Create an instance with its own temporary store.
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let root = temp_dir.path().to_path_buf();
        Self::start(&root, Some(temp_dir)).await
    }

    /// Create an instance over an existing store root, for tests that
    /// run several instances against one shared store.
    pub async fn shared(root: &Path) -> Self {
        Self::start(root, None).await
    }

    async fn start(root: &Path, temp_dir: Option<TempDir>) -> Self {
        let blobs = Arc::new(
            BlobStore::new(root)
                .await
                .expect("Failed to create blob store"),
        );

        let config = AppConfig::for_store_root(root);
        let metadata: Arc<dyn MetadataStore> = Arc::new(
            SqliteStore::new(config.store.db_file())
                .await
                .expect("Failed to create metadata store"),
        );

        let state = AppState::new(config, metadata, blobs);
        let router = create_router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("server exited");
        });

        Self {
            addr,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// The cache URL for a source URL, as a client would request it.
    pub fn cached_url(&self, source_url: &str) -> String {
        format!("http://{}/c/{}", self.addr, encoder::encode(source_url))
    }

    /// A URL on this instance for an arbitrary path.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}
