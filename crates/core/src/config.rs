//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address at which the HTTP listener binds (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen")]
    pub listen_address: String,
    /// Address at which the service is reachable from the outside; this
    /// is what gets embedded into rewritten links and the service worker.
    #[serde(default = "default_advertise")]
    pub advertise_address: String,
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_advertise() -> String {
    "localhost:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen(),
            advertise_address: default_advertise(),
        }
    }
}

/// On-disk store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory in which cached blob files are placed, one file per
    /// resource named by its numeric id.
    #[serde(default = "default_store_root")]
    pub file_store_root: PathBuf,
    /// Path to the sqlite metadata database. Defaults to `knox.db`
    /// inside `file_store_root`.
    #[serde(default)]
    pub db_file: Option<PathBuf>,
}

fn default_store_root() -> PathBuf {
    PathBuf::from("./data/store")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            file_store_root: default_store_root(),
            db_file: None,
        }
    }
}

impl StoreConfig {
    /// Resolve the database file path, applying the default.
    pub fn db_file(&self) -> PathBuf {
        self.db_file
            .clone()
            .unwrap_or_else(|| self.file_store_root.join("knox.db"))
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Store configuration.
    #[serde(default)]
    pub store: StoreConfig,
}

impl AppConfig {
    /// Create a configuration rooted at the given directory, for tests.
    pub fn for_store_root(root: impl AsRef<Path>) -> Self {
        Self {
            server: ServerConfig::default(),
            store: StoreConfig {
                file_store_root: root.as_ref().to_path_buf(),
                db_file: None,
            },
        }
    }
}
