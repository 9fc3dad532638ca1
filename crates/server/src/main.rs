//! Knox server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use knox_core::config::AppConfig;
use knox_metadata::{MetadataStore, SqliteStore};
use knox_server::{create_router, AppState};
use knox_storage::BlobStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Knox - a self-hosted web resource cache and rewriting proxy
#[derive(Parser, Debug)]
#[command(name = "knoxd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "KNOX_CONFIG", default_value = "config/knox.toml")]
    config: String,

    /// The address at which the service will listen.
    #[arg(long)]
    listen_address: Option<String>,

    /// The address at which the service will be accessible.
    #[arg(long)]
    advertise_address: Option<String>,

    /// The directory in which to place cached files.
    #[arg(long)]
    file_store_root: Option<PathBuf>,

    /// The path to the sqlite db file (defaults to <file-store-root>/knox.db).
    #[arg(long)]
    db_file: Option<PathBuf>,
}

/// Load configuration: optional TOML file, KNOX_ environment variables,
/// then command-line flags, in increasing order of precedence.
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut figment = Figment::new();
    let config_path = std::path::Path::new(&args.config);
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    }

    let mut config: AppConfig = figment
        .merge(Env::prefixed("KNOX_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    if let Some(listen) = &args.listen_address {
        config.server.listen_address = listen.clone();
    }
    if let Some(advertise) = &args.advertise_address {
        config.server.advertise_address = advertise.clone();
    }
    if let Some(root) = &args.file_store_root {
        config.store.file_store_root = root.clone();
    }
    if let Some(db_file) = &args.db_file {
        config.store.db_file = Some(db_file.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Knox v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args)?;

    let blobs = Arc::new(
        BlobStore::new(&config.store.file_store_root)
            .await
            .context("failed to initialize blob store")?,
    );
    blobs
        .health_check()
        .await
        .context("blob store health check failed")?;
    tracing::info!(root = %config.store.file_store_root.display(), "Blob store initialized");

    let metadata: Arc<dyn MetadataStore> = Arc::new(
        SqliteStore::new(config.store.db_file())
            .await
            .context("failed to initialize metadata store")?,
    );
    tracing::info!(db_file = %config.store.db_file().display(), "Metadata store initialized");

    let listen = config.server.listen_address.clone();
    let state = AppState::new(config, metadata, blobs);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .with_context(|| format!("failed to bind to {listen}"))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let args = Args {
            config: "does-not-exist.toml".to_string(),
            listen_address: Some("127.0.0.1:9999".to_string()),
            advertise_address: Some("cache.example.com:80".to_string()),
            file_store_root: Some(PathBuf::from("/var/knox")),
            db_file: None,
        };

        let config = load_config(&args).unwrap();
        assert_eq!(config.server.listen_address, "127.0.0.1:9999");
        assert_eq!(config.server.advertise_address, "cache.example.com:80");
        assert_eq!(config.store.file_store_root, PathBuf::from("/var/knox"));
        assert_eq!(config.store.db_file(), PathBuf::from("/var/knox/knox.db"));
    }

    #[test]
    fn explicit_db_file_flag_wins_over_default() {
        let args = Args {
            config: "does-not-exist.toml".to_string(),
            listen_address: None,
            advertise_address: None,
            file_store_root: Some(PathBuf::from("/var/knox")),
            db_file: Some(PathBuf::from("/elsewhere/meta.db")),
        };

        let config = load_config(&args).unwrap();
        assert_eq!(config.store.db_file(), PathBuf::from("/elsewhere/meta.db"));
    }
}
