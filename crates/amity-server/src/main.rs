//! # amity-server
//!
//! HTTP boundary for the Amity messaging and photo core.
//!
//! This binary provides:
//! - **REST API** (axum) for the member directory, private messages, photo
//!   management and the moderation queue
//! - **Disk-backed photo storage** serving uploaded bytes at `/photos/{id}`
//! - **First-run seed import** of member data from a JSON file
//!
//! The requester is identified by the `x-amity-user` header, which an
//! authenticating gateway in front of this server is expected to set.

mod api;
mod config;
mod error;
mod photo_store;

use std::sync::Arc;

use amity_store::{seed, Database};
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::photo_store::PhotoStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,amity_server=debug,amity_store=debug")),
        )
        .init();

    info!("Starting Amity server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the database and import seed data on first run
    // -----------------------------------------------------------------------
    let mut db = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    info!(path = ?db.path(), "Database ready");

    if let Some(seed_file) = &config.seed_file {
        let json = tokio::fs::read_to_string(seed_file).await?;
        let imported = seed::seed_users(&mut db, &json)?;
        info!(file = %seed_file.display(), imported, "Seed file processed");
    }

    // -----------------------------------------------------------------------
    // 4. Photo storage (creates directory if missing)
    // -----------------------------------------------------------------------
    let photo_store = PhotoStore::new(
        config.photo_storage_path.clone(),
        config.public_base_url.clone(),
        config.max_photo_size,
    )
    .await?;

    let http_addr = config.http_addr;
    let app_state = AppState {
        db: Arc::new(Mutex::new(db)),
        photo_store: Arc::new(photo_store),
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server until it fails or Ctrl+C arrives
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
