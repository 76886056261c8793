//! # dogfood-server
//!
//! Self-hosted HTTP front for the message delivery core.
//!
//! This binary provides:
//! - **REST API** (axum) for sending messages, paging history, and advancing
//!   delivery status
//! - **Change fan-out**: after each committed write the corresponding change
//!   event is published to in-process subscribers, standing in for a hosted
//!   platform's change-data-capture stream
//! - **SQLite persistence** (WAL, versioned migrations)
//! - **Static bearer-token authentication** mapping tokens to user ids

mod api;
mod auth;
mod config;
mod error;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use dogfood_feed::LocalFeed;
use dogfood_store::SqliteStore;

use crate::api::AppState;
use crate::auth::TokenMap;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,dogfood_server=debug")),
        )
        .init();

    info!("Starting dogfood server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(
        db = %config.database_path.display(),
        tokens = config.auth_tokens.len(),
        "Loaded configuration"
    );
    if config.auth_tokens.is_empty() {
        tracing::warn!("AUTH_TOKENS is empty; every request will be rejected with 401");
    }

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let store = Arc::new(SqliteStore::open_at(&config.database_path)?);
    let feed = Arc::new(LocalFeed::new());
    let auth = Arc::new(TokenMap::new(config.auth_tokens.clone()));

    let state = AppState { store, feed, auth };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(state, config.http_addr) => {
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
