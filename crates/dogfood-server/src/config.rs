//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use dogfood_shared::UserId;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Filesystem path of the SQLite database.
    /// Env: `DATABASE_PATH`
    /// Default: `./dogfood.db`
    pub database_path: PathBuf,

    /// Static bearer tokens mapped to user ids, comma-separated
    /// `token:uuid` pairs. Auth is an external collaborator; this map is the
    /// minimal stand-in a self-hosted deployment needs.
    /// Env: `AUTH_TOKENS`
    /// Default: empty (every request is rejected with 401).
    pub auth_tokens: Vec<(String, UserId)>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            database_path: PathBuf::from("./dogfood.db"),
            auth_tokens: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Ok(spec) = std::env::var("AUTH_TOKENS") {
            match parse_auth_tokens(&spec) {
                Ok(tokens) => config.auth_tokens = tokens,
                Err(e) => {
                    tracing::warn!(error = %e, "Invalid AUTH_TOKENS, ignoring");
                }
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

/// Parse `token:uuid,token:uuid` pairs. Empty input yields an empty map.
fn parse_auth_tokens(spec: &str) -> Result<Vec<(String, UserId)>, String> {
    let mut tokens = Vec::new();
    for pair in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (token, user) = pair
            .split_once(':')
            .ok_or_else(|| format!("expected token:uuid, got {pair:?}"))?;
        if token.is_empty() {
            return Err(format!("empty token in {pair:?}"));
        }
        let id = user
            .parse::<uuid::Uuid>()
            .map_err(|e| format!("bad user id in {pair:?}: {e}"))?;
        tokens.push((token.to_string(), UserId(id)));
    }
    Ok(tokens)
}
