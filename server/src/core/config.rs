//! Application configuration
//!
//! Configuration is assembled from CLI arguments with environment fallbacks
//! (clap handles the env layer) and defaults from `constants`.

use std::path::PathBuf;

use anyhow::{Context, Result};

use super::cli::Cli;
use super::constants::{
    DEFAULT_DB_FILENAME, DEFAULT_HOST, DEFAULT_PORT, ENV_SIGNING_KEY, HEARTBEAT_INTERVAL_SECS,
};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database_path: PathBuf,
    /// HS256 signing key for session tokens
    pub signing_key: Vec<u8>,
    pub heartbeat_secs: u64,
}

impl AppConfig {
    pub fn load(cli: &Cli) -> Result<Self> {
        let signing_key = match std::env::var(ENV_SIGNING_KEY) {
            Ok(hex_key) => hex::decode(hex_key.trim())
                .with_context(|| format!("{} must be hex encoded", ENV_SIGNING_KEY))?,
            Err(_) => {
                // Ephemeral key: sessions do not survive a restart. Fine for
                // development, set the env var in production.
                tracing::warn!(
                    "{} not set, generating an ephemeral signing key",
                    ENV_SIGNING_KEY
                );
                crate::utils::crypto::generate_signing_key()
            }
        };

        if signing_key.len() < 32 {
            anyhow::bail!("signing key must be at least 32 bytes");
        }

        Ok(Self {
            server: ServerConfig {
                host: cli.host.clone().unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: cli.port.unwrap_or(DEFAULT_PORT),
            },
            database_path: cli
                .database
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILENAME)),
            signing_key,
            heartbeat_secs: cli.heartbeat_secs.unwrap_or(HEARTBEAT_INTERVAL_SECS),
        })
    }
}
