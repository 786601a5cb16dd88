//! Worker configuration
//!
//! Bind address and node name come from the environment (`WORKER_HOST` /
//! `WORKER_PORT`, falling back to the generic `HOST` / `PORT`), with
//! command-line flags layered on top by `main`.

use anyhow::{Context, Result};
use shared::defaults::{DEFAULT_HOST, DEFAULT_WORKER_PORT};
use uuid::Uuid;

/// Resolved startup configuration for a worker node.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Node name used in logs; generated when not supplied.
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl WorkerConfig {
    /// Reads configuration from the environment.
    pub fn from_env() -> Result<Self> {
        let host = env_or("WORKER_HOST", "HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match env_or("WORKER_PORT", "PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("invalid worker port: {}", raw))?,
            None => DEFAULT_WORKER_PORT,
        };

        let name = std::env::var("WORKER_NAME")
            .ok()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("worker-{}", Uuid::new_v4()));

        Ok(Self { name, host, port })
    }

    /// The address the HTTP server binds to.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_or(primary: &str, fallback: &str) -> Option<String> {
    std::env::var(primary)
        .ok()
        .filter(|value| !value.is_empty())
        .or_else(|| {
            std::env::var(fallback)
                .ok()
                .filter(|value| !value.is_empty())
        })
}
