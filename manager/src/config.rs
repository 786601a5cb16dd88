//! Manager configuration
//!
//! Bind address comes from `MANAGER_HOST` / `MANAGER_PORT` (falling back to
//! the generic `HOST` / `PORT`); the worker fleet comes from the
//! comma-separated `WORKERS` variable. Command-line flags are layered on top
//! by `main`.

use anyhow::{Context, Result};
use shared::defaults::{DEFAULT_HOST, DEFAULT_MANAGER_PORT};

/// Resolved startup configuration for the manager node.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub host: String,
    pub port: u16,
    /// Worker addresses (`host:port`) the scheduler places tasks on.
    pub workers: Vec<String>,
}

impl ManagerConfig {
    /// Reads configuration from the environment.
    pub fn from_env() -> Result<Self> {
        let host = env_or("MANAGER_HOST", "HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match env_or("MANAGER_PORT", "PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("invalid manager port: {}", raw))?,
            None => DEFAULT_MANAGER_PORT,
        };

        let workers = std::env::var("WORKERS")
            .map(|raw| parse_workers(&raw))
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            workers,
        })
    }

    /// The address the HTTP server binds to.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Splits a comma-separated worker list, dropping empty entries.
pub fn parse_workers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|address| address.trim().to_string())
        .filter(|address| !address.is_empty())
        .collect()
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
