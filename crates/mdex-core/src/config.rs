//! Application configuration.
//!
//! Built once at process start from the environment and passed into every
//! component that needs it; nothing reads configuration ambiently after
//! startup.

use std::net::SocketAddr;

use crate::error::{Error, Result};

/// Process-wide configuration for the mdex service.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `DATABASE_URL` | required | PostgreSQL connection string |
/// | `MDEX_BIND_ADDR` | `127.0.0.1:8080` | API listen address |
/// | `MDEX_PIPELINE_URL` | — | Extraction pipeline endpoint |
/// | `MDEX_PUBLIC_BASE_URL` | `http://<bind_addr>` | Base for status/result links |
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// API listen address.
    pub bind_addr: SocketAddr,
    /// Extraction pipeline endpoint; `None` disables the worker
    /// (intake-only deployments).
    pub pipeline_url: Option<String>,
    /// Base URL used when rendering status/result links.
    pub public_base_url: String,
}

impl AppConfig {
    /// Load configuration from the environment (reads `.env` first).
    pub fn from_env() -> Result<Self> {
        // Missing .env is fine; real environments set variables directly.
        let _ = dotenvy::dotenv();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| Error::Config("DATABASE_URL is not set".to_string()))?;

        let bind_addr = std::env::var("MDEX_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("invalid MDEX_BIND_ADDR: {e}")))?;

        let pipeline_url = std::env::var("MDEX_PIPELINE_URL").ok().filter(|s| !s.is_empty());

        let public_base_url = std::env::var("MDEX_PUBLIC_BASE_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("http://{bind_addr}"));

        Ok(Self {
            database_url,
            bind_addr,
            pipeline_url,
            public_base_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_addr_parse() {
        let addr: SocketAddr = "0.0.0.0:9090".parse().unwrap();
        let config = AppConfig {
            database_url: "postgres://localhost/mdex".to_string(),
            bind_addr: addr,
            pipeline_url: None,
            public_base_url: format!("http://{addr}"),
        };
        assert_eq!(config.bind_addr.port(), 9090);
        assert_eq!(config.public_base_url, "http://0.0.0.0:9090");
    }
}
