//! Configuration module for the drug catalog backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Store URL that selects the in-process document store.
pub const MEMORY_STORE_URL: &str = "memory://";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for admin API authentication (required in production)
    pub api_psk: Option<String>,
    /// Base URL of the remote JSON document store
    pub store_url: String,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Abort timeout for the public catalog read
    pub catalog_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_psk = env::var("DRUGCAT_API_PSK")
            .ok()
            .filter(|psk| !psk.trim().is_empty());

        let store_url = env::var("DRUGCAT_STORE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| MEMORY_STORE_URL.to_string());

        let bind_addr = env::var("DRUGCAT_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid DRUGCAT_BIND_ADDR format");

        let log_level = env::var("DRUGCAT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let catalog_timeout = env::var("DRUGCAT_CATALOG_TIMEOUT_SECS")
            .ok()
            .and_then(|secs| secs.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(15));

        Self {
            api_psk,
            store_url,
            bind_addr,
            log_level,
            catalog_timeout,
        }
    }

    /// Whether the in-process store was selected instead of a remote one.
    pub fn uses_memory_store(&self) -> bool {
        self.store_url == MEMORY_STORE_URL || self.store_url == "memory:"
    }
}
