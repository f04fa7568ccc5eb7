//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Manifold Credentials ===
    /// API key used in the `Authorization: Key ...` header.
    #[serde(default)]
    pub manifold_api_key: Option<String>,

    /// Id of the betting user (for bet/position lookups).
    #[serde(default)]
    pub manifold_user_id: Option<String>,

    /// Username of the betting user (for balance lookups).
    #[serde(default)]
    pub manifold_username: Option<String>,

    /// API base URL.
    #[serde(default = "default_api_url")]
    pub manifold_api_url: String,

    // === Local Files ===
    /// JSON registry of tracked markets.
    #[serde(default = "default_registry_path")]
    pub registry_path: PathBuf,

    /// Newline-delimited list of resolved market ids.
    #[serde(default = "default_resolved_markets_path")]
    pub resolved_markets_path: PathBuf,

    /// Directory holding dated market snapshots.
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,

    // === HTTP / Caching ===
    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    /// Lifetime of cached market and bet lookups.
    #[serde(default = "default_market_cache_seconds")]
    pub market_cache_seconds: u64,

    /// Lifetime of cached forecast pages and tables.
    #[serde(default = "default_scrape_cache_seconds")]
    pub scrape_cache_seconds: u64,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

fn default_api_url() -> String {
    "https://api.manifold.markets/v0".to_string()
}

fn default_registry_path() -> PathBuf {
    PathBuf::from("data/registry.json")
}

fn default_resolved_markets_path() -> PathBuf {
    PathBuf::from("data/resolved_markets.txt")
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("data/markets")
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

fn default_market_cache_seconds() -> u64 {
    60
}

fn default_scrape_cache_seconds() -> u64 {
    240
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifold_api_key: None,
            manifold_user_id: None,
            manifold_username: None,
            manifold_api_url: default_api_url(),
            registry_path: default_registry_path(),
            resolved_markets_path: default_resolved_markets_path(),
            snapshot_dir: default_snapshot_dir(),
            http_timeout_ms: default_http_timeout_ms(),
            market_cache_seconds: default_market_cache_seconds(),
            scrape_cache_seconds: default_scrape_cache_seconds(),
            rust_log: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check that everything needed to place bets is present.
    pub fn validate(&self) -> Result<(), String> {
        match self.manifold_api_key.as_deref() {
            None | Some("") => return Err("MANIFOLD_API_KEY is required".to_string()),
            Some(_) => {}
        }

        if self.manifold_user_id.as_deref().map_or(true, str::is_empty) {
            return Err("MANIFOLD_USER_ID is required".to_string());
        }

        if self.manifold_username.as_deref().map_or(true, str::is_empty) {
            return Err("MANIFOLD_USERNAME is required".to_string());
        }

        if !self.manifold_api_url.starts_with("http") {
            return Err("MANIFOLD_API_URL must be an http(s) URL".to_string());
        }

        if self.http_timeout_ms == 0 {
            return Err("HTTP_TIMEOUT_MS must be positive".to_string());
        }

        Ok(())
    }

    /// HTTP request timeout.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Lifetime of cached market lookups.
    pub fn market_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.market_cache_seconds)
    }

    /// Lifetime of cached forecast downloads.
    pub fn scrape_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.scrape_cache_seconds)
    }
}
