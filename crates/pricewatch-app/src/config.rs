//! Application configuration.

use crate::error::{AppError, AppResult};
use pricewatch_broker::ServerConfig;
use pricewatch_client::BackoffConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upstream feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Upstream API base URL.
    #[serde(default = "default_feed_base_url")]
    pub base_url: String,
    /// Background poll interval in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_feed_base_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_poll_interval_secs() -> u64 {
    60
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_feed_base_url(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

/// Threshold store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON snapshot file for stored configurations.
    /// Empty string = in-memory only.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
}

fn default_snapshot_path() -> String {
    "config/thresholds.json".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
        }
    }
}

/// Client reconnect configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base delay for reconnection backoff (ms).
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    /// Maximum reconnection backoff delay (ms).
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    /// Maximum reconnection attempts (0 = infinite).
    #[serde(default)]
    pub max_reconnect_attempts: u32,
}

fn default_reconnect_base_delay_ms() -> u64 {
    1000
}

fn default_reconnect_max_delay_ms() -> u64 {
    60000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            max_reconnect_attempts: 0,
        }
    }
}

impl From<ClientConfig> for BackoffConfig {
    fn from(cfg: ClientConfig) -> Self {
        Self {
            base_delay_ms: cfg.reconnect_base_delay_ms,
            max_delay_ms: cfg.reconnect_max_delay_ms,
            max_attempts: cfg.max_reconnect_attempts,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Symbol the poller always watches, even with no stored
    /// configuration or open sessions.
    #[serde(default = "default_symbol")]
    pub default_symbol: String,
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Upstream feed configuration.
    #[serde(default)]
    pub feed: FeedConfig,
    /// Threshold store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Client reconnect configuration.
    #[serde(default)]
    pub client: ClientConfig,
}

fn default_symbol() -> String {
    "cardano".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_symbol: default_symbol(),
            server: ServerConfig::default(),
            feed: FeedConfig::default(),
            store: StoreConfig::default(),
            client: ClientConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration: `PRICEWATCH_CONFIG` env var or the default
    /// path, falling back to defaults when no file exists.
    pub fn load() -> AppResult<Self> {
        let config_path = std::env::var("PRICEWATCH_CONFIG")
            .unwrap_or_else(|_| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }
}
