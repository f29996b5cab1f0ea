//! Configuration structures for the application.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_REQUEST_TIMEOUT_SECS, LIVE_BACKUP_INTERVAL_SECS, QUEUE_DRAIN_INTERVAL_SECS,
    TOKEN_SWEEP_INTERVAL_SECS,
};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub sync: SyncConfig,
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            sync: SyncConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

/// Remote backend endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL including the `/api` prefix, e.g.
    /// `https://clockwork.example.com/api`.
    pub base_url: String,
    pub request_timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Background sync cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    pub enabled: bool,
    pub token_sweep_interval_seconds: u64,
    pub queue_drain_interval_seconds: u64,
    pub backup_interval_seconds: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            token_sweep_interval_seconds: TOKEN_SWEEP_INTERVAL_SECS,
            queue_drain_interval_seconds: QUEUE_DRAIN_INTERVAL_SECS,
            backup_interval_seconds: LIVE_BACKUP_INTERVAL_SECS,
        }
    }
}

/// Local storage location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the SQLite key-value store.
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { path: "clockwork.db".to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert!(config.api.base_url.ends_with("/api"));
        assert_eq!(config.sync.token_sweep_interval_seconds, 25 * 60);
        assert_eq!(config.sync.queue_drain_interval_seconds, 5 * 60);
        assert!(config.sync.enabled);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config =
            toml::from_str("[api]\nbase_url = \"https://example.test/api\"\n").unwrap();
        assert_eq!(config.api.base_url, "https://example.test/api");
        assert_eq!(config.sync.backup_interval_seconds, 3 * 60);
    }
}
