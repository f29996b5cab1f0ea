//! Configuration loader.
//!
//! Loads application configuration from a file with environment-variable
//! overrides.
//!
//! ## Loading Strategy
//! 1. Probes several paths for a config file (TOML or JSON)
//! 2. Falls back to built-in defaults when no file is found
//! 3. Applies `CLOCKWORK_*` environment-variable overrides on top
//!
//! ## Environment Variables
//! - `CLOCKWORK_API_BASE_URL`: Backend base URL (including `/api`)
//! - `CLOCKWORK_DB_PATH`: Key-value store path
//! - `CLOCKWORK_SYNC_ENABLED`: Whether background sync runs (true/false)

use std::path::{Path, PathBuf};

use clockwork_domain::{ClockworkError, Config, Result};
use tracing::{debug, info};

/// Load configuration with the file-then-env strategy.
pub fn load() -> Result<Config> {
    // pick up a .env file when present
    dotenvy::dotenv().ok();

    let mut config = match probe_config_paths() {
        Some(path) => {
            info!(path = %path.display(), "loading configuration file");
            load_from_file(&path)?
        }
        None => {
            debug!("no configuration file found; using defaults");
            Config::default()
        }
    };

    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Load configuration from a specific file. Format is detected by
/// extension; anything but `.json` is parsed as TOML.
pub fn load_from_file(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ClockworkError::Config(format!("failed to read {}: {e}", path.display()))
    })?;

    if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&contents)
            .map_err(|e| ClockworkError::Config(format!("invalid JSON config: {e}")))
    } else {
        toml::from_str(&contents)
            .map_err(|e| ClockworkError::Config(format!("invalid TOML config: {e}")))
    }
}

fn probe_config_paths() -> Option<PathBuf> {
    let candidates = [
        "clockwork.toml",
        "clockwork.json",
        "config.toml",
        "config.json",
        "../clockwork.toml",
        "../config.toml",
    ];
    candidates.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Ok(base_url) = std::env::var("CLOCKWORK_API_BASE_URL") {
        config.api.base_url = base_url;
    }
    if let Ok(path) = std::env::var("CLOCKWORK_DB_PATH") {
        config.storage.path = path;
    }
    if let Ok(enabled) = std::env::var("CLOCKWORK_SYNC_ENABLED") {
        config.sync.enabled = enabled
            .parse()
            .map_err(|_| ClockworkError::Config(format!("invalid CLOCKWORK_SYNC_ENABLED: {enabled}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clockwork.toml");
        std::fs::write(&path, "[api]\nbase_url = \"https://example.test/api\"\n").unwrap();

        let config = load_from_file(&path).unwrap();
        assert_eq!(config.api.base_url, "https://example.test/api");
        // unspecified sections fall back to defaults
        assert!(config.sync.enabled);
    }

    #[test]
    fn loads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clockwork.json");
        std::fs::write(&path, r#"{"storage": {"path": "/tmp/cw.db"}}"#).unwrap();

        let config = load_from_file(&path).unwrap();
        assert_eq!(config.storage.path, "/tmp/cw.db");
    }

    #[test]
    fn invalid_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clockwork.toml");
        std::fs::write(&path, "not = [valid").unwrap();

        assert!(matches!(load_from_file(&path), Err(ClockworkError::Config(_))));
    }
}
