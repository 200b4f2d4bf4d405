//! Configuration management module
//!
//! Handles loading, validation, and management of application configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Directory whose listing is requested on every (re)connect
    pub workspace_root: String,

    /// Logging level
    pub log_level: String,

    /// Workspace-server connection configuration
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// WebSocket endpoint URL
    pub ws_url: String,

    /// Fixed delay between reconnect attempts in milliseconds
    ///
    /// There is no backoff and no retry cap; the client retries forever.
    pub reconnect_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_root: ".".to_string(),
            log_level: "info".to_string(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://localhost:8000/ws".to_string(),
            reconnect_interval_ms: 3000,
        }
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        config.apply_env_overrides();

        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        // WORKLINK_WS_URL - workspace server endpoint
        if let Ok(ws_url) = env::var("WORKLINK_WS_URL") {
            if !ws_url.trim().is_empty() {
                self.server.ws_url = ws_url;
            }
        }

        // WORKLINK_RECONNECT_INTERVAL_MS - fixed reconnect delay
        if let Ok(interval) = env::var("WORKLINK_RECONNECT_INTERVAL_MS") {
            if let Ok(value) = interval.parse::<u64>() {
                self.server.reconnect_interval_ms = value;
            }
        }

        // WORKLINK_WORKSPACE_ROOT - initial listing directory
        if let Ok(root) = env::var("WORKLINK_WORKSPACE_ROOT") {
            if !root.trim().is_empty() {
                self.workspace_root = root;
            }
        }

        // WORKLINK_LOG_LEVEL - logging level
        if let Ok(log_level) = env::var("WORKLINK_LOG_LEVEL") {
            self.log_level = log_level;
        }
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load_from_file(path).unwrap_or_else(|err| {
            tracing::warn!("Failed to load config: {}, using defaults", err);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.ws_url.trim().is_empty() {
            anyhow::bail!("Server URL must not be empty");
        }

        if !self.server.ws_url.starts_with("ws://") && !self.server.ws_url.starts_with("wss://") {
            anyhow::bail!("Server URL must use the ws:// or wss:// scheme");
        }

        if self.server.reconnect_interval_ms == 0 {
            anyhow::bail!("Reconnect interval must be greater than 0");
        }

        if self.workspace_root.trim().is_empty() {
            anyhow::bail!("Workspace root must not be empty");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.ws_url, "ws://localhost:8000/ws");
        assert_eq!(config.server.reconnect_interval_ms, 3000);
    }

    #[test]
    fn test_rejects_non_websocket_url() {
        let mut config = Config::default();
        config.server.ws_url = "http://localhost:8000".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_reconnect_interval() {
        let mut config = Config::default();
        config.server.reconnect_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config.server.ws_url, deserialized.server.ws_url);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str("[server]\nws_url = \"wss://example.com/ws\"\n")
            .unwrap();
        assert_eq!(config.server.ws_url, "wss://example.com/ws");
        assert_eq!(config.server.reconnect_interval_ms, 3000);
        assert_eq!(config.workspace_root, ".");
    }

    #[test]
    fn test_config_file_operations() {
        let config = Config::default();
        let temp_file = NamedTempFile::new().unwrap();

        // Test save
        config.save_to_file(temp_file.path()).unwrap();

        // Test load
        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(config.server.ws_url, loaded_config.server.ws_url);
    }
}
