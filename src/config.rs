//! Configuration handling for the provisioning client

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const LOCAL_CONFIG: &str = "vpn-provision.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub tunnel: TunnelConfig,
}

/// Labels sent to the provisioning server and network limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub os_version: String,
    pub app_version: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelConfig {
    /// Container key that holds the templated tunnel config
    pub protocol: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        // The server keys its behavior off these exact labels
        Self {
            os_version: "macOS".to_string(),
            app_version: "4.8.2.3".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            protocol: crate::assemble::DEFAULT_PROTOCOL.to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from `./vpn-provision.toml`, then `~/.vpn-provision/config.toml`,
    /// falling back to defaults
    pub fn discover() -> Result<Self, ConfigError> {
        for path in Self::search_paths() {
            if path.exists() {
                debug!("Loading config from {}", path.display());
                return Self::load(&path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Config::default())
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".vpn-provision").join("config.toml"));
        }
        paths
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.client.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "client.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.tunnel.protocol.trim().is_empty() {
            return Err(ConfigError::Invalid("tunnel.protocol cannot be empty".to_string()));
        }
        Ok(())
    }
}
