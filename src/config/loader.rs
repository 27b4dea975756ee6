use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::types::Config;

/// Appliance address override.
pub const ENV_ENDPOINT: &str = "NS_IP";
/// Appliance username override.
pub const ENV_USERNAME: &str = "NS_USERNAME";
/// Appliance password override.
pub const ENV_PASSWORD: &str = "NS_PASSWORD";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl Config {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.config/nsroute/config.toml` on Unix,
    /// or equivalent on other platforms via `dirs::config_dir()`.
    /// Falls back to current directory if config_dir is unavailable.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("nsroute").join("config.toml")
    }

    /// Loads configuration from the default config file plus environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Loads configuration from `path`, then applies environment overrides.
    ///
    /// - If the file doesn't exist, starts from `Config::default()`.
    /// - Returns an error if reading, parsing, or validation fails.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Apply `NS_IP` / `NS_USERNAME` / `NS_PASSWORD` from `lookup`.
    ///
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            self.appliance.endpoint = endpoint;
        }
        if let Some(username) = lookup(ENV_USERNAME) {
            self.appliance.username = username;
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.appliance.password = Some(password);
        }
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - An appliance endpoint is set
    /// - A username is set
    /// - Timeouts are non-zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.appliance.endpoint.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Appliance endpoint is not set (config [appliance].endpoint or {})",
                    ENV_ENDPOINT
                ),
            });
        }

        if self.appliance.username.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "Appliance username must not be empty".to_string(),
            });
        }

        if self.appliance.timeout_seconds == 0 || self.appliance.connect_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "Timeouts must be greater than zero".to_string(),
            });
        }

        if self.defaults.namespace.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "Default namespace must not be empty".to_string(),
            });
        }

        Ok(())
    }
}
