//! fmctl configuration.
//!
//! Supports YAML files and environment variable overrides. Command-line
//! flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::{ConnectParams, DEFAULT_ADDRESS, DEFAULT_TIMEOUT_MS};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "fmctl.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "FMCTL_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "FMCTL";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "FMCTL_LOG";

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub library: LibraryConfig,
}

/// Where and how to reach the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Socket path or `host:port`.
    pub address: String,
    /// Connect timeout in milliseconds.
    pub timeout_ms: u32,
    /// Force socket or network addressing. Detected from the address if unset.
    pub unix_socket: Option<bool>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            unix_socket: None,
        }
    }
}

/// Location of the native SDK.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Explicit path to `libnvfm`; the default sonames are searched if unset.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `fmctl.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix, e.g.
    ///    `FMCTL__CONNECTION__TIMEOUT_MS`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::from(config_path).format(FileFormat::Yaml));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config: Config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a single YAML file, without other sources.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.display().to_string(), e.to_string()))?;

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.connection.address.is_empty() {
            return Err(ConfigError::Invalid(
                "connection.address must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Connect parameters described by this configuration.
    pub fn connect_params(&self) -> ConnectParams {
        let params = ConnectParams::new(self.connection.address.clone())
            .with_timeout_ms(self.connection.timeout_ms);
        match self.connection.unix_socket {
            Some(unix_socket) => params.with_unix_socket(unix_socket),
            None => params,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}': {1}")]
    FileRead(String, String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Failed to load config: {0}")]
    Load(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
