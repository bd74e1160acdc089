//! Configuration loading
//!
//! Bootstrap configuration is resolved in this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Command-line arguments and environment variables are both collected by the
//! binary's argument parser into a `ConfigOverrides`; this module merges them
//! with the TOML file and the compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default database file
pub const DEFAULT_DATABASE_PATH: &str = "emogo.db";

/// Default media directory (served at /videos)
pub const DEFAULT_MEDIA_DIR: &str = "videos";

/// Default bind host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8000;

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration file contents
///
/// Every field is optional; absent fields fall through to compiled defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Path to the SQLite sample database
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Directory holding the recorded video clips
    #[serde(default)]
    pub media_dir: Option<PathBuf>,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    /// Base address used for absolute video URLs in the JSON export
    #[serde(default)]
    pub public_base_url: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database_path: Option<PathBuf>,
    pub media_dir: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_base_url: Option<String>,
    pub log_level: Option<String>,
}

/// Fully resolved export service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    pub database_path: PathBuf,
    pub media_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub public_base_url: Option<String>,
    pub log_level: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self::resolve(&ConfigOverrides::default(), &TomlConfig::default())
    }
}

impl ExportConfig {
    /// Merge overrides, file values and compiled defaults
    pub fn resolve(overrides: &ConfigOverrides, file: &TomlConfig) -> Self {
        let public_base_url = overrides
            .public_base_url
            .clone()
            .or_else(|| file.public_base_url.clone())
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        Self {
            database_path: overrides
                .database_path
                .clone()
                .or_else(|| file.database_path.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            media_dir: overrides
                .media_dir
                .clone()
                .or_else(|| file.media_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MEDIA_DIR)),
            host: overrides
                .host
                .clone()
                .or_else(|| file.host.clone())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: overrides.port.or(file.port).unwrap_or(DEFAULT_PORT),
            public_base_url,
            log_level: overrides
                .log_level
                .clone()
                .unwrap_or_else(|| file.logging.level.clone()),
        }
    }

    /// `host:port` string for binding the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Default config file location (`~/.config/emogo/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("emogo").join("config.toml"))
}

/// Load a TOML config file
///
/// A missing file is not an error: `Ok(None)` lets the caller log and carry
/// on with defaults. A file that exists but cannot be read or parsed is a
/// `Config` error.
pub fn load_toml_config(path: &Path) -> Result<Option<TomlConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;

    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    Ok(Some(config))
}
