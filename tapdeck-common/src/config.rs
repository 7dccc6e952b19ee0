//! Bootstrap configuration file resolution
//!
//! Configuration file lookup follows this priority order:
//! 1. `TAPDECK_CONFIG` environment variable
//! 2. User config file (`~/.config/tapdeck/config.toml`)
//! 3. System config file (`/etc/tapdeck/config.toml`, Linux only)
//! 4. Compiled defaults (no file)
//!
//! A missing file is not an error: the caller logs a warning and starts on
//! defaults. A file that exists but cannot be parsed is.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "TAPDECK_CONFIG";

/// Application directory name used under the platform config/data dirs
pub const APP_DIR: &str = "tapdeck";

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Locate the configuration file, if any
///
/// Returns `None` when no candidate exists; the caller then uses compiled
/// defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        warn!(
            "{} points to {:?} which does not exist, ignoring",
            CONFIG_ENV_VAR, path
        );
    }

    if let Some(user_config) = dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml")) {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(APP_DIR).join("config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Parse a TOML file into `T`
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;

    let parsed = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {:?}: {}", path, e)))?;

    info!("Loaded TOML configuration from {:?}", path);
    Ok(parsed)
}

/// Resolve and parse the configuration, falling back to `T::default()`
pub fn load_or_default<T: DeserializeOwned + Default>() -> Result<T> {
    match resolve_config_path() {
        Some(path) => load_toml(&path),
        None => {
            warn!("No config file found, using compiled defaults");
            Ok(T::default())
        }
    }
}

/// OS-dependent default data directory for the application
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("./tapdeck_data"))
}
