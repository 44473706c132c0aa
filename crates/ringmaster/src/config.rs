//! Tournament configuration loaded from TOML.
//!
//! Every section is optional; whatever is missing falls back to defaults so
//! an empty file (or no file at all) is a valid configuration.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TournamentConfig {
    pub logging: LoggingSettings,
    pub storage: StorageSettings,
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive (trace, debug, info, warn, error, or a full
    /// `EnvFilter` string). `RUST_LOG` wins when set.
    pub level: String,
    /// Emit one JSON object per event instead of human-readable lines.
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Where persistent state lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Lobby region, spawns, and the admin-exclusion flag.
    pub lobby_file: PathBuf,
    /// The score ledger.
    pub scores_file: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            lobby_file: PathBuf::from("lobby.toml"),
            scores_file: PathBuf::from("scores.json"),
        }
    }
}

impl TournamentConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads the configuration file at `path`.
    ///
    /// # Errors
    /// [`ConfigError::Io`] if the file can't be read, [`ConfigError::Parse`]
    /// if it isn't valid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_toml(path.as_ref())
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Ok(load_toml_or_default(path.as_ref())?.unwrap_or_default())
    }
}

/// Reads and parses a TOML file.
pub(crate) fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&text)?)
}

/// Reads and parses a TOML file; `None` if it doesn't exist yet.
pub(crate) fn load_toml_or_default<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ConfigError> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "config file not found, using defaults");
        return Ok(None);
    }
    load_toml(path).map(Some)
}

/// Serializes `value` to TOML and writes it to `path`, creating parent
/// directories as needed.
pub(crate) fn save_toml<T: Serialize>(path: &Path, value: &T) -> Result<(), ConfigError> {
    let text = toml::to_string_pretty(value)?;
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    std::fs::write(path, text).map_err(io_err)
}
