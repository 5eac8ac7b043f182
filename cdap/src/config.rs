//! Configuration for cdap
//!
//! Bootstrap-only TOML configuration: the audio device binding and logging.
//! These settings cannot change during runtime; restart to pick up changes.
//! The sector geometry and buffer sizing are fixed constants and deliberately
//! not configurable.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{Error, Result};

/// Bootstrap configuration loaded from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Audio output device name (None = default device)
    #[serde(default)]
    pub audio_device: Option<String>,

    /// Audio device buffer size in frames (None = device default)
    #[serde(default)]
    pub output_buffer_size: Option<u32>,

    /// Engine poll interval in milliseconds while idle
    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
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

fn default_idle_poll_ms() -> u64 {
    50
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio_device: None,
            output_buffer_size: None,
            idle_poll_ms: default_idle_poll_ms(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Cannot parse {}: {}", path.display(), e)))
    }

    /// Load from `path` if given, otherwise use built-in defaults.
    ///
    /// A missing file also falls back to defaults; only an unreadable or
    /// malformed file is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                warn!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }
}
