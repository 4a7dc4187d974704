//! Configuration
//!
//! JSON settings file with every field optional. The path comes from
//! `SNAPPY_CONFIG`; a missing file means defaults.

use crate::capture::MediaConstraints;
use crate::recorder::RecorderConfig;
use crate::utils::AppResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "SNAPPY_CONFIG";

/// Default log filter
pub const DEFAULT_LOG_FILTER: &str = "snappy=debug";

/// Toolbar badge appearance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BadgeConfig {
    /// Text while recording
    pub recording_text: String,

    /// RGBA colour while recording
    pub recording_color: [u8; 4],

    /// Text when idle
    pub idle_text: String,

    /// RGBA colour when idle
    pub idle_color: [u8; 4],
}

impl Default for BadgeConfig {
    fn default() -> Self {
        Self {
            recording_text: "Rec".to_string(),
            recording_color: [252, 16, 16, 255],
            idle_text: String::new(),
            idle_color: [0, 0, 0, 0],
        }
    }
}

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub recorder: RecorderConfig,

    /// Constraints for the local camera/microphone stream
    pub constraints: MediaConstraints,

    pub badge: BadgeConfig,

    /// `tracing` env-filter directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recorder: RecorderConfig::default(),
            constraints: MediaConstraints::default(),
            badge: BadgeConfig::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Load settings from `path`, falling back to defaults if it does not exist
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Load from the file named by `SNAPPY_CONFIG`, or defaults
    pub fn from_env() -> AppResult<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    /// Write settings as pretty JSON
    pub fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
