//! Engine configuration loaded from JSON.
//!
//! The file path comes from `ORRERY_CONFIG`, falling back to `orrery.json` in the
//! working directory. A missing file means defaults. A malformed file is logged
//! and also means defaults; configuration problems never stop the application.
//!
//! Out-of-range values are clamped on load rather than rejected.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::scheduler::{MAX_RATE, MIN_RATE};
use crate::topic::{Level, SceneKey};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "ORRERY_CONFIG";
/// Config file used when the environment variable is unset.
pub const DEFAULT_CONFIG_FILE: &str = "orrery.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Startup settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub window_width: u32,
    pub window_height: u32,
    pub start_scene: SceneKey,
    pub level: Level,
    /// Initial simulation rate multiplier.
    pub rate: f32,
    /// Fixed RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Cap on in-flight signal pulses.
    pub pulse_cap: usize,
    /// JSON content library; built-in placeholders are used when absent.
    pub content_library: Option<PathBuf>,
    /// Write a profiling report on exit.
    pub profile_report: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_width: 1360,
            window_height: 768,
            start_scene: SceneKey::default(),
            level: Level::default(),
            rate: 1.0,
            seed: None,
            pulse_cap: 1500,
            content_library: None,
            profile_report: false,
        }
    }
}

impl EngineConfig {
    /// Parses and clamps a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        Ok(config.clamped())
    }

    /// Reads a config file. A missing file yields defaults.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_json_str(&text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Path from the environment, or the default file name.
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Loads from [`EngineConfig::default_path`], logging and falling back to
    /// defaults on any error.
    pub fn load() -> Self {
        let path = Self::default_path();
        match Self::from_path(&path) {
            Ok(config) => {
                log::info!("configuration loaded ({})", path.display());
                config
            }
            Err(err) => {
                log::error!("{err}; using default configuration");
                Self::default()
            }
        }
    }

    /// Forces every field into its valid range.
    pub fn clamped(mut self) -> Self {
        self.window_width = self.window_width.max(1);
        self.window_height = self.window_height.max(1);
        self.rate = if self.rate.is_finite() {
            self.rate.clamp(MIN_RATE, MAX_RATE)
        } else {
            1.0
        };
        self.pulse_cap = self.pulse_cap.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topic::Topic;

    #[test]
    fn test_empty_object_is_default() {
        let config = EngineConfig::from_json_str("{}").expect("parses");
        assert_eq!(config, EngineConfig::default());
    }

    /// Out-of-range numbers are clamped, not rejected.
    #[test]
    fn test_values_clamped() {
        let config = EngineConfig::from_json_str(
            r#"{"rate": 40.0, "window_width": 0, "pulse_cap": 0, "start_scene": {"Topic": "Cosmology"}}"#,
        )
        .expect("parses");
        assert_eq!(config.rate, MAX_RATE);
        assert_eq!(config.window_width, 1);
        assert_eq!(config.pulse_cap, 1);
        assert_eq!(config.start_scene, SceneKey::Topic(Topic::Cosmology));
    }

    #[test]
    fn test_malformed_is_error() {
        assert!(matches!(
            EngineConfig::from_json_str("{ rate: "),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_default() {
        let path = std::env::temp_dir().join("orrery-config-does-not-exist.json");
        let config = EngineConfig::from_path(&path).expect("defaults");
        assert_eq!(config, EngineConfig::default());
    }
}
