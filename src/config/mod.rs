//! Configuration for Brainstorm Dice.
//!
//! Settings are loaded with priority: config.toml > default. Resolution turns
//! the raw strings into validated types once, at startup, so the boot flow
//! never has to handle a bad endpoint or header name.

mod gate;

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::settings::{DeviceSettings, LoggingSettings, Settings};

pub use self::gate::GateConfig;

/// Main configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub gate: GateConfig,
    pub device: DeviceSettings,
    pub logging: LoggingSettings,
    pub preferences_path: PathBuf,
}

impl Config {
    /// Load configuration from the default config file, falling back to
    /// defaults when it is missing or unreadable.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_settings(&Settings::load())
    }

    /// Load from an explicit TOML file. A missing or broken file is fatal.
    pub fn from_toml(path: &Path) -> Result<Self, ConfigError> {
        match Settings::load_toml(path) {
            Ok(Some(settings)) => {
                tracing::debug!("Loaded TOML config from {}", path.display());
                Self::from_settings(&settings)
            }
            Ok(None) => Err(ConfigError::ParseError(format!(
                "Config file not found: {}",
                path.display()
            ))),
            Err(e) => Err(ConfigError::ParseError(format!(
                "Failed to load config file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Build config from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self {
            gate: GateConfig::resolve(settings)?,
            device: settings.device.clone(),
            logging: settings.logging.clone(),
            preferences_path: settings.preferences_path(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn explicit_missing_file_is_fatal() {
        let dir = tempdir().unwrap();
        let err = Config::from_toml(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn explicit_file_is_applied() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let prefs = dir.path().join("prefs.json");
        std::fs::write(
            &path,
            format!(
                "preferences_path = {:?}\n[gate]\nendpoint = \"https://gate.example.com/api\"\n",
                prefs.display().to_string()
            ),
        )
        .unwrap();

        let config = Config::from_toml(&path).unwrap();
        assert_eq!(config.gate.endpoint.as_str(), "https://gate.example.com/api");
        assert_eq!(config.preferences_path, prefs);
    }
}
