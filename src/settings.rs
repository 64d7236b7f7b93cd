//! User settings persistence.
//!
//! Stores host overrides in ~/.brainstorm-dice/config.toml.
//! Settings are loaded with config.toml > default priority.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Directory holding every file the crate persists (~/.brainstorm-dice).
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".brainstorm-dice")
}

/// Settings loaded from disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Launch gate configuration.
    #[serde(default)]
    pub gate: GateSettings,

    /// Device metadata overrides for hosts that know better than the
    /// process environment.
    #[serde(default)]
    pub device: DeviceSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Path to the preferences file. Defaults to
    /// ~/.brainstorm-dice/preferences.json.
    #[serde(default)]
    pub preferences_path: Option<PathBuf>,
}

/// Launch gate settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GateSettings {
    /// Negotiation endpoint without query.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Response header carrying the redirect target.
    #[serde(default = "default_header_name")]
    pub header_name: String,

    /// How long a reachability probe waits for the first path status.
    #[serde(default = "default_reachability_timeout_ms")]
    pub reachability_timeout_ms: u64,

    /// Address the connect-based path monitor dials.
    #[serde(default = "default_probe_addr")]
    pub probe_addr: String,
}

fn default_endpoint() -> String {
    "http://brainstormdice.online/".to_string()
}

fn default_header_name() -> String {
    "com.dolina.brainstorm".to_string()
}

fn default_reachability_timeout_ms() -> u64 {
    3000
}

fn default_probe_addr() -> String {
    "1.1.1.1:443".to_string()
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            header_name: default_header_name(),
            reachability_timeout_ms: default_reachability_timeout_ms(),
            probe_addr: default_probe_addr(),
        }
    }
}

/// Device metadata overrides. Unset fields are read from the host.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DeviceSettings {
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub build: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// Default filter directive when RUST_LOG is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "brainstorm_dice=info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl Settings {
    /// Default TOML config file path (~/.brainstorm-dice/config.toml).
    pub fn default_toml_path() -> PathBuf {
        data_dir().join("config.toml")
    }

    /// Default preferences file path (~/.brainstorm-dice/preferences.json).
    pub fn default_preferences_path() -> PathBuf {
        data_dir().join("preferences.json")
    }

    /// Resolved preferences path.
    pub fn preferences_path(&self) -> PathBuf {
        self.preferences_path
            .clone()
            .unwrap_or_else(Self::default_preferences_path)
    }

    /// Load settings from a TOML file.
    ///
    /// Returns `None` if the file doesn't exist. Returns an error only
    /// if the file exists but can't be parsed.
    pub fn load_toml(path: &Path) -> Result<Option<Self>, String> {
        let data = match std::fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(format!("failed to read {}: {}", path.display(), e)),
        };

        let settings: Self = toml::from_str(&data)
            .map_err(|e| format!("invalid TOML in {}: {}", path.display(), e))?;
        Ok(Some(settings))
    }

    /// Load from the default path. A missing or broken file yields defaults.
    pub fn load() -> Self {
        let path = Self::default_toml_path();
        match Self::load_toml(&path) {
            Ok(Some(settings)) => {
                tracing::debug!("Loaded TOML config from {}", path.display());
                settings
            }
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!("Failed to load default config file: {}", e);
                Self::default()
            }
        }
    }

    /// Write the settings as a commented TOML file.
    pub fn save_toml(&self, path: &Path) -> Result<(), String> {
        let raw = toml::to_string_pretty(self)
            .map_err(|e| format!("failed to serialize settings: {}", e))?;

        let content = format!(
            "# Brainstorm Dice configuration file.\n\
             #\n\
             # Priority: this file > defaults.\n\
             \n\
             {raw}"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("failed to create {}: {}", parent.display(), e))?;
        }

        std::fs::write(path, content)
            .map_err(|e| format!("failed to write {}: {}", path.display(), e))
    }
}
