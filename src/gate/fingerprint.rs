//! Device fingerprint collection.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::prefs::Preferences;
use crate::settings::DeviceSettings;

/// Key holding the stable anonymous identifier. Never cleared.
pub const DEVICE_UUID_KEY: &str = "device_uuid";

/// Placeholder sent when the region cannot be determined.
pub const UNKNOWN_REGION: &str = "??";

/// Device and environment metadata sent with a negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceFingerprint {
    /// Stable identifier, created once per install.
    pub uuid: String,
    /// Hardware model string (e.g. "iPhone13,2").
    pub model_id: String,
    /// OS name and version (e.g. "iOS 17.6.1").
    pub os: String,
    /// Locale identifier (e.g. "en_US").
    pub lang: String,
    /// Region code (e.g. "US").
    pub rg: String,
    /// OS build (e.g. "21G82").
    pub bld: String,
}

/// Live device/OS/locale readings.
pub trait DeviceEnvironment: Send + Sync {
    fn model_id(&self) -> String;
    fn os_version(&self) -> String;
    fn os_build(&self) -> String;
    fn language(&self) -> String;
    fn region(&self) -> Option<String>;
}

/// Reads the current process environment, with per-field overrides.
#[derive(Debug, Clone, Default)]
pub struct HostEnvironment {
    overrides: DeviceSettings,
}

impl HostEnvironment {
    pub fn new(overrides: DeviceSettings) -> Self {
        Self { overrides }
    }

    fn locale(&self) -> (String, Option<String>) {
        let raw = ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .find(|value| !value.trim().is_empty())
            .unwrap_or_default();
        parse_locale(&raw)
    }
}

impl DeviceEnvironment for HostEnvironment {
    fn model_id(&self) -> String {
        self.overrides
            .model_id
            .clone()
            .unwrap_or_else(|| std::env::consts::ARCH.to_string())
    }

    fn os_version(&self) -> String {
        self.overrides
            .os
            .clone()
            .unwrap_or_else(|| std::env::consts::OS.to_string())
    }

    fn os_build(&self) -> String {
        if let Some(build) = &self.overrides.build {
            return build.clone();
        }
        std::fs::read_to_string("/proc/sys/kernel/osrelease")
            .map(|s| s.trim().to_string())
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn language(&self) -> String {
        self.overrides
            .language
            .clone()
            .unwrap_or_else(|| self.locale().0)
    }

    fn region(&self) -> Option<String> {
        self.overrides.region.clone().or_else(|| self.locale().1)
    }
}

/// Split a POSIX locale (`en_US.UTF-8@euro`) into identifier and region.
fn parse_locale(raw: &str) -> (String, Option<String>) {
    let identifier = raw
        .split(['.', '@'])
        .next()
        .unwrap_or_default()
        .trim()
        .replace('-', "_");

    if identifier.is_empty() || identifier == "C" || identifier == "POSIX" {
        return ("en".to_string(), None);
    }

    let region = identifier
        .split('_')
        .nth(1)
        .filter(|r| !r.is_empty())
        .map(str::to_ascii_uppercase);
    (identifier, region)
}

/// Assembles fingerprints and owns the persisted identifier.
#[derive(Clone)]
pub struct FingerprintCollector {
    env: Arc<dyn DeviceEnvironment>,
    prefs: Arc<dyn Preferences>,
}

impl FingerprintCollector {
    pub fn new(env: Arc<dyn DeviceEnvironment>, prefs: Arc<dyn Preferences>) -> Self {
        Self { env, prefs }
    }

    /// Read the current device state. Never fails.
    pub fn get_fingerprint(&self) -> DeviceFingerprint {
        DeviceFingerprint {
            uuid: self.stable_id(),
            model_id: self.env.model_id(),
            os: self.env.os_version(),
            lang: self.env.language(),
            rg: self
                .env
                .region()
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_REGION.to_string()),
            bld: self.env.os_build(),
        }
    }

    fn stable_id(&self) -> String {
        if let Some(existing) = self
            .prefs
            .get_string(DEVICE_UUID_KEY)
            .filter(|id| !id.is_empty())
        {
            return existing;
        }

        let id = Uuid::new_v4().to_string().to_ascii_uppercase();
        if let Err(e) = self.prefs.set(DEVICE_UUID_KEY, Value::String(id.clone())) {
            tracing::warn!("Failed to persist device identifier: {}", e);
        }
        id
    }
}
