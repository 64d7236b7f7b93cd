//! Permanent launch decision.
//!
//! The record moves out of `Undecided` at most once and never back. There is
//! deliberately no reset operation.

use std::sync::Arc;

use serde_json::Value;
use url::Url;

use crate::error::{GateFailure, StoreError};
use crate::prefs::Preferences;

/// Key holding `"main"` or `"web"`.
pub const LAUNCH_MODE_KEY: &str = "launch_mode";
/// Key holding the absolute target URL while the mode is `"web"`.
pub const LAUNCH_WEB_URL_KEY: &str = "launch_web_url";

const MODE_MAIN: &str = "main";
const MODE_WEB: &str = "web";

/// Persisted outcome of the launch gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchDecision {
    Undecided,
    LockedToApp,
    LockedToWeb(Url),
}

impl LaunchDecision {
    pub fn is_committed(&self) -> bool {
        !matches!(self, Self::Undecided)
    }
}

/// Reads and commits the single launch decision record.
#[derive(Clone)]
pub struct DecisionStore {
    prefs: Arc<dyn Preferences>,
}

impl DecisionStore {
    pub fn new(prefs: Arc<dyn Preferences>) -> Self {
        Self { prefs }
    }

    /// Read the persisted decision.
    ///
    /// A web mode whose URL is missing or unparsable degrades to
    /// `LockedToApp`, never to `Undecided` and never to an unverified target.
    pub fn load(&self) -> LaunchDecision {
        let mode = self.prefs.get_string(LAUNCH_MODE_KEY);
        let url = self.prefs.get_string(LAUNCH_WEB_URL_KEY);
        match decode(mode.as_deref(), url.as_deref()) {
            Ok(decision) => decision,
            Err(failure) => {
                tracing::warn!(
                    failure = failure.as_str(),
                    "Saved web decision has no usable URL, treating as main"
                );
                LaunchDecision::LockedToApp
            }
        }
    }

    pub fn commit_locked_to_app(&self) -> Result<(), StoreError> {
        self.prefs.apply(vec![
            (
                LAUNCH_MODE_KEY.to_string(),
                Some(Value::String(MODE_MAIN.to_string())),
            ),
            (LAUNCH_WEB_URL_KEY.to_string(), None),
        ])?;
        tracing::info!("Launch decision committed: main application");
        Ok(())
    }

    pub fn commit_locked_to_web(&self, url: &Url) -> Result<(), StoreError> {
        self.prefs.apply(vec![
            (
                LAUNCH_MODE_KEY.to_string(),
                Some(Value::String(MODE_WEB.to_string())),
            ),
            (
                LAUNCH_WEB_URL_KEY.to_string(),
                Some(Value::String(url.as_str().to_string())),
            ),
        ])?;
        tracing::info!(host = url.host_str().unwrap_or(""), "Launch decision committed: web");
        Ok(())
    }
}

/// Interpret the raw record. A web mode without a usable URL is store
/// corruption.
fn decode(mode: Option<&str>, url: Option<&str>) -> Result<LaunchDecision, GateFailure> {
    match mode {
        None => Ok(LaunchDecision::Undecided),
        Some(MODE_MAIN) => Ok(LaunchDecision::LockedToApp),
        Some(MODE_WEB) => url
            .and_then(|raw| Url::parse(raw).ok())
            .map(LaunchDecision::LockedToWeb)
            .ok_or(GateFailure::StoreCorruption),
        Some(other) => {
            tracing::debug!("Unknown launch mode '{}', treating as undecided", other);
            Ok(LaunchDecision::Undecided)
        }
    }
}
