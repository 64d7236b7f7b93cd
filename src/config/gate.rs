use std::time::Duration;

use reqwest::header::HeaderName;
use url::Url;

use crate::error::ConfigError;
use crate::settings::Settings;

/// Validated launch gate configuration.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Negotiation endpoint. Guaranteed to accept a query string.
    pub endpoint: Url,
    /// Response header carrying the redirect target (lowercased).
    pub header_name: HeaderName,
    /// Bound on each reachability probe.
    pub reachability_timeout: Duration,
    /// Address dialled by the connect-based path monitor.
    pub probe_addr: String,
}

impl GateConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let gate = &settings.gate;

        let endpoint = Url::parse(gate.endpoint.trim()).map_err(|e| ConfigError::InvalidValue {
            key: "gate.endpoint".to_string(),
            message: format!("must be an absolute URL: {e}"),
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(ConfigError::InvalidValue {
                key: "gate.endpoint".to_string(),
                message: format!("'{endpoint}' cannot carry query parameters"),
            });
        }

        let header_name =
            HeaderName::from_bytes(gate.header_name.trim().to_ascii_lowercase().as_bytes())
                .map_err(|e| ConfigError::InvalidValue {
                    key: "gate.header_name".to_string(),
                    message: format!("not a valid HTTP header name: {e}"),
                })?;

        if gate.reachability_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "gate.reachability_timeout_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        let probe_addr = gate.probe_addr.trim().to_string();
        if probe_addr.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "gate.probe_addr".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        Ok(Self {
            endpoint,
            header_name,
            reachability_timeout: Duration::from_millis(gate.reachability_timeout_ms),
            probe_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve() {
        let config = GateConfig::resolve(&Settings::default()).unwrap();
        assert_eq!(config.endpoint.as_str(), "http://brainstormdice.online/");
        assert_eq!(config.header_name.as_str(), "com.dolina.brainstorm");
        assert_eq!(config.reachability_timeout, Duration::from_secs(3));
    }

    #[test]
    fn header_name_is_lowercased() {
        let mut settings = Settings::default();
        settings.gate.header_name = "X-Link".to_string();
        let config = GateConfig::resolve(&settings).unwrap();
        assert_eq!(config.header_name.as_str(), "x-link");
    }

    #[test]
    fn rejects_non_base_endpoint() {
        let mut settings = Settings::default();
        settings.gate.endpoint = "mailto:someone@example.com".to_string();
        let err = GateConfig::resolve(&settings).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "gate.endpoint"));
    }

    #[test]
    fn rejects_bad_header_and_timeout() {
        let mut settings = Settings::default();
        settings.gate.header_name = "bad header".to_string();
        assert!(GateConfig::resolve(&settings).is_err());

        let mut settings = Settings::default();
        settings.gate.reachability_timeout_ms = 0;
        assert!(GateConfig::resolve(&settings).is_err());
    }
}
