//! Tracing subscriber setup for host shells.

use tracing_subscriber::EnvFilter;

use crate::error::ConfigError;
use crate::settings::LoggingSettings;

/// Install the global subscriber. `RUST_LOG` wins over the configured filter.
///
/// Fails if a global subscriber is already installed.
pub fn init(settings: &LoggingSettings) -> Result<(), ConfigError> {
    let filter = build_filter(settings)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = if settings.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| ConfigError::Logging(e.to_string()))
}

fn build_filter(settings: &LoggingSettings) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&settings.filter).map_err(|e| ConfigError::InvalidValue {
        key: "logging.filter".to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_reports_error() {
        let settings = LoggingSettings::default();
        let _ = init(&settings);
        assert!(matches!(init(&settings), Err(ConfigError::Logging(_))));
    }

    #[test]
    fn default_filter_parses() {
        assert!(build_filter(&LoggingSettings::default()).is_ok());
    }
}
