//! # Observability Infrastructure
//!
//! Structured logging for the issuer: subscriber setup plus the span
//! helpers in [`logging`].

pub mod logging;

pub use logging::log_settings_info;

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins over the configured level when set. Returns `Ok(false)`
/// when a subscriber was already installed (integration tests, embedding
/// callers); that is not an error.
pub fn init_logging(config: &ObservabilityConfig) -> Result<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| {
            let message = format!("Invalid log level '{}'", config.log_level);
            Error::config_with_source(message, Box::new(e))
        })?,
    };

    let builder = fmt().with_env_filter(filter).with_target(true);
    let installed = if config.json_logging {
        builder.json().with_current_span(true).try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if installed {
        tracing::debug!(
            log_level = %config.log_level,
            json = config.json_logging,
            "logging initialized"
        );
    }
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_config_error() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = ObservabilityConfig { log_level: "info,=[".into(), json_logging: false };
        assert!(matches!(init_logging(&config), Err(Error::Config { .. })));
    }
}
