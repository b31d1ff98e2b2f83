//! # Configuration Settings
//!
//! Issuer settings mirror the fields of the FreeIPA issuer resource. They
//! are layered from an optional TOML file and `FREEIPA_ISSUER_*`
//! environment variables, then validated before a [`SigningPolicy`] is
//! derived from them.

use crate::errors::{Error, Result};
use crate::pki::SigningPolicy;
use config::{Config, Environment, File, FileFormat, Map};
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

/// Prefix of every environment variable the issuer reads.
pub const ENV_PREFIX: &str = "FREEIPA_ISSUER";

/// Settings of one FreeIPA issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct IssuerSettings {
    /// FreeIPA server hostname or base URL
    #[validate(length(min = 1, message = "Host cannot be empty"))]
    pub host: String,

    /// Service part of the principal
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Register the host when missing
    pub add_host: bool,

    /// Register the service principal when missing
    pub add_service: bool,

    /// Let the CA add the principal while signing
    pub add_principal: bool,

    /// CA (sub-CA) name
    #[validate(length(min = 1, message = "CA name cannot be empty"))]
    pub ca: String,

    /// Skip TLS verification
    pub insecure: bool,

    /// Tolerate service registration failures
    pub ignore_error: bool,
}

impl Default for IssuerSettings {
    fn default() -> Self {
        let policy = SigningPolicy::default();
        Self {
            host: policy.host,
            service_name: policy.service_name,
            add_host: policy.add_host,
            add_service: policy.add_service,
            add_principal: policy.add_principal,
            ca: policy.ca,
            insecure: policy.insecure,
            ignore_error: policy.ignore_error,
        }
    }
}

impl IssuerSettings {
    /// Load settings from `path` (if given) overlaid with the process
    /// environment, and validate them.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`load`](Self::load) but reading variables from `env` instead
    /// of the process environment when it is set.
    pub fn load_with_env(path: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(Error::config(format!("Settings file not found: {}", path.display())));
            }
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        let settings: Self = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true).source(env))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;

        if self.host.chars().any(char::is_whitespace) {
            return Err(Error::validation_field("Host cannot contain whitespace", "host"));
        }
        if self.service_name.contains('/') {
            return Err(Error::validation_field("Service name cannot contain '/'", "service_name"));
        }

        Ok(())
    }

    /// Immutable signing policy for a provisioner.
    pub fn policy(&self) -> SigningPolicy {
        SigningPolicy {
            host: self.host.clone(),
            service_name: self.service_name.clone(),
            ca: self.ca.clone(),
            add_host: self.add_host,
            add_service: self.add_service,
            add_principal: self.add_principal,
            ignore_error: self.ignore_error,
            insecure: self.insecure,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logging: false }
    }
}

impl ObservabilityConfig {
    /// Create ObservabilityConfig from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let log_level = std::env::var(format!("{}_LOG_LEVEL", ENV_PREFIX))
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.log_level);

        let json_logging = std::env::var(format!("{}_LOG_JSON", ENV_PREFIX))
            .map(|s| s.eq_ignore_ascii_case("true") || s == "1")
            .unwrap_or(defaults.json_logging);

        Self { log_level, json_logging }
    }
}
