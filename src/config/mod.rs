//! # Configuration Management
//!
//! Settings for one issuer plus logging configuration.

pub mod settings;

pub use settings::{IssuerSettings, ObservabilityConfig, ENV_PREFIX};
