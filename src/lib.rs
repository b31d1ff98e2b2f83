//! # FreeIPA Issuer
//!
//! Certificate provisioning engine for cert-manager style issuers backed by
//! a FreeIPA CA. Given a PEM encoded CSR it registers the requesting host
//! and service in the directory when configured to, submits the CSR and
//! returns the signed leaf certificate plus CA bundle.
//!
//! ## Architecture
//!
//! ```text
//! request controller ──▶ ProvisionerRegistry ──▶ Provisioner::sign ──▶ CaApi
//!         │                                                             │
//!  condition tracker                                     FreeIPA JSON-RPC session
//! ```
//!
//! ## Core Components
//!
//! - **pki**: registry, provisioner, CSR decoding, response extraction,
//!   certificate formatting and issuer conditions
//! - **freeipa**: JSON-RPC client and the [`freeipa::CaApi`] seam
//! - **config**: issuer settings layered from file and environment
//! - **observability**: structured logging
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use freeipa_issuer::config::IssuerSettings;
//! use freeipa_issuer::pki::{Credentials, IssuerIdentity, ProvisionerRegistry, SigningRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = IssuerSettings::load(None)?;
//!     let registry = ProvisionerRegistry::new();
//!     let cancel = CancellationToken::new();
//!     let identity = IssuerIdentity::namespaced("certs", "freeipa");
//!
//!     let credentials = Credentials::new("admin", "secret");
//!     let provisioner = registry
//!         .create(&cancel, identity.clone(), settings.policy(), &credentials)
//!         .await?;
//!     registry.store(identity, provisioner.clone());
//!
//!     let csr = std::fs::read("request.pem")?;
//!     let signed = provisioner.sign(&cancel, &SigningRequest::new(csr)).await?;
//!     println!("{}", signed.certificate);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod freeipa;
pub mod observability;
pub mod pki;

// Re-export commonly used types and traits
pub use config::{IssuerSettings, ObservabilityConfig};
pub use errors::{Error, Result};
pub use observability::init_logging;
pub use pki::{
    Credentials, IssuerIdentity, ProvisionError, Provisioner, ProvisionerRegistry, SigningPolicy,
    SigningRequest, SigningResult,
};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
