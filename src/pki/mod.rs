//! # Certificate provisioning engine
//!
//! Turns certificate signing requests into signed certificates through a
//! FreeIPA CA.
//!
//! ```text
//! caller ── create ──▶ ProvisionerRegistry ── store/load ──▶ Provisioner
//!                                                             │ sign
//!                          host/service registration ◀────────┤
//!                          cert_request / cert_show  ◀────────┘
//! ```
//!
//! The caller resolves credentials, builds a [`Provisioner`] through
//! [`ProvisionerRegistry::create`], stores it under the issuer's identity,
//! and later loads it to [`Provisioner::sign`] requests. Outcomes are
//! reported back with [`set_condition`].
//!
//! ```rust,ignore
//! use freeipa_issuer::pki::*;
//! use tokio_util::sync::CancellationToken;
//!
//! let registry = ProvisionerRegistry::new();
//! let cancel = CancellationToken::new();
//! let identity = IssuerIdentity::namespaced("certs", "freeipa");
//! let provisioner = registry
//!     .create(&cancel, identity.clone(), policy, &Credentials::new("admin", "secret"))
//!     .await?;
//! registry.store(identity.clone(), provisioner);
//!
//! let provisioner = registry.load(&identity).expect("stored above");
//! let signed = provisioner.sign(&cancel, &SigningRequest::new(csr_pem)).await?;
//! ```

pub mod condition;
pub mod credentials;
pub mod csr;
pub mod error;
pub mod format;
pub mod provisioner;
pub mod registry;
pub mod response;

pub use condition::{
    has_condition, reasons, set_condition, Condition, ConditionStatus, ConditionType, IssuerStatus,
};
pub use credentials::{Credentials, SecretString};
pub use error::{ProvisionError, Result};
pub use format::normalize;
pub use provisioner::{Provisioner, Registration, SigningPolicy, SigningRequest};
pub use registry::{IssuerIdentity, ProvisionerRegistry};
pub use response::{CaResponse, SigningResult};
