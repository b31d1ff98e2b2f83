//! The CA operations the provisioner depends on.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::protocol::{error_codes, CertRequestEntry, CertShowEntry};
use crate::pki::Credentials;

/// Failure talking to the CA.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The server answered with a JSON-RPC error object.
    #[error("{name} ({code}): {message}")]
    Rpc { code: i64, name: String, message: String },

    /// The server answered with a non-success HTTP status.
    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response could not be understood.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn rpc(code: i64, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rpc { code, name: name.into(), message: message.into() }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// True only for a genuine not-found answer. Transport, permission and
    /// other server errors are not.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Rpc { code, .. } if *code == error_codes::NOT_FOUND)
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Rpc { code, .. } if *code == error_codes::DUPLICATE_ENTRY)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

/// Parameters of a `cert_request` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertRequest {
    /// PEM text of the CSR.
    pub csr: String,
    /// Principal the certificate is issued to.
    pub principal: String,
    /// CA (sub-CA) name.
    pub cacn: String,
    /// Create the principal if missing.
    pub add: bool,
}

/// One authenticated session against the CA.
///
/// Every method is a single round trip; implementations never retry.
#[async_trait]
pub trait CaApi: Send + Sync + fmt::Debug {
    /// Look up a host entry.
    async fn host_show(&self, fqdn: &str) -> Result<(), ApiError>;

    /// Create a host entry.
    async fn host_add(&self, fqdn: &str, force: bool) -> Result<(), ApiError>;

    /// Count services matching `principal`, bounded by `size_limit`.
    async fn service_find(&self, principal: &str, size_limit: u32) -> Result<u64, ApiError>;

    /// Create a service principal.
    async fn service_add(&self, principal: &str, force: bool) -> Result<(), ApiError>;

    /// Submit a CSR for signing.
    async fn cert_request(&self, request: &CertRequest) -> Result<CertRequestEntry, ApiError>;

    /// Fetch an issued certificate by serial number.
    async fn cert_show(&self, serial_number: u64, chain: bool) -> Result<CertShowEntry, ApiError>;
}

/// Opens sessions. The registry's factory goes through this so tests can
/// substitute the network.
#[async_trait]
pub trait Connector: Send + Sync + fmt::Debug {
    async fn connect(
        &self,
        host: &str,
        credentials: &Credentials,
        insecure: bool,
    ) -> Result<Arc<dyn CaApi>, ApiError>;
}
