//! Error types for certificate provisioning.

use thiserror::Error;

use super::condition::reasons;
use super::registry::IssuerIdentity;
use crate::freeipa::ApiError;

/// Result type for provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Every failure the engine returns. Nothing is retried internally; the
/// caller decides on requeue and backoff.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Session establishment failed. Nothing was stored.
    #[error("failed to connect issuer {issuer} to {host}: {source}")]
    Connection {
        issuer: IssuerIdentity,
        host: String,
        #[source]
        source: ApiError,
    },

    /// The CSR could not be decoded.
    #[error("failed to decode CSR for signing with issuer {issuer}: {reason}")]
    Decode { issuer: IssuerIdentity, reason: String },

    /// The CSR decoded but cannot be mapped to a principal.
    #[error("invalid request for issuer {issuer}: {reason}")]
    InvalidRequest { issuer: IssuerIdentity, reason: String },

    /// Host or service registration failed and was not tolerated.
    #[error("failed to register {principal} for issuer {issuer}: {source}")]
    Registration {
        issuer: IssuerIdentity,
        principal: String,
        #[source]
        source: ApiError,
    },

    /// The CA rejected or failed the signing call.
    #[error("failed to request certificate for {principal} from issuer {issuer}: {source}")]
    Signing {
        issuer: IssuerIdentity,
        principal: String,
        #[source]
        source: ApiError,
    },

    /// Signing succeeded but no certificate could be extracted.
    #[error("can't find certificate for {principal} from issuer {issuer}: {response}")]
    CertificateNotFound { issuer: IssuerIdentity, principal: String, response: String },

    /// The caller's cancellation token fired.
    #[error("issuer {issuer} canceled during {step}")]
    Canceled { issuer: IssuerIdentity, step: &'static str },
}

impl ProvisionError {
    /// Issuer the failure belongs to.
    pub fn issuer(&self) -> &IssuerIdentity {
        match self {
            Self::Connection { issuer, .. }
            | Self::Decode { issuer, .. }
            | Self::InvalidRequest { issuer, .. }
            | Self::Registration { issuer, .. }
            | Self::Signing { issuer, .. }
            | Self::CertificateNotFound { issuer, .. }
            | Self::Canceled { issuer, .. } => issuer,
        }
    }

    /// Condition reason a caller should report for this failure.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Connection { .. } => reasons::ERROR,
            Self::Canceled { .. } => reasons::PENDING,
            _ => reasons::FAILED,
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> IssuerIdentity {
        IssuerIdentity::namespaced("certs", "freeipa")
    }

    #[test]
    fn messages_name_the_issuer() {
        let err = ProvisionError::InvalidRequest {
            issuer: issuer(),
            reason: "request has no common name".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid request for issuer freeipa.certs: request has no common name"
        );
        assert_eq!(err.issuer(), &issuer());
    }

    #[test]
    fn source_is_preserved() {
        use std::error::Error as _;

        let err = ProvisionError::Signing {
            issuer: issuer(),
            principal: "HTTP/web.example.com".into(),
            source: ApiError::rpc(2100, "ACIError", "denied"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("ACIError (2100)"));
    }

    #[test]
    fn reasons_by_class() {
        let canceled = ProvisionError::Canceled { issuer: issuer(), step: "cert_request" };
        assert_eq!(canceled.reason(), reasons::PENDING);
        assert!(canceled.is_canceled());

        let connection = ProvisionError::Connection {
            issuer: issuer(),
            host: "ipa.example.com".into(),
            source: ApiError::Http { status: 401, reason: "invalid-password".into() },
        };
        assert_eq!(connection.reason(), reasons::ERROR);

        let missing = ProvisionError::CertificateNotFound {
            issuer: issuer(),
            principal: "HTTP/web.example.com".into(),
            response: "{}".into(),
        };
        assert_eq!(missing.reason(), reasons::FAILED);
    }
}
