//! Provisioner: one CA session plus the signing policy of one issuer.
//!
//! [`Provisioner::sign`] registers the requesting host and service in the
//! directory when the policy asks for it, submits the CSR and extracts the
//! signed certificate. Concurrent calls against the same provisioner are
//! allowed; losing a "create if absent" race to another caller counts as
//! the entry already existing.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, field, info, instrument, warn};

use super::csr;
use super::error::{ProvisionError, Result};
use super::registry::IssuerIdentity;
use super::response::{extract_first, CaResponse, SigningResult};
use crate::freeipa::{ApiError, CaApi, CertRequest};

/// Immutable signing configuration of one issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningPolicy {
    /// FreeIPA server.
    pub host: String,

    /// Service part of the principal (`<service_name>/<cn>`).
    pub service_name: String,

    /// CA (sub-CA) name requests are signed under.
    pub ca: String,

    /// Create the host entry for the CN when it is missing.
    pub add_host: bool,

    /// Create the service principal when it is missing.
    pub add_service: bool,

    /// Ask the CA to add the principal while signing.
    pub add_principal: bool,

    /// Tolerate service registration failures.
    pub ignore_error: bool,

    /// Skip TLS verification when opening the session.
    pub insecure: bool,
}

impl Default for SigningPolicy {
    fn default() -> Self {
        Self {
            host: String::new(),
            service_name: "HTTP".to_string(),
            ca: "ipa".to_string(),
            add_host: true,
            add_service: true,
            add_principal: true,
            ignore_error: false,
            insecure: false,
        }
    }
}

impl SigningPolicy {
    /// Principal name for a common name.
    pub fn principal(&self, common_name: &str) -> String {
        format!("{}/{}", self.service_name, common_name)
    }
}

/// A CSR to sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningRequest {
    /// PEM encoded PKCS#10 request.
    pub csr: Vec<u8>,

    /// The caller asked for a CA certificate.
    pub is_ca: bool,
}

impl SigningRequest {
    pub fn new(csr: impl Into<Vec<u8>>) -> Self {
        Self { csr: csr.into(), is_ca: false }
    }
}

/// Outcome of one registration step.
#[derive(Debug, Clone, PartialEq)]
pub enum Registration {
    /// Step disabled by policy.
    Skipped,
    /// Entry was already present.
    Existing,
    /// Entry was created by this call.
    Created,
    /// The step failed but policy tolerates it.
    Tolerated(ApiError),
}

/// Live session plus policy for one issuer.
#[derive(Debug)]
pub struct Provisioner {
    identity: IssuerIdentity,
    policy: SigningPolicy,
    api: Arc<dyn CaApi>,
}

impl Provisioner {
    pub fn new(identity: IssuerIdentity, policy: SigningPolicy, api: Arc<dyn CaApi>) -> Self {
        Self { identity, policy, api }
    }

    pub fn identity(&self) -> &IssuerIdentity {
        &self.identity
    }

    pub fn policy(&self) -> &SigningPolicy {
        &self.policy
    }

    /// Sign `request` with this issuer's CA.
    ///
    /// Every CA call races `cancel`; once it fires the remaining steps are
    /// abandoned and [`ProvisionError::Canceled`] is returned. Directory
    /// entries created before that point stay created.
    #[instrument(
        skip(self, cancel, request),
        fields(issuer = %self.identity, common_name = field::Empty, principal = field::Empty)
    )]
    pub async fn sign(
        &self,
        cancel: &CancellationToken,
        request: &SigningRequest,
    ) -> Result<SigningResult> {
        let decoded = csr::decode(&request.csr)
            .map_err(|reason| ProvisionError::Decode { issuer: self.identity.clone(), reason })?;

        if decoded.common_name.is_empty() {
            return Err(self.invalid("request has no common name"));
        }
        if request.is_ca {
            return Err(self.invalid("signing of CA certificates is not supported"));
        }

        let common_name = decoded.common_name.as_str();
        tracing::Span::current().record("common_name", field::display(common_name));

        let host = self.register_host(cancel, common_name).await?;
        debug!(outcome = ?host, "host registration");

        let principal = self.policy.principal(common_name);
        tracing::Span::current().record("principal", field::display(&principal));

        let service = self.register_service(cancel, &principal).await?;
        if let Registration::Tolerated(error) = &service {
            warn!(error = %error, "service registration failed; continuing as configured");
        } else {
            debug!(outcome = ?service, "service registration");
        }

        let request = CertRequest {
            csr: decoded.pem.clone(),
            principal: principal.clone(),
            cacn: self.policy.ca.clone(),
            add: self.policy.add_principal,
        };
        let issued = self
            .guarded(cancel, "cert_request", self.api.cert_request(&request))
            .await?
            .map_err(|source| ProvisionError::Signing {
                issuer: self.identity.clone(),
                principal: principal.clone(),
                source,
            })?;

        let mut responses = Vec::with_capacity(2);
        match issued.serial_number() {
            Some(serial_number) => {
                let shown = self
                    .guarded(cancel, "cert_show", self.api.cert_show(serial_number, true))
                    .await?;
                match shown {
                    Ok(shown) if !shown.certificate_chain.is_empty() => {
                        responses.push(CaResponse::Chain(shown.certificate_chain));
                    }
                    Ok(_) => warn!(serial_number, "certificate chain lookup returned no entries"),
                    Err(error) => {
                        warn!(serial_number, error = %error, "certificate chain lookup failed");
                    }
                }
            }
            None => warn!("signing response carries no serial number; falling back"),
        }
        responses.push(CaResponse::Generic(issued.fields.clone()));

        let Some((result, shape)) = extract_first(&responses) else {
            return Err(ProvisionError::CertificateNotFound {
                issuer: self.identity.clone(),
                principal,
                response: serde_json::Value::Object(issued.fields).to_string(),
            });
        };

        info!(serial_number = ?issued.serial_number(), source = shape, "certificate issued");
        Ok(result)
    }

    /// Ensure a host entry exists for `fqdn`. Only a genuine not-found
    /// answer leads to creation and a duplicate answer to that creation
    /// means another caller won the race. Every other failure is fatal
    /// regardless of the tolerance toggle.
    async fn register_host(&self, cancel: &CancellationToken, fqdn: &str) -> Result<Registration> {
        if !self.policy.add_host {
            return Ok(Registration::Skipped);
        }

        match self.guarded(cancel, "host_show", self.api.host_show(fqdn)).await? {
            Ok(()) => Ok(Registration::Existing),
            Err(error) if error.is_not_found() => {
                match self.guarded(cancel, "host_add", self.api.host_add(fqdn, true)).await? {
                    Ok(()) => {
                        info!(host = fqdn, "registered host");
                        Ok(Registration::Created)
                    }
                    Err(error) if error.is_duplicate() => {
                        debug!(host = fqdn, "host created concurrently");
                        Ok(Registration::Existing)
                    }
                    Err(source) => Err(self.registration(fqdn, source)),
                }
            }
            Err(source) => Err(self.registration(fqdn, source)),
        }
    }

    /// Ensure the service principal exists, honouring `ignore_error`.
    async fn register_service(
        &self,
        cancel: &CancellationToken,
        principal: &str,
    ) -> Result<Registration> {
        if !self.policy.add_service {
            return Ok(Registration::Skipped);
        }

        match self.guarded(cancel, "service_find", self.api.service_find(principal, 1)).await? {
            Ok(count) if count > 0 => Ok(Registration::Existing),
            Ok(_) => self.add_service(cancel, principal, None).await,
            Err(source) if !self.policy.ignore_error => Err(self.registration(principal, source)),
            Err(source) => self.add_service(cancel, principal, Some(source)).await,
        }
    }

    /// `lookup_error` is set when the search already failed under
    /// tolerance; the creation attempt is then best effort.
    async fn add_service(
        &self,
        cancel: &CancellationToken,
        principal: &str,
        lookup_error: Option<ApiError>,
    ) -> Result<Registration> {
        match self.guarded(cancel, "service_add", self.api.service_add(principal, true)).await? {
            Ok(()) => {
                info!(principal, "registered service");
                match lookup_error {
                    Some(error) => Ok(Registration::Tolerated(error)),
                    None => Ok(Registration::Created),
                }
            }
            Err(error) if error.is_duplicate() => {
                debug!(principal, "service created concurrently");
                Ok(Registration::Existing)
            }
            Err(source) if self.policy.ignore_error => Ok(Registration::Tolerated(source)),
            Err(source) => Err(self.registration(principal, source)),
        }
    }

    /// Run one CA call, aborting if `cancel` fires first. The outer result
    /// carries cancellation, the inner one the call's own outcome.
    async fn guarded<T>(
        &self,
        cancel: &CancellationToken,
        step: &'static str,
        call: impl Future<Output = std::result::Result<T, ApiError>>,
    ) -> Result<std::result::Result<T, ApiError>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(step, "canceled");
                Err(ProvisionError::Canceled { issuer: self.identity.clone(), step })
            }
            outcome = call => Ok(outcome),
        }
    }

    fn invalid(&self, reason: &str) -> ProvisionError {
        ProvisionError::InvalidRequest { issuer: self.identity.clone(), reason: reason.to_string() }
    }

    fn registration(&self, principal: &str, source: ApiError) -> ProvisionError {
        ProvisionError::Registration {
            issuer: self.identity.clone(),
            principal: principal.to_string(),
            source,
        }
    }
}
