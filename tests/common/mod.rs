//! Common test utilities for all integration tests.
//!
//! Provides CSR generation and a scripted in-memory CA.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

use async_trait::async_trait;
use freeipa_issuer::freeipa::{ApiError, CaApi, CertRequest, CertRequestEntry, CertShowEntry};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use serde_json::{json, Map, Value};
use std::sync::Mutex;

/// PEM encoded CSR, with the given subject common name if any.
pub fn csr_pem(common_name: Option<&str>) -> String {
    let key = KeyPair::generate().expect("generate key");
    let sans = common_name.map(|cn| vec![cn.to_string()]).unwrap_or_default();
    let mut params = CertificateParams::new(sans).expect("certificate params");

    let mut dn = DistinguishedName::new();
    if let Some(cn) = common_name {
        dn.push(DnType::CommonName, cn);
    }
    dn.push(DnType::OrganizationName, "Example");
    params.distinguished_name = dn;

    params.serialize_request(&key).expect("serialize CSR").pem().expect("CSR PEM")
}

/// `{"certificate": ..., "serial_number": ...}` result of `cert_request`.
pub fn issued(certificate: &str, serial_number: Value) -> Map<String, Value> {
    match json!({ "certificate": certificate, "serial_number": serial_number }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

/// One recorded CA call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    HostShow { fqdn: String },
    HostAdd { fqdn: String, force: bool },
    ServiceFind { principal: String, size_limit: u32 },
    ServiceAdd { principal: String, force: bool },
    CertRequest(CertRequest),
    CertShow { serial_number: u64, chain: bool },
}

impl Call {
    pub fn method(&self) -> &'static str {
        match self {
            Self::HostShow { .. } => "host_show",
            Self::HostAdd { .. } => "host_add",
            Self::ServiceFind { .. } => "service_find",
            Self::ServiceAdd { .. } => "service_add",
            Self::CertRequest(_) => "cert_request",
            Self::CertShow { .. } => "cert_show",
        }
    }
}

/// Scripted CA. By default the host and service already exist, signing
/// returns serial 7 with a raw certificate, and the chain lookup returns a
/// three element chain.
#[derive(Debug)]
pub struct FakeCa {
    /// Calls in arrival order.
    pub calls: Mutex<Vec<Call>>,
    pub host_show_error: Option<ApiError>,
    pub host_add_error: Option<ApiError>,
    pub service_count: u64,
    pub service_find_error: Option<ApiError>,
    pub service_add_error: Option<ApiError>,
    pub cert_request_error: Option<ApiError>,
    pub cert_request_fields: Map<String, Value>,
    pub chain: Vec<String>,
    pub cert_show_error: Option<ApiError>,
    /// Method that never completes, for cancellation tests.
    pub pending_on: Option<&'static str>,
}

impl Default for FakeCa {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            host_show_error: None,
            host_add_error: None,
            service_count: 1,
            service_find_error: None,
            service_add_error: None,
            cert_request_error: None,
            cert_request_fields: issued("RAW", json!(7)),
            chain: vec!["LEAF".into(), "INTERMEDIATE".into(), "ROOT".into()],
            cert_show_error: None,
            pending_on: None,
        }
    }
}

impl FakeCa {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<&'static str> {
        self.calls().iter().map(Call::method).collect()
    }

    async fn record(&self, call: Call) {
        let method = call.method();
        self.calls.lock().unwrap().push(call);
        if self.pending_on == Some(method) {
            std::future::pending::<()>().await;
        }
    }

    fn outcome(error: &Option<ApiError>) -> Result<(), ApiError> {
        match error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CaApi for FakeCa {
    async fn host_show(&self, fqdn: &str) -> Result<(), ApiError> {
        self.record(Call::HostShow { fqdn: fqdn.into() }).await;
        Self::outcome(&self.host_show_error)
    }

    async fn host_add(&self, fqdn: &str, force: bool) -> Result<(), ApiError> {
        self.record(Call::HostAdd { fqdn: fqdn.into(), force }).await;
        Self::outcome(&self.host_add_error)
    }

    async fn service_find(&self, principal: &str, size_limit: u32) -> Result<u64, ApiError> {
        self.record(Call::ServiceFind { principal: principal.into(), size_limit }).await;
        Self::outcome(&self.service_find_error).map(|_| self.service_count)
    }

    async fn service_add(&self, principal: &str, force: bool) -> Result<(), ApiError> {
        self.record(Call::ServiceAdd { principal: principal.into(), force }).await;
        Self::outcome(&self.service_add_error)
    }

    async fn cert_request(&self, request: &CertRequest) -> Result<CertRequestEntry, ApiError> {
        self.record(Call::CertRequest(request.clone())).await;
        Self::outcome(&self.cert_request_error)
            .map(|_| CertRequestEntry::new(self.cert_request_fields.clone()))
    }

    async fn cert_show(&self, serial_number: u64, chain: bool) -> Result<CertShowEntry, ApiError> {
        self.record(Call::CertShow { serial_number, chain }).await;
        Self::outcome(&self.cert_show_error)
            .map(|_| CertShowEntry { certificate_chain: self.chain.clone() })
    }
}

/// JSON-RPC 4001 answer.
pub fn not_found() -> ApiError {
    ApiError::rpc(4001, "NotFound", "entry not found")
}

/// JSON-RPC 4002 answer, as seen by the loser of a creation race.
pub fn duplicate() -> ApiError {
    ApiError::rpc(4002, "DuplicateEntry", "entry already exists")
}

/// JSON-RPC permission failure.
pub fn denied() -> ApiError {
    ApiError::rpc(2100, "ACIError", "Insufficient access")
}

/// `-----BEGIN CERTIFICATE-----\n<body>\n-----END CERTIFICATE-----`
pub fn pem(body: &str) -> String {
    format!("-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----", body)
}
