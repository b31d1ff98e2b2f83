//! HTTP client for the FreeIPA JSON-RPC API.
//!
//! A session is opened with a password login; the `ipa_session` cookie it
//! returns is kept in the client's cookie store and replayed on every
//! JSON-RPC call. Sessions are never refreshed here: when one expires the
//! call fails and the caller rebuilds the provisioner.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, REFERER};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, trace};
use url::Url;

use super::api::{ApiError, CaApi, CertRequest, Connector};
use super::protocol::{
    decode_result, CertRequestEntry, CertShowEntry, EntryResult, FindResult, RpcRequest,
    RpcResponse, JSON_PATH, LOGIN_PATH, REFERER_PATH, REJECTION_REASON_HEADER,
};
use crate::pki::Credentials;

/// Authenticated FreeIPA session.
#[derive(Debug, Clone)]
pub struct FreeIpaClient {
    client: Client,
    base_url: Url,
}

impl FreeIpaClient {
    /// Log in to `host` and return a client bound to the new session.
    ///
    /// `host` is a bare hostname (`ipa.example.com`, reached over HTTPS) or
    /// a full base URL.
    pub async fn connect(
        host: &str,
        credentials: &Credentials,
        insecure: bool,
    ) -> Result<Self, ApiError> {
        let base_url = base_url(host)?;

        let client = Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|e| ApiError::transport(format!("failed to build HTTP client: {}", e)))?;

        let session = Self { client, base_url };
        session.login(credentials).await?;
        Ok(session)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::transport(format!("invalid endpoint {}: {}", path, e)))
    }

    fn referer(&self) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), REFERER_PATH)
    }

    async fn login(&self, credentials: &Credentials) -> Result<(), ApiError> {
        let url = self.endpoint(LOGIN_PATH)?;
        debug!(url = %url, user = %credentials.user(), "opening FreeIPA session");

        let response = self
            .client
            .post(url)
            .header(REFERER, self.referer())
            .header(ACCEPT, "text/plain")
            .form(&[
                ("user", credentials.user()),
                ("password", credentials.password().expose_secret()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::OK {
            return Ok(());
        }

        let reason = response
            .headers()
            .get(REJECTION_REASON_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("login rejected").to_string());

        Err(ApiError::Http { status: status.as_u16(), reason })
    }

    /// Perform one JSON-RPC call and decode the outer `result` object.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        args: Vec<Value>,
        options: Map<String, Value>,
    ) -> Result<T, ApiError> {
        let request = RpcRequest::new(method, args, options);
        trace!(method, "FreeIPA call");

        let response = self
            .client
            .post(self.endpoint(JSON_PATH)?)
            .header(REFERER, self.referer())
            .header(ACCEPT, "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let reason = response.text().await.unwrap_or_else(|_| status.to_string());
            return Err(ApiError::Http { status: status.as_u16(), reason });
        }

        let body: RpcResponse = response.json().await?;
        if let Some(error) = body.error {
            debug!(method, code = error.code, name = %error.name, "FreeIPA call failed");
            return Err(ApiError::rpc(error.code, error.name, error.message));
        }

        let result = body.result.ok_or_else(|| {
            ApiError::decode(format!("{} returned neither result nor error", method))
        })?;

        decode_result(result).map_err(|e| ApiError::decode(format!("{}: {}", method, e)))
    }
}

fn options(pairs: Value) -> Map<String, Value> {
    match pairs {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[async_trait]
impl CaApi for FreeIpaClient {
    async fn host_show(&self, fqdn: &str) -> Result<(), ApiError> {
        self.call::<EntryResult<Value>>("host_show", vec![json!(fqdn)], Map::new()).await?;
        Ok(())
    }

    async fn host_add(&self, fqdn: &str, force: bool) -> Result<(), ApiError> {
        self.call::<EntryResult<Value>>(
            "host_add",
            vec![json!(fqdn)],
            options(json!({ "force": force })),
        )
        .await?;
        Ok(())
    }

    async fn service_find(&self, principal: &str, size_limit: u32) -> Result<u64, ApiError> {
        let found: FindResult = self
            .call(
                "service_find",
                vec![json!(principal)],
                options(json!({ "pkey_only": true, "sizelimit": size_limit })),
            )
            .await?;
        Ok(found.count)
    }

    async fn service_add(&self, principal: &str, force: bool) -> Result<(), ApiError> {
        self.call::<EntryResult<Value>>(
            "service_add",
            vec![json!(principal)],
            options(json!({ "force": force })),
        )
        .await?;
        Ok(())
    }

    async fn cert_request(&self, request: &CertRequest) -> Result<CertRequestEntry, ApiError> {
        let entry: EntryResult<CertRequestEntry> = self
            .call(
                "cert_request",
                vec![json!(request.csr)],
                options(json!({
                    "principal": request.principal,
                    "cacn": request.cacn,
                    "add": request.add,
                })),
            )
            .await?;
        Ok(entry.result)
    }

    async fn cert_show(&self, serial_number: u64, chain: bool) -> Result<CertShowEntry, ApiError> {
        let entry: EntryResult<CertShowEntry> = self
            .call("cert_show", vec![json!(serial_number)], options(json!({ "chain": chain })))
            .await?;
        Ok(entry.result)
    }
}

/// Connector that opens real FreeIPA sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeIpaConnector;

#[async_trait]
impl Connector for FreeIpaConnector {
    async fn connect(
        &self,
        host: &str,
        credentials: &Credentials,
        insecure: bool,
    ) -> Result<Arc<dyn CaApi>, ApiError> {
        let client = FreeIpaClient::connect(host, credentials, insecure).await?;
        Ok(Arc::new(client))
    }
}

/// Resolve the configured host into the server's base URL.
pub fn base_url(host: &str) -> Result<Url, ApiError> {
    let host = host.trim();
    let raw = if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    };

    let url = Url::parse(&raw)
        .map_err(|e| ApiError::transport(format!("invalid FreeIPA host {:?}: {}", host, e)))?;
    if url.host_str().is_none() {
        return Err(ApiError::transport(format!("FreeIPA host {:?} has no hostname", host)));
    }
    Ok(url)
}
