//! Registry of live provisioners, keyed by issuer.
//!
//! One registry instance is created at process start and handed to every
//! caller that needs it. It starts empty, grows through
//! [`ProvisionerRegistry::store`] and is never cleared; storing under an
//! existing identity replaces the previous provisioner, which lives on only
//! as long as in-flight `sign` calls hold it.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::credentials::Credentials;
use super::error::{ProvisionError, Result};
use super::provisioner::{Provisioner, SigningPolicy};
use crate::freeipa::{Connector, FreeIpaConnector};

/// Key of one issuer configuration: an optional namespace plus a name.
/// Cluster scoped issuers have no namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssuerIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
}

impl IssuerIdentity {
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { namespace: Some(namespace.into()), name: name.into() }
    }

    pub fn cluster(name: impl Into<String>) -> Self {
        Self { namespace: None, name: name.into() }
    }
}

impl fmt::Display for IssuerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{}.{}", self.name, namespace),
            None => f.write_str(&self.name),
        }
    }
}

/// Concurrent map from issuer to provisioner.
///
/// Backed by a sharded map: a `store` for one issuer never waits on
/// traffic for another, and a `load` racing a `store` sees either the old
/// or the new provisioner.
pub struct ProvisionerRegistry {
    provisioners: DashMap<IssuerIdentity, Arc<Provisioner>>,
    connector: Arc<dyn Connector>,
}

impl fmt::Debug for ProvisionerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionerRegistry")
            .field("issuers", &self.provisioners.len())
            .field("connector", &self.connector)
            .finish()
    }
}

impl Default for ProvisionerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvisionerRegistry {
    /// Registry that opens real FreeIPA sessions.
    pub fn new() -> Self {
        Self::with_connector(Arc::new(FreeIpaConnector))
    }

    pub fn with_connector(connector: Arc<dyn Connector>) -> Self {
        Self { provisioners: DashMap::new(), connector }
    }

    /// Open a session for `identity` and build its provisioner.
    ///
    /// The result is not stored; callers decide when to [`store`](Self::store)
    /// it. Connection failures are returned as-is, without retry.
    pub async fn create(
        &self,
        cancel: &CancellationToken,
        identity: IssuerIdentity,
        policy: SigningPolicy,
        credentials: &Credentials,
    ) -> Result<Arc<Provisioner>> {
        debug!(
            issuer = %identity,
            host = %policy.host,
            insecure = policy.insecure,
            "opening CA session"
        );

        let connect = self.connector.connect(&policy.host, credentials, policy.insecure);
        let api = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(ProvisionError::Canceled { issuer: identity, step: "connect" });
            }
            api = connect => api,
        };

        let api = api.map_err(|source| ProvisionError::Connection {
            issuer: identity.clone(),
            host: policy.host.clone(),
            source,
        })?;

        info!(issuer = %identity, host = %policy.host, "CA session established");
        Ok(Arc::new(Provisioner::new(identity, policy, api)))
    }

    /// Insert or replace the provisioner stored under `identity`.
    pub fn store(&self, identity: IssuerIdentity, provisioner: Arc<Provisioner>) {
        if self.provisioners.insert(identity.clone(), provisioner).is_some() {
            debug!(issuer = %identity, "replaced provisioner");
        }
    }

    /// Current provisioner for `identity`, if any.
    pub fn load(&self, identity: &IssuerIdentity) -> Option<Arc<Provisioner>> {
        self.provisioners.get(identity).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.provisioners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.provisioners.is_empty()
    }
}
