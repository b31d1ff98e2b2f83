//! Integration tests for the provisioner registry
//!
//! Covers store/load atomicity under concurrent access and the failure
//! modes of `create`.

mod common;

use async_trait::async_trait;
use common::FakeCa;
use freeipa_issuer::freeipa::{ApiError, CaApi, Connector};
use freeipa_issuer::pki::{
    reasons, Credentials, IssuerIdentity, ProvisionError, Provisioner, ProvisionerRegistry,
    SigningPolicy,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
enum Behaviour {
    Succeed,
    Fail(ApiError),
    Hang,
}

#[derive(Debug)]
struct ScriptedConnector {
    behaviour: Behaviour,
    attempts: AtomicUsize,
}

impl ScriptedConnector {
    fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self { behaviour, attempts: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(
        &self,
        _host: &str,
        _credentials: &Credentials,
        _insecure: bool,
    ) -> Result<Arc<dyn CaApi>, ApiError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            Behaviour::Succeed => Ok(Arc::new(FakeCa::new())),
            Behaviour::Fail(error) => Err(error.clone()),
            Behaviour::Hang => std::future::pending().await,
        }
    }
}

fn policy(host: &str) -> SigningPolicy {
    SigningPolicy { host: host.into(), ..Default::default() }
}

fn credentials() -> Credentials {
    Credentials::new("admin", "s3cret")
}

fn provisioner(identity: &IssuerIdentity, host: &str) -> Arc<Provisioner> {
    Arc::new(Provisioner::new(identity.clone(), policy(host), Arc::new(FakeCa::new())))
}

#[test]
fn test_store_then_load() {
    let registry = ProvisionerRegistry::new();
    let identity = IssuerIdentity::namespaced("certs", "freeipa");

    assert!(registry.load(&identity).is_none());
    registry.store(identity.clone(), provisioner(&identity, "ipa-1"));

    let loaded = registry.load(&identity).unwrap();
    assert_eq!(loaded.policy().host, "ipa-1");
    assert_eq!(loaded.identity(), &identity);
    assert!(registry.load(&IssuerIdentity::cluster("freeipa")).is_none());
}

#[test]
fn test_store_replaces_and_in_flight_holders_keep_old() {
    let registry = ProvisionerRegistry::new();
    let identity = IssuerIdentity::namespaced("certs", "freeipa");

    registry.store(identity.clone(), provisioner(&identity, "ipa-1"));
    let in_flight = registry.load(&identity).unwrap();

    registry.store(identity.clone(), provisioner(&identity, "ipa-2"));

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.load(&identity).unwrap().policy().host, "ipa-2");
    assert_eq!(in_flight.policy().host, "ipa-1");
}

#[test]
fn test_concurrent_store_and_load() {
    let registry = Arc::new(ProvisionerRegistry::new());
    let hosts = ["ipa-a", "ipa-b"];

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let registry = registry.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    let identity = IssuerIdentity::namespaced(format!("ns{}", i % 4), "freeipa");
                    if t % 2 == 0 {
                        registry.store(identity.clone(), provisioner(&identity, hosts[i % 2]));
                    } else if let Some(found) = registry.load(&identity) {
                        // Either complete old or complete new; never torn.
                        assert!(hosts.contains(&found.policy().host.as_str()));
                        assert_eq!(found.identity(), &identity);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(registry.len(), 4);
}

#[tokio::test]
async fn test_create_does_not_store() {
    let connector = ScriptedConnector::new(Behaviour::Succeed);
    let registry = ProvisionerRegistry::with_connector(connector.clone());
    let identity = IssuerIdentity::cluster("freeipa");

    let created = registry
        .create(&CancellationToken::new(), identity.clone(), policy("ipa"), &credentials())
        .await
        .unwrap();

    assert_eq!(created.identity(), &identity);
    assert!(registry.is_empty());
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_create_connection_failure() {
    let connector = ScriptedConnector::new(Behaviour::Fail(ApiError::transport("refused")));
    let registry = ProvisionerRegistry::with_connector(connector.clone());
    let identity = IssuerIdentity::namespaced("certs", "freeipa");

    let err = registry
        .create(&CancellationToken::new(), identity.clone(), policy("ipa"), &credentials())
        .await
        .unwrap_err();

    match &err {
        ProvisionError::Connection { issuer, host, source } => {
            assert_eq!(issuer, &identity);
            assert_eq!(host, "ipa");
            assert_eq!(source, &ApiError::transport("refused"));
        }
        other => panic!("expected connection error, got {other:?}"),
    }
    assert_eq!(err.reason(), reasons::ERROR);
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
    assert!(registry.load(&identity).is_none());
}

#[tokio::test]
async fn test_create_honours_cancellation() {
    let registry = ProvisionerRegistry::with_connector(ScriptedConnector::new(Behaviour::Hang));
    let identity = IssuerIdentity::cluster("freeipa");
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        registry.create(&cancel, identity, policy("ipa"), &credentials()),
    )
    .await
    .expect("create should observe cancellation")
    .unwrap_err();

    assert!(matches!(err, ProvisionError::Canceled { step: "connect", .. }));
    assert!(registry.is_empty());
}
