//! # Command Line Interface
//!
//! Operator tooling around the provisioning engine: verify that an issuer
//! can reach its CA, and sign a CSR end to end the way the controller would.

pub mod config;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, Instrument};

use crate::config::{IssuerSettings, ObservabilityConfig};
use crate::observability::{init_logging, log_settings_info};
use crate::pki::{
    reasons, ConditionStatus, ConditionType, Credentials, IssuerIdentity, IssuerStatus,
    ProvisionError, ProvisionerRegistry, SigningRequest, SigningResult,
};
use crate::{session_span, sign_span};

#[derive(Parser)]
#[command(name = "freeipa-issuer")]
#[command(about = "Sign certificate requests through a FreeIPA CA")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Issuer settings file (TOML); FREEIPA_ISSUER_* variables override it
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Issuer name
    #[arg(long, global = true, default_value = "freeipa")]
    pub issuer: String,

    /// Issuer namespace; omit for a cluster scoped issuer
    #[arg(long, global = true)]
    pub namespace: Option<String>,

    /// Login user
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Path to file containing the login password
    #[arg(long, global = true)]
    pub password_file: Option<PathBuf>,

    /// Abort after this many seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open a session and print the issuer's Ready condition
    Check,

    /// Sign a PEM encoded CSR
    Sign {
        /// CSR file
        #[arg(long)]
        csr: PathBuf,

        /// Request a CA certificate (always refused)
        #[arg(long)]
        ca: bool,

        /// Write the leaf certificate here instead of stdout
        #[arg(long)]
        cert_out: Option<PathBuf>,

        /// Write the CA bundle here instead of stdout
        #[arg(long)]
        ca_out: Option<PathBuf>,
    },
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut observability = ObservabilityConfig::from_env();
    if cli.verbose {
        observability.log_level = "debug".to_string();
    }
    if cli.json_logs {
        observability.json_logging = true;
    }
    init_logging(&observability)?;

    let settings = IssuerSettings::load(cli.config.as_deref())?;
    log_settings_info(&settings);

    let identity = config::resolve_identity(&cli.issuer, cli.namespace.as_deref());
    let credentials = config::resolve_credentials(cli.user, cli.password_file)?;
    let cancel = cancel_after(cli.timeout);
    let registry = ProvisionerRegistry::new();

    match cli.command {
        Commands::Check => {
            let (status, outcome) =
                check(&registry, &cancel, identity, &settings, &credentials).await;
            println!("{}", ready_condition_json(&status)?);
            outcome.map_err(|error| failure(error, cli.timeout))
        }
        Commands::Sign { csr, ca, cert_out, ca_out } => {
            let request = SigningRequest {
                csr: tokio::fs::read(&csr)
                    .await
                    .with_context(|| format!("Failed to read CSR: {}", csr.display()))?,
                is_ca: ca,
            };

            let span = sign_span!(identity, csr = %csr.display());
            let result = sign(&registry, &cancel, identity, &settings, &credentials, &request)
                .instrument(span)
                .await
                .map_err(|error| failure(error, cli.timeout))?;

            write_output(cert_out.as_deref(), &result.certificate).await?;
            if !result.ca.is_empty() {
                write_output(ca_out.as_deref(), &result.ca).await?;
            }
            Ok(())
        }
    }
}

/// Token that fires after `timeout` seconds, or never.
fn cancel_after(timeout: Option<u64>) -> CancellationToken {
    let cancel = CancellationToken::new();
    if let Some(seconds) = timeout {
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            token.cancel();
        });
    }
    cancel
}

/// Name a cancellation caused by `--timeout` as such.
fn failure(error: ProvisionError, timeout: Option<u64>) -> anyhow::Error {
    match timeout {
        Some(seconds) if error.is_canceled() => {
            anyhow::Error::from(error).context(format!("Timed out after {}s", seconds))
        }
        _ => error.into(),
    }
}

/// Open a session and record the outcome as the issuer's Ready condition.
async fn check(
    registry: &ProvisionerRegistry,
    cancel: &CancellationToken,
    identity: IssuerIdentity,
    settings: &IssuerSettings,
    credentials: &Credentials,
) -> (IssuerStatus, Result<(), ProvisionError>) {
    let span = session_span!(identity, settings.host);
    let outcome = registry
        .create(cancel, identity.clone(), settings.policy(), credentials)
        .instrument(span)
        .await;

    let mut status = IssuerStatus::default();
    let outcome = match outcome {
        Ok(provisioner) => {
            registry.store(identity, provisioner);
            status.set_condition(
                ConditionType::READY,
                ConditionStatus::True,
                reasons::VERIFIED,
                "Signing CA verified",
                Utc::now(),
            );
            Ok(())
        }
        Err(error) => {
            status.set_condition(
                ConditionType::READY,
                ConditionStatus::False,
                error.reason(),
                error.to_string(),
                Utc::now(),
            );
            Err(error)
        }
    };

    (status, outcome)
}

fn ready_condition_json(status: &IssuerStatus) -> anyhow::Result<String> {
    let ready = status.get(&ConditionType::READY).context("Ready condition was not set")?;
    Ok(serde_json::to_string_pretty(ready)?)
}

/// Create, store, reload and sign, as the request controller does on a
/// cold cache.
async fn sign(
    registry: &ProvisionerRegistry,
    cancel: &CancellationToken,
    identity: IssuerIdentity,
    settings: &IssuerSettings,
    credentials: &Credentials,
    request: &SigningRequest,
) -> Result<SigningResult, ProvisionError> {
    let provisioner =
        registry.create(cancel, identity.clone(), settings.policy(), credentials).await?;
    registry.store(identity.clone(), provisioner);

    let Some(provisioner) = registry.load(&identity) else {
        return Err(ProvisionError::InvalidRequest {
            issuer: identity,
            reason: "provisioner not found after store".to_string(),
        });
    };

    let result = provisioner.sign(cancel, request).await?;
    info!(reason = reasons::ISSUED, "certificate fetched from issuer successfully");
    Ok(result)
}

async fn write_output(path: Option<&Path>, pem: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => tokio::fs::write(path, format!("{}\n", pem))
            .await
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{}", pem);
            Ok(())
        }
    }
}
