//! Credential and identity resolution for the issuer CLI.
//!
//! Credentials are resolved from flags first and the environment second,
//! the same way the issuer controller reads them from its secret: raw bytes
//! with trailing newlines stripped.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::debug;

use crate::config::ENV_PREFIX;
use crate::pki::{Credentials, IssuerIdentity};

/// Environment variable holding the login user.
pub fn user_env_var() -> String {
    format!("{}_USER", ENV_PREFIX)
}

/// Environment variable holding the login password.
pub fn password_env_var() -> String {
    format!("{}_PASSWORD", ENV_PREFIX)
}

/// Resolve credentials from the process environment.
///
/// Checks sources in the following priority order:
/// 1. --user / --password-file command line flags
/// 2. FREEIPA_ISSUER_USER / FREEIPA_ISSUER_PASSWORD environment variables
pub fn resolve_credentials(
    user_flag: Option<String>,
    password_file_flag: Option<PathBuf>,
) -> Result<Credentials> {
    resolve_credentials_with(user_flag, password_file_flag, |key| std::env::var(key).ok())
}

/// Same as [`resolve_credentials`] with an injectable environment lookup.
pub fn resolve_credentials_with<F>(
    user_flag: Option<String>,
    password_file_flag: Option<PathBuf>,
    env: F,
) -> Result<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    let user = match user_flag {
        Some(user) => {
            debug!("Using user from --user flag");
            user
        }
        None => env(&user_env_var()).filter(|u| !u.is_empty()).with_context(|| {
            format!("No user found. Pass --user or set {}", user_env_var())
        })?,
    };

    let password = match password_file_flag {
        Some(path) => {
            debug!(path = %path.display(), "Reading password from file");
            std::fs::read(&path)
                .with_context(|| format!("Failed to read password file: {}", path.display()))?
        }
        None => env(&password_env_var())
            .with_context(|| {
                format!("No password found. Pass --password-file or set {}", password_env_var())
            })?
            .into_bytes(),
    };

    Credentials::from_bytes(user.as_bytes(), &password).map_err(anyhow::Error::msg)
}

/// Identity of the issuer the CLI acts for.
pub fn resolve_identity(issuer: &str, namespace: Option<&str>) -> IssuerIdentity {
    match namespace {
        Some(namespace) if !namespace.is_empty() => IssuerIdentity::namespaced(namespace, issuer),
        _ => IssuerIdentity::cluster(issuer),
    }
}
