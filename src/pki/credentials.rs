//! Credentials used to open a CA session.
//!
//! Values arrive from the secret store as opaque bytes. The password is held
//! in a [`SecretString`] that redacts itself in Debug, Display and
//! serialization and is zeroed on drop.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A string whose contents never reach logs or serialized output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The underlying value. Only for handing to the wire.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretString)
    }
}

/// User and password for the CA's password login.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Credentials {
    user: String,
    password: SecretString,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self { user: user.into(), password: SecretString::new(password) }
    }

    /// Build from the raw bytes of two secret keys. Trailing newlines, which
    /// commonly sneak into secrets created from files, are stripped.
    pub fn from_bytes(user: &[u8], password: &[u8]) -> Result<Self, String> {
        let user = std::str::from_utf8(user)
            .map_err(|_| "user secret is not valid UTF-8".to_string())?
            .trim_end_matches(['\r', '\n']);
        let password = std::str::from_utf8(password)
            .map_err(|_| "password secret is not valid UTF-8".to_string())?
            .trim_end_matches(['\r', '\n']);

        if user.is_empty() {
            return Err("user secret is empty".to_string());
        }

        Ok(Self::new(user, password))
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }
}
