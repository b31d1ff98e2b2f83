//! Certificate extraction from the CA's responses.
//!
//! Servers disagree on where the signed certificate lives. The structured
//! `cert_show` chain is preferred; the raw `certificate` field of the
//! `cert_request` result is the fallback.

use serde_json::{Map, Value};

use super::format::{bundle, normalize};
use crate::freeipa::protocol::binary_value;

/// Key of the raw certificate in a `cert_request` result.
pub const CERTIFICATE_KEY: &str = "certificate";

/// Signed certificate material, PEM encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningResult {
    /// Leaf certificate.
    pub certificate: String,

    /// CA bundle, empty when unavailable.
    pub ca: String,
}

/// A CA response shape a certificate can be read from.
#[derive(Debug, Clone, PartialEq)]
pub enum CaResponse {
    /// Full chain from a structured lookup, leaf first.
    Chain(Vec<String>),

    /// Open key/value result of the signing call.
    Generic(Map<String, Value>),
}

impl CaResponse {
    /// Read a certificate out of this shape, if it holds one.
    pub fn extract(&self) -> Option<SigningResult> {
        match self {
            Self::Chain(chain) => {
                let (leaf, rest) = chain.split_first()?;
                Some(SigningResult {
                    certificate: normalize(leaf).trim().to_string(),
                    ca: bundle(rest).trim().to_string(),
                })
            }
            Self::Generic(fields) => {
                let raw = fields.get(CERTIFICATE_KEY).and_then(binary_value)?;
                if raw.is_empty() {
                    return None;
                }
                Some(SigningResult {
                    certificate: normalize(raw).trim().to_string(),
                    ca: String::new(),
                })
            }
        }
    }

    fn shape(&self) -> &'static str {
        match self {
            Self::Chain(_) => "chain",
            Self::Generic(_) => "generic",
        }
    }
}

/// Try each response in order and return the first certificate found,
/// with the name of the shape it came from.
pub fn extract_first<'a, I>(responses: I) -> Option<(SigningResult, &'static str)>
where
    I: IntoIterator<Item = &'a CaResponse>,
{
    responses.into_iter().find_map(|r| r.extract().map(|result| (result, r.shape())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn generic(value: Value) -> CaResponse {
        match value {
            Value::Object(map) => CaResponse::Generic(map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn chain_leaf_and_remaining_bundle() {
        let response = CaResponse::Chain(vec!["leaf".into(), "int".into(), "root".into()]);
        let result = response.extract().unwrap();

        assert_eq!(
            result.certificate,
            "-----BEGIN CERTIFICATE-----\nleaf\n-----END CERTIFICATE-----"
        );
        assert_eq!(
            result.ca,
            "-----BEGIN CERTIFICATE-----\nint\n-----END CERTIFICATE-----\n\n\
             -----BEGIN CERTIFICATE-----\nroot\n-----END CERTIFICATE-----"
        );
    }

    #[test]
    fn single_entry_chain_has_empty_ca() {
        let result = CaResponse::Chain(vec!["leaf".into()]).extract().unwrap();
        assert!(result.ca.is_empty());
    }

    #[test]
    fn empty_chain_yields_nothing() {
        assert!(CaResponse::Chain(vec![]).extract().is_none());
    }

    #[test]
    fn generic_reads_certificate_field() {
        let result = generic(json!({"certificate": "raw", "serial_number": 9})).extract().unwrap();
        assert_eq!(
            result.certificate,
            "-----BEGIN CERTIFICATE-----\nraw\n-----END CERTIFICATE-----"
        );
        assert_eq!(result.ca, "");

        let wrapped = generic(json!({"certificate": {"__base64__": "raw"}})).extract().unwrap();
        assert_eq!(wrapped, result);
    }

    #[test]
    fn generic_without_usable_certificate_yields_nothing() {
        assert!(generic(json!({})).extract().is_none());
        assert!(generic(json!({"certificate": ""})).extract().is_none());
        assert!(generic(json!({"certificate": 12})).extract().is_none());
    }

    #[test]
    fn preference_order_is_deterministic() {
        let responses = [
            CaResponse::Chain(vec![]),
            generic(json!({"certificate": "fallback"})),
        ];
        let (result, shape) = extract_first(&responses).unwrap();
        assert_eq!(shape, "generic");
        assert!(result.certificate.contains("fallback"));

        let responses =
            [CaResponse::Chain(vec!["leaf".into()]), generic(json!({"certificate": "fallback"}))];
        let (result, shape) = extract_first(&responses).unwrap();
        assert_eq!(shape, "chain");
        assert!(result.certificate.contains("leaf"));
    }
}
