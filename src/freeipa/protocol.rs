//! FreeIPA JSON-RPC wire types.
//!
//! Every call is `POST /ipa/session/json` with
//! `{"id":0,"method":m,"params":[[positional...],{options...,"version":v}]}`.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// API version pinned in every request.
pub const API_VERSION: &str = "2.230";

pub const LOGIN_PATH: &str = "/ipa/session/login_password";
pub const JSON_PATH: &str = "/ipa/session/json";
pub const REFERER_PATH: &str = "/ipa";

/// Header carrying the server's reason for rejecting a login.
pub const REJECTION_REASON_HEADER: &str = "x-ipa-rejection-reason";

/// FreeIPA error codes the engine branches on.
pub mod error_codes {
    /// `NotFound`: the requested entry does not exist.
    pub const NOT_FOUND: i64 = 4001;
    /// `DuplicateEntry`: the entry already exists.
    pub const DUPLICATE_ENTRY: i64 = 4002;
}

/// JSON-RPC request envelope.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    pub id: u32,
    pub method: String,
    pub params: (Vec<Value>, Map<String, Value>),
}

impl RpcRequest {
    pub fn new(method: &str, args: Vec<Value>, mut options: Map<String, Value>) -> Self {
        options.insert("version".to_string(), Value::from(API_VERSION));
        Self { id: 0, method: method.to_string(), params: (args, options) }
    }
}

/// JSON-RPC response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<Value>,

    #[serde(default)]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcError {
    pub code: i64,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub message: String,
}

/// Outer `result` object of commands returning a single entry.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryResult<T> {
    pub result: T,
}

/// Outer `result` object of `*_find` commands.
#[derive(Debug, Clone, Deserialize)]
pub struct FindResult {
    pub count: u64,

    #[serde(default)]
    pub truncated: bool,
}

/// `cert_show` entry. Only the chain is read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CertShowEntry {
    #[serde(default, deserialize_with = "deserialize_binary_list")]
    pub certificate_chain: Vec<String>,
}

/// `cert_request` entry kept as an open map; its shape varies across
/// server versions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CertRequestEntry {
    pub fields: Map<String, Value>,
}

impl CertRequestEntry {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Serial number, accepted as a JSON number or a decimal string.
    pub fn serial_number(&self) -> Option<u64> {
        match self.fields.get("serial_number")? {
            Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for CertRequestEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Self { fields: Map::deserialize(deserializer)? })
    }
}

/// Read a binary attribute that FreeIPA encodes either as a plain string
/// or as `{"__base64__": "..."}`.
pub fn binary_value(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map.get("__base64__").and_then(Value::as_str),
        _ => None,
    }
}

fn deserialize_binary_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    values
        .unwrap_or_default()
        .iter()
        .map(|v| {
            binary_value(v)
                .map(str::to_string)
                .ok_or_else(|| de::Error::custom("certificate chain entry is not a string"))
        })
        .collect()
}

/// Decode the outer `result` of a successful call.
pub fn decode_result<T: DeserializeOwned>(result: Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(result)
}
