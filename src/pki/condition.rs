//! Status conditions for issuers and certificate requests.
//!
//! [`set_condition`] is the single entry point for mutating a condition
//! list. Callers own the list and serialise writes to it; nothing here
//! locks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use tracing::info;

/// Condition reasons reported on issuers.
pub mod reasons {
    /// Session established and provisioner stored.
    pub const VERIFIED: &str = "Verified";
    /// Session or provisioner construction failed.
    pub const ERROR: &str = "Error";
    /// A referenced secret or key was missing.
    pub const NOT_FOUND: &str = "NotFound";
    /// Certificate request is waiting on its issuer.
    pub const PENDING: &str = "Pending";
    /// Certificate request failed to sign.
    pub const FAILED: &str = "Failed";
    /// Certificate request was signed.
    pub const ISSUED: &str = "Issued";
}

/// Kind of a condition. At most one condition per type lives in a list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionType(Cow<'static, str>);

impl ConditionType {
    /// The resource is ready for use.
    pub const READY: ConditionType = ConditionType(Cow::Borrowed("Ready"));

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tri-state condition status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::True => "True",
            Self::False => "False",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timestamped status entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,

    pub status: ConditionStatus,

    /// When `status` last changed.
    pub last_transition_time: DateTime<Utc>,

    /// Machine readable reason for the last update.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    /// Human readable detail for the last update.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// Observed state of an issuer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssuerStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl IssuerStatus {
    /// See [`set_condition`].
    pub fn set_condition(
        &mut self,
        condition_type: ConditionType,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        set_condition(&mut self.conditions, condition_type, status, reason, message, now);
    }

    /// Whether the issuer currently reports `Ready=True`.
    pub fn is_ready(&self) -> bool {
        has_condition(&self.conditions, &ConditionType::READY, ConditionStatus::True)
    }

    pub fn get(&self, condition_type: &ConditionType) -> Option<&Condition> {
        self.conditions.iter().find(|c| &c.condition_type == condition_type)
    }
}

/// Merge a condition into `conditions`.
///
/// - No condition of that type: one is appended with
///   `last_transition_time = now`.
/// - Same type and status: reason and message are replaced, the existing
///   `last_transition_time` is kept.
/// - Same type, different status: the entry is replaced in place with
///   `last_transition_time = now` and the transition is logged.
pub fn set_condition(
    conditions: &mut Vec<Condition>,
    condition_type: ConditionType,
    status: ConditionStatus,
    reason: impl Into<String>,
    message: impl Into<String>,
    now: DateTime<Utc>,
) {
    let mut condition = Condition {
        condition_type,
        status,
        last_transition_time: now,
        reason: reason.into(),
        message: message.into(),
    };

    let Some(existing) =
        conditions.iter_mut().find(|c| c.condition_type == condition.condition_type)
    else {
        conditions.push(condition);
        return;
    };

    if existing.status == condition.status {
        condition.last_transition_time = existing.last_transition_time;
    } else {
        info!(
            condition = %condition.condition_type,
            old_status = %existing.status,
            new_status = %condition.status,
            "found status change for condition; setting lastTransitionTime"
        );
    }

    *existing = condition;
}

/// Whether `conditions` holds an entry with the given type and status.
/// Reason, message and timestamp are ignored.
pub fn has_condition(
    conditions: &[Condition],
    condition_type: &ConditionType,
    status: ConditionStatus,
) -> bool {
    conditions.iter().any(|c| &c.condition_type == condition_type && c.status == status)
}
