//! Gate consumption contract.
//!
//! Producers turn a [`ScopeClassification`](crate::scope::ScopeClassification) into a
//! [`GatePayload`] with [`build_payload`]; consumers receiving a payload from an untrusted or
//! older producer run it through [`normalize_payload`], which never fails and reports every
//! problem as a [`ContractIssue`].

mod builder;
mod normalizer;

pub use builder::{
    build_payload, build_payload_with, derive_handoff_owner, derive_next_action, GateSelection,
};
pub use normalizer::{normalize_payload, validate_payload};

use crate::scope::ScopeMode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub const SCOPE_GATE_CONTRACT_VERSION: &str = "scope-gate-consumption.v1";

/// Keys every well-formed payload carries.
pub const REQUIRED_FIELDS: [&str; 9] = [
    "contract_version",
    "mode_recommendation",
    "recommendation_reasons",
    "user_choice",
    "override_flag",
    "next_action",
    "handoff_owner",
    "artifacts_created",
    "validation_status",
];

/// Keys accepted alongside [`REQUIRED_FIELDS`]. `contract_issues` is emitted by older producers
/// and ignored on input.
pub const OPTIONAL_FIELDS: [&str; 3] = ["override_rationale", "channel", "contract_issues"];

pub fn is_known_field(key: &str) -> bool {
    REQUIRED_FIELDS.contains(&key) || OPTIONAL_FIELDS.contains(&key)
}

/// Surface the payload was produced on or is consumed by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateChannel {
    Cli,
    Tty,
    #[default]
    Api,
}

impl GateChannel {
    pub const ALL: [GateChannel; 3] = [GateChannel::Cli, GateChannel::Tty, GateChannel::Api];

    pub fn as_str(self) -> &'static str {
        match self {
            GateChannel::Cli => "cli",
            GateChannel::Tty => "tty",
            GateChannel::Api => "api",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|channel| channel.as_str() == normalized)
    }
}

impl fmt::Display for GateChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    MissingRequiredField,
    InvalidFieldType,
    InvalidFieldValue,
    InvalidArtifactPath,
    UnknownField,
}

impl IssueCode {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueCode::MissingRequiredField => "missing_required_field",
            IssueCode::InvalidFieldType => "invalid_field_type",
            IssueCode::InvalidFieldValue => "invalid_field_value",
            IssueCode::InvalidArtifactPath => "invalid_artifact_path",
            IssueCode::UnknownField => "unknown_field",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Warning,
    Error,
}

/// One problem found while building, normalizing, or validating a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractIssue {
    pub code: IssueCode,
    pub field: String,
    pub message: String,
    pub severity: IssueSeverity,
}

impl ContractIssue {
    pub fn warning(code: IssueCode, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            field: field.into(),
            message: message.into(),
            severity: IssueSeverity::Warning,
        }
    }

    pub fn error(code: IssueCode, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            field: field.into(),
            message: message.into(),
            severity: IssueSeverity::Error,
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == IssueSeverity::Error
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    Pass,
    Fail,
}

impl GateStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pass" => Some(GateStatus::Pass),
            "fail" => Some(GateStatus::Fail),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStatus {
    pub status: GateStatus,
    pub blocking_reasons: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationStatus {
    /// `fail` iff any issue is blocking; messages are split by severity in issue order.
    pub fn from_issues(issues: &[ContractIssue]) -> Self {
        let (blocking, advisory): (Vec<&ContractIssue>, Vec<&ContractIssue>) =
            issues.iter().partition(|issue| issue.is_blocking());

        Self {
            status: if blocking.is_empty() {
                GateStatus::Pass
            } else {
                GateStatus::Fail
            },
            blocking_reasons: blocking.iter().map(|issue| issue.message.clone()).collect(),
            warnings: advisory.iter().map(|issue| issue.message.clone()).collect(),
        }
    }

    pub fn passed(&self) -> bool {
        self.status == GateStatus::Pass
    }
}

/// Fully populated, typed gate payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatePayload {
    pub contract_version: String,
    pub mode_recommendation: ScopeMode,
    pub recommendation_reasons: Vec<String>,
    pub user_choice: ScopeMode,
    pub override_flag: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_rationale: Option<String>,
    pub next_action: String,
    pub handoff_owner: String,
    pub artifacts_created: Vec<String>,
    pub validation_status: ValidationStatus,
    #[serde(default)]
    pub channel: GateChannel,
}

#[derive(Debug, thiserror::Error)]
pub enum RawPayloadError {
    #[error("gate payload must be a JSON object, got {found}")]
    NotAnObject { found: &'static str },
}

/// Untyped payload as received from a producer. Only [`normalize_payload`] turns it into a
/// [`GatePayload`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPayload(Map<String, Value>);

impl RawPayload {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Present, non-null value for `key`.
    pub(crate) fn present(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| !value.is_null())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<Map<String, Value>> for RawPayload {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl TryFrom<Value> for RawPayload {
    type Error = RawPayloadError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(RawPayloadError::NotAnObject {
                found: json_kind(&other),
            }),
        }
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_payload_rejects_non_objects() {
        let err = RawPayload::try_from(json!(["feature"])).expect_err("arrays are rejected");
        assert_eq!(
            err.to_string(),
            "gate payload must be a JSON object, got array"
        );
        assert!(RawPayload::try_from(json!({})).is_ok());
    }

    #[test]
    fn derived_status_fails_only_on_blocking_issues() {
        let warning = ContractIssue::warning(IssueCode::MissingRequiredField, "user_choice", "w");
        let status = ValidationStatus::from_issues(&[warning.clone()]);
        assert!(status.passed());
        assert_eq!(status.warnings, vec!["w"]);

        let error = ContractIssue::error(IssueCode::UnknownField, "extra", "e");
        let status = ValidationStatus::from_issues(&[warning, error]);
        assert_eq!(status.status, GateStatus::Fail);
        assert_eq!(status.blocking_reasons, vec!["e"]);
    }

    #[test]
    fn known_fields_cover_required_and_optional_keys() {
        assert!(is_known_field("validation_status"));
        assert!(is_known_field("contract_issues"));
        assert!(!is_known_field("legacy_notes"));
    }
}
