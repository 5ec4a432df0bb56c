use serde_json::{Map, Value};
use tracing::debug;

use super::builder::{derive_handoff_owner, derive_next_action};
use super::{
    is_known_field, json_kind, ContractIssue, GateChannel, GatePayload, GateStatus, IssueCode,
    RawPayload, ValidationStatus, SCOPE_GATE_CONTRACT_VERSION,
};
use crate::scope::ScopeMode;

const MIN_REASONS: usize = 2;
const MAX_REASONS: usize = 3;

/// Turn an untrusted payload into a fully populated [`GatePayload`].
///
/// Never fails: every missing, mistyped, or out-of-domain field falls back to a deterministic
/// default and is reported as a [`ContractIssue`]. `strict` additionally reports each unknown
/// top-level key as a blocking issue.
pub fn normalize_payload(raw: &RawPayload, strict: bool) -> (GatePayload, Vec<ContractIssue>) {
    let mut issues = Vec::new();

    if strict {
        let mut unknown: Vec<&str> = raw.keys().filter(|key| !is_known_field(key)).collect();
        unknown.sort_unstable();
        for key in unknown {
            issues.push(ContractIssue::error(
                IssueCode::UnknownField,
                key,
                format!("Unknown contract field '{key}'."),
            ));
        }
    }

    let mode_recommendation = coerce_mode(
        raw,
        "mode_recommendation",
        ScopeMode::Feature,
        true,
        &mut issues,
    );
    let recommendation_reasons = normalize_reasons(
        raw.present("recommendation_reasons"),
        mode_recommendation,
        &mut issues,
    );
    let user_choice = coerce_mode(raw, "user_choice", mode_recommendation, false, &mut issues);

    let derived_override = user_choice != mode_recommendation;
    let override_flag = match raw.present("override_flag") {
        Some(Value::Bool(flag)) => *flag,
        Some(_) => {
            issues.push(ContractIssue::warning(
                IssueCode::InvalidFieldType,
                "override_flag",
                "override_flag must be a boolean; derived from mode_recommendation vs user_choice.",
            ));
            derived_override
        }
        None => {
            issues.push(ContractIssue::warning(
                IssueCode::MissingRequiredField,
                "override_flag",
                "Missing override_flag; derived from mode_recommendation vs user_choice.",
            ));
            derived_override
        }
    };

    let override_rationale = match raw.present("override_rationale") {
        Some(Value::String(text)) => non_blank(text),
        Some(_) => {
            issues.push(ContractIssue::warning(
                IssueCode::InvalidFieldType,
                "override_rationale",
                "override_rationale must be a string or null; it was dropped.",
            ));
            None
        }
        None => None,
    };

    let next_action = coerce_text(
        raw,
        "next_action",
        derive_next_action(user_choice),
        &mut issues,
    );
    let handoff_owner = coerce_text(
        raw,
        "handoff_owner",
        derive_handoff_owner(user_choice),
        &mut issues,
    );
    let artifacts_created = normalize_artifacts(raw.present("artifacts_created"), &mut issues);
    let channel = coerce_channel(raw.present("channel"), &mut issues);
    normalize_contract_version(raw.present("contract_version"), &mut issues);
    let validation_status =
        normalize_validation_status(raw.present("validation_status"), &mut issues);

    debug!(
        issues = issues.len(),
        strict,
        mode = %mode_recommendation,
        "gate payload normalized"
    );

    let payload = GatePayload {
        contract_version: SCOPE_GATE_CONTRACT_VERSION.to_string(),
        mode_recommendation,
        recommendation_reasons,
        user_choice,
        override_flag,
        override_rationale,
        next_action,
        handoff_owner,
        artifacts_created,
        validation_status,
        channel,
    };
    (payload, issues)
}

/// Issues [`normalize_payload`] would report for `raw`, without the normalized payload.
pub fn validate_payload(raw: &RawPayload, strict: bool) -> Vec<ContractIssue> {
    normalize_payload(raw, strict).1
}

fn coerce_mode(
    raw: &RawPayload,
    field: &'static str,
    fallback: ScopeMode,
    blocking: bool,
    issues: &mut Vec<ContractIssue>,
) -> ScopeMode {
    let issue = |code: IssueCode, message: String| {
        if blocking {
            ContractIssue::error(code, field, message)
        } else {
            ContractIssue::warning(code, field, message)
        }
    };

    match raw.present(field) {
        Some(Value::String(text)) => match ScopeMode::parse(text) {
            Some(mode) => mode,
            None => {
                issues.push(issue(
                    IssueCode::InvalidFieldValue,
                    format!("Invalid {field} '{text}'; fallback '{fallback}' was applied."),
                ));
                fallback
            }
        },
        Some(other) => {
            issues.push(issue(
                IssueCode::InvalidFieldType,
                format!(
                    "{field} must be a string, got {}; fallback '{fallback}' was applied.",
                    json_kind(other)
                ),
            ));
            fallback
        }
        None => {
            issues.push(issue(
                IssueCode::MissingRequiredField,
                format!("Missing {field}; fallback '{fallback}' was applied."),
            ));
            fallback
        }
    }
}

fn coerce_text(
    raw: &RawPayload,
    field: &'static str,
    fallback: &str,
    issues: &mut Vec<ContractIssue>,
) -> String {
    let (code, message) = match raw.present(field) {
        Some(Value::String(text)) => match non_blank(text) {
            Some(trimmed) => return trimmed,
            None => (
                IssueCode::InvalidFieldValue,
                format!("{field} was blank; the derived value was applied."),
            ),
        },
        Some(other) => (
            IssueCode::InvalidFieldType,
            format!(
                "{field} must be a string, got {}; the derived value was applied.",
                json_kind(other)
            ),
        ),
        None => (
            IssueCode::MissingRequiredField,
            format!("Missing {field}; the derived value was applied."),
        ),
    };
    issues.push(ContractIssue::warning(code, field, message));
    fallback.to_string()
}

/// Deterministic pair used whenever the producer's reasons cannot be trusted.
pub(super) fn fallback_reasons(mode: ScopeMode) -> Vec<String> {
    vec![
        "Producer payload did not provide enough valid rationale details.".to_string(),
        format!("Selected mode '{mode}' remains the conservative default under limited context."),
    ]
}

pub(super) fn normalize_reasons(
    value: Option<&Value>,
    mode: ScopeMode,
    issues: &mut Vec<ContractIssue>,
) -> Vec<String> {
    const FIELD: &str = "recommendation_reasons";

    let rejected = |code: IssueCode, message: &str, issues: &mut Vec<ContractIssue>| {
        issues.push(ContractIssue::warning(
            code,
            FIELD,
            format!("{message}; deterministic fallback reasons were applied."),
        ));
        fallback_reasons(mode)
    };

    let items = match value {
        Some(Value::Array(items)) => items,
        Some(_) => {
            return rejected(
                IssueCode::InvalidFieldType,
                "recommendation_reasons must be a list of strings",
                issues,
            )
        }
        None => {
            return rejected(
                IssueCode::MissingRequiredField,
                "Missing recommendation_reasons",
                issues,
            )
        }
    };

    let mut reasons = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(text) => match non_blank(text) {
                Some(reason) => reasons.push(reason),
                None => {
                    return rejected(
                        IssueCode::InvalidFieldValue,
                        "recommendation_reasons contained a blank entry",
                        issues,
                    )
                }
            },
            _ => {
                return rejected(
                    IssueCode::InvalidFieldType,
                    "recommendation_reasons must contain only strings",
                    issues,
                )
            }
        }
    }

    if reasons.len() < MIN_REASONS {
        return rejected(
            IssueCode::InvalidFieldValue,
            "recommendation_reasons needs at least two entries",
            issues,
        );
    }
    if reasons.len() > MAX_REASONS {
        issues.push(ContractIssue::warning(
            IssueCode::InvalidFieldValue,
            FIELD,
            "recommendation_reasons had more than 3 items; truncated to the first 3.",
        ));
        reasons.truncate(MAX_REASONS);
    }
    reasons
}

fn normalize_artifacts(value: Option<&Value>, issues: &mut Vec<ContractIssue>) -> Vec<String> {
    match value {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|entry| match entry {
                Value::String(path) => clean_artifact_path(path, issues),
                other => {
                    issues.push(ContractIssue::warning(
                        IssueCode::InvalidArtifactPath,
                        "artifacts_created",
                        format!("Dropped non-string artifact entry ({}).", json_kind(other)),
                    ));
                    None
                }
            })
            .collect(),
        Some(other) => {
            issues.push(ContractIssue::warning(
                IssueCode::InvalidFieldType,
                "artifacts_created",
                format!(
                    "artifacts_created must be a list of paths, got {}; defaulted to an empty list.",
                    json_kind(other)
                ),
            ));
            Vec::new()
        }
        None => {
            issues.push(ContractIssue::warning(
                IssueCode::MissingRequiredField,
                "artifacts_created",
                "Missing artifacts_created; defaulted to an empty list.",
            ));
            Vec::new()
        }
    }
}

/// Relative artifact path with `.` and empty segments collapsed, or `None` when it is dropped.
pub(super) fn clean_artifact_path(raw: &str, issues: &mut Vec<ContractIssue>) -> Option<String> {
    let trimmed = raw.trim();
    let segments: Vec<&str> = trimmed
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();

    if segments.is_empty() {
        issues.push(ContractIssue::warning(
            IssueCode::InvalidArtifactPath,
            "artifacts_created",
            "Dropped empty artifact path entry.",
        ));
        return None;
    }

    if is_absolute(trimmed) || segments.contains(&"..") {
        issues.push(ContractIssue::error(
            IssueCode::InvalidArtifactPath,
            "artifacts_created",
            format!("Dropped unsafe artifact path '{trimmed}' (absolute or traversal)."),
        ));
        return None;
    }

    Some(segments.join("/"))
}

fn is_absolute(path: &str) -> bool {
    if path.starts_with(['/', '\\']) {
        return true;
    }
    let mut chars = path.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(drive), Some(':')) if drive.is_ascii_alphabetic()
    )
}

fn coerce_channel(value: Option<&Value>, issues: &mut Vec<ContractIssue>) -> GateChannel {
    let fallback = GateChannel::default();
    match value {
        None => fallback,
        Some(Value::String(text)) => GateChannel::parse(text).unwrap_or_else(|| {
            issues.push(ContractIssue::warning(
                IssueCode::InvalidFieldValue,
                "channel",
                format!("Invalid channel '{text}'; fallback '{fallback}' was applied."),
            ));
            fallback
        }),
        Some(other) => {
            issues.push(ContractIssue::warning(
                IssueCode::InvalidFieldType,
                "channel",
                format!(
                    "channel must be a string, got {}; fallback '{fallback}' was applied.",
                    json_kind(other)
                ),
            ));
            fallback
        }
    }
}

fn normalize_contract_version(value: Option<&Value>, issues: &mut Vec<ContractIssue>) {
    let (code, message) = match value {
        Some(Value::String(text)) if text.trim() == SCOPE_GATE_CONTRACT_VERSION => return,
        Some(Value::String(text)) => (
            IssueCode::InvalidFieldValue,
            format!(
                "Unsupported contract_version '{}'; normalized to {SCOPE_GATE_CONTRACT_VERSION}.",
                text.trim()
            ),
        ),
        Some(other) => (
            IssueCode::InvalidFieldType,
            format!(
                "contract_version must be a string, got {}; defaulted to {SCOPE_GATE_CONTRACT_VERSION}.",
                json_kind(other)
            ),
        ),
        None => (
            IssueCode::MissingRequiredField,
            format!("Missing contract_version; defaulted to {SCOPE_GATE_CONTRACT_VERSION}."),
        ),
    };
    issues.push(ContractIssue::warning(code, "contract_version", message));
}

/// Producer-supplied status when well formed; otherwise derived from `issues`, including the
/// issue recorded for the status itself.
fn normalize_validation_status(
    value: Option<&Value>,
    issues: &mut Vec<ContractIssue>,
) -> ValidationStatus {
    const FIELD: &str = "validation_status";

    let (code, message) = match value {
        Some(Value::Object(fields)) => match parse_validation_status(fields) {
            Some(status) => return status,
            None => (
                IssueCode::InvalidFieldValue,
                "Invalid validation_status shape; derived from contract issues.".to_string(),
            ),
        },
        Some(other) => (
            IssueCode::InvalidFieldType,
            format!(
                "validation_status must be an object, got {}; derived from contract issues.",
                json_kind(other)
            ),
        ),
        None => (
            IssueCode::MissingRequiredField,
            "Missing validation_status; derived from contract issues.".to_string(),
        ),
    };
    issues.push(ContractIssue::warning(code, FIELD, message));
    ValidationStatus::from_issues(issues)
}

fn parse_validation_status(fields: &Map<String, Value>) -> Option<ValidationStatus> {
    let status = fields
        .get("status")
        .and_then(Value::as_str)
        .and_then(GateStatus::parse)?;

    let messages = |key: &str| -> Option<Vec<String>> {
        match fields.get(key) {
            None | Some(Value::Null) => Some(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(|text| text.trim().to_string()))
                .collect(),
            Some(_) => None,
        }
    };

    Some(ValidationStatus {
        status,
        blocking_reasons: messages("blocking_reasons")?,
        warnings: messages("warnings")?,
    })
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
