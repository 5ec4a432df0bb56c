use serde_json::Value;

use super::normalizer::{clean_artifact_path, normalize_reasons};
use super::{
    ContractIssue, GateChannel, GatePayload, IssueCode, ValidationStatus,
    SCOPE_GATE_CONTRACT_VERSION,
};
use crate::scope::{ScopeClassification, ScopeMode};

pub fn derive_next_action(mode: ScopeMode) -> &'static str {
    match mode {
        ScopeMode::Feature => "Proceed with feature-level task generation.",
        ScopeMode::Epic => "Decompose epic into features before generating tasks.",
        ScopeMode::Program => "Decompose program into epics and features before generating tasks.",
    }
}

pub fn derive_handoff_owner(mode: ScopeMode) -> &'static str {
    match mode {
        ScopeMode::Feature => "agent:tasks",
        ScopeMode::Epic => "human:planner",
        ScopeMode::Program => "human:program-manager",
    }
}

/// Producer-side decisions layered on top of a classification. Unset fields are derived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateSelection {
    pub user_choice: Option<ScopeMode>,
    pub override_rationale: Option<String>,
    pub next_action: Option<String>,
    pub handoff_owner: Option<String>,
    pub artifacts_created: Vec<String>,
    pub channel: GateChannel,
}

impl GateSelection {
    pub fn choose(mode: ScopeMode) -> Self {
        Self {
            user_choice: Some(mode),
            ..Self::default()
        }
    }
}

/// Payload for a classification accepted as recommended.
pub fn build_payload(classification: &ScopeClassification) -> GatePayload {
    build_payload_with(classification, GateSelection::default()).0
}

pub fn build_payload_with(
    classification: &ScopeClassification,
    selection: GateSelection,
) -> (GatePayload, Vec<ContractIssue>) {
    let mut issues = Vec::new();
    let recommendation = classification.mode_recommendation;
    let user_choice = selection.user_choice.unwrap_or(recommendation);

    let reasons = Value::from(classification.recommendation_reasons.clone());
    let recommendation_reasons = normalize_reasons(Some(&reasons), recommendation, &mut issues);

    let next_action = provided_or_derived(
        selection.next_action,
        "next_action",
        derive_next_action(user_choice),
        &mut issues,
    );
    let handoff_owner = provided_or_derived(
        selection.handoff_owner,
        "handoff_owner",
        derive_handoff_owner(user_choice),
        &mut issues,
    );

    let artifacts_created = selection
        .artifacts_created
        .iter()
        .filter_map(|path| clean_artifact_path(path, &mut issues))
        .collect();

    let override_rationale = selection
        .override_rationale
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty());

    let payload = GatePayload {
        contract_version: SCOPE_GATE_CONTRACT_VERSION.to_string(),
        mode_recommendation: recommendation,
        recommendation_reasons,
        user_choice,
        override_flag: user_choice != recommendation,
        override_rationale,
        next_action,
        handoff_owner,
        artifacts_created,
        validation_status: ValidationStatus::from_issues(&issues),
        channel: selection.channel,
    };
    (payload, issues)
}

fn provided_or_derived(
    provided: Option<String>,
    field: &'static str,
    derived: &str,
    issues: &mut Vec<ContractIssue>,
) -> String {
    match provided {
        Some(text) if !text.trim().is_empty() => text.trim().to_string(),
        Some(_) => {
            issues.push(ContractIssue::warning(
                IssueCode::InvalidFieldValue,
                field,
                format!("{field} was blank; the derived value was applied."),
            ));
            derived.to_string()
        }
        None => derived.to_string(),
    }
}
