use scope_advisor::gate::{
    build_payload, build_payload_with, normalize_payload, validate_payload, GateChannel,
    GateSelection, GateStatus, IssueCode, IssueSeverity, RawPayload, REQUIRED_FIELDS,
    SCOPE_GATE_CONTRACT_VERSION,
};
use scope_advisor::{ScopeClassifier, ScopeMode};
use serde_json::{json, Value};

fn raw(value: Value) -> RawPayload {
    RawPayload::try_from(value).expect("object payload")
}

fn program_classification() -> scope_advisor::ScopeClassification {
    ScopeClassifier::default()
        .classify_value(&json!({
            "description": "Build a multi-tenant platform with migration, security, and cross-team rollout for billing, observability, and compliance.",
            "estimated_timeline_weeks": 14,
            "expected_work_items": 5,
            "dependency_count": 5,
            "integration_surface_count": 4,
            "domain_count": 3,
            "cross_team_count": 3,
            "risk_level": "high",
            "requires_compliance_review": true,
            "requires_migration": true
        }))
        .expect("valid intake")
}

#[test]
fn producer_payload_hands_programs_to_a_program_manager() {
    let classification = program_classification();
    assert_eq!(classification.mode_recommendation, ScopeMode::Program);

    let payload = build_payload(&classification);
    assert_eq!(payload.contract_version, SCOPE_GATE_CONTRACT_VERSION);
    assert_eq!(payload.user_choice, ScopeMode::Program);
    assert!(!payload.override_flag);
    assert_eq!(payload.handoff_owner, "human:program-manager");
    assert_eq!(
        payload.next_action,
        "Decompose program into epics and features before generating tasks."
    );
    assert_eq!(payload.channel, GateChannel::Api);

    let serialized = serde_json::to_value(&payload).expect("payload serializes");
    for field in REQUIRED_FIELDS {
        assert!(serialized.get(field).is_some(), "{field} missing from payload");
    }
    assert!(serialized.get("override_rationale").is_none());
}

#[test]
fn downgrade_override_round_trips_through_the_consumer() {
    let selection = GateSelection {
        override_rationale: Some("Budget approved for one epic only.".to_string()),
        artifacts_created: vec!["specs/042/scope-decision.md".to_string()],
        channel: GateChannel::Cli,
        ..GateSelection::choose(ScopeMode::Epic)
    };
    let (payload, issues) = build_payload_with(&program_classification(), selection);
    assert!(issues.is_empty());
    assert!(payload.override_flag);
    assert_eq!(payload.handoff_owner, "human:planner");

    let (normalized, issues) =
        normalize_payload(&raw(serde_json::to_value(&payload).expect("serializes")), true);
    assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    assert_eq!(normalized, payload);
}

#[test]
fn empty_payload_is_fully_populated() {
    let (payload, issues) = normalize_payload(&raw(json!({})), false);

    assert_eq!(issues.len(), REQUIRED_FIELDS.len());
    for field in REQUIRED_FIELDS {
        assert!(
            issues
                .iter()
                .any(|issue| issue.field == field && issue.code == IssueCode::MissingRequiredField),
            "no missing-field issue for {field}"
        );
    }
    assert_eq!(payload.contract_version, SCOPE_GATE_CONTRACT_VERSION);
    assert_eq!(payload.next_action, "Proceed with feature-level task generation.");
    assert_eq!(payload.validation_status.status, GateStatus::Fail);
    assert_eq!(
        payload.validation_status.blocking_reasons.len(),
        issues.iter().filter(|issue| issue.severity == IssueSeverity::Error).count()
    );
}

#[test]
fn traversal_paths_are_dropped_but_safe_ones_kept() {
    let payload = raw(json!({
        "contract_version": SCOPE_GATE_CONTRACT_VERSION,
        "mode_recommendation": "feature",
        "recommendation_reasons": ["Small change.", "Single team."],
        "user_choice": "feature",
        "override_flag": false,
        "next_action": "Proceed with feature-level task generation.",
        "handoff_owner": "agent:tasks",
        "artifacts_created": ["../../etc/passwd", "specs/001/tasks.md"],
        "validation_status": { "status": "pass", "blocking_reasons": [], "warnings": [] }
    }));

    let (normalized, issues) = normalize_payload(&payload, false);
    assert_eq!(normalized.artifacts_created, vec!["specs/001/tasks.md"]);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].code, IssueCode::InvalidArtifactPath);
}

#[test]
fn strict_mode_only_adds_unknown_field_issues() {
    let payload = raw(json!({
        "mode_recommendation": "epic",
        "user_choice": 3,
        "legacy_score": 41
    }));

    let lenient = validate_payload(&payload, false);
    let strict = validate_payload(&payload, true);

    assert_eq!(strict.len(), lenient.len() + 1);
    assert_eq!(strict[0].code, IssueCode::UnknownField);
    assert_eq!(strict[0].field, "legacy_score");
    assert_eq!(&strict[1..], lenient.as_slice());
    assert!(lenient
        .iter()
        .any(|issue| issue.field == "user_choice" && issue.code == IssueCode::InvalidFieldType));
}

#[test]
fn non_object_payloads_are_rejected_up_front() {
    for value in [json!(null), json!("epic"), json!([1, 2, 3]), json!(42)] {
        assert!(RawPayload::try_from(value).is_err());
    }
}
