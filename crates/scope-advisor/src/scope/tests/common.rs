use axum::response::Response;
use serde_json::{json, Value};

use crate::scope::{RiskLevel, ScopeInput};

/// Intake with every count set explicitly, flags cleared.
pub(super) fn sized(description: &str, risk_level: RiskLevel, counts: [i64; 6]) -> ScopeInput {
    let [weeks, items, dependencies, integrations, domains, teams] = counts;
    ScopeInput {
        description: description.to_string(),
        estimated_timeline_weeks: weeks,
        expected_work_items: items,
        dependency_count: dependencies,
        integration_surface_count: integrations,
        domain_count: domains,
        cross_team_count: teams,
        risk_level,
        requires_compliance_review: false,
        requires_migration: false,
    }
}

/// Scores exactly 58 under the default configuration.
pub(super) fn cross_team_migration() -> ScopeInput {
    let mut input = sized(
        "Cross-team platform migration",
        RiskLevel::High,
        [10, 8, 3, 2, 2, 3],
    );
    input.requires_migration = true;
    input
}

pub(super) fn cross_team_migration_json() -> Value {
    json!({
        "description": "Cross-team platform migration",
        "estimated_timeline_weeks": 10,
        "expected_work_items": 8,
        "dependency_count": 3,
        "integration_surface_count": 2,
        "domain_count": 2,
        "cross_team_count": 3,
        "risk_level": "high",
        "requires_compliance_review": false,
        "requires_migration": true
    })
}

/// Scores 34, or 35 with `audit` appended to the description.
pub(super) fn feature_edge(with_audit: bool) -> ScopeInput {
    let description = if with_audit {
        "Improve search with simple audit filters."
    } else {
        "Improve search with simple state filters."
    };
    sized(description, RiskLevel::Low, [9, 4, 3, 2, 2, 2])
}

/// Scores 64, or 65 with `audit` appended to the description.
pub(super) fn epic_edge(with_audit: bool) -> ScopeInput {
    let description = if with_audit {
        "platform migration rollout integration audit"
    } else {
        "platform migration rollout integration"
    };
    sized(description, RiskLevel::Medium, [12, 8, 5, 4, 3, 3])
}

/// Scores 80 with nine keyword hits capped at eight.
pub(super) fn multi_tenant_program() -> ScopeInput {
    let mut input = sized(
        "Build a multi-tenant platform with migration, security, and cross-team rollout for billing, observability, and compliance.",
        RiskLevel::High,
        [14, 5, 5, 4, 3, 3],
    );
    input.requires_compliance_review = true;
    input.requires_migration = true;
    input
}

pub(super) fn minimal(description: &str) -> ScopeInput {
    ScopeInput::new(description, RiskLevel::Low)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
