use std::sync::Arc;
use std::thread;

use scope_advisor::scope::{
    export_rubric, validate_rubric_payload, ScopeErrorKind, SignalKind, RUBRIC_VERSION,
};
use scope_advisor::{ScopeClassifier, ScopeConfig, ScopeMode};
use serde_json::{json, Value};

fn intake() -> Value {
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

#[test]
fn untyped_intake_classifies_as_epic() {
    let classifier = ScopeClassifier::default();
    let result = classifier.classify_value(&intake()).expect("valid intake");

    assert_eq!(result.mode_recommendation, ScopeMode::Epic);
    assert!((35..=64).contains(&result.total_score));
    assert!((2..=3).contains(&result.recommendation_reasons.len()));

    let serialized = serde_json::to_value(&result).expect("classification serializes");
    assert_eq!(serialized["contract_version"], json!("scope-detection.v1"));
    assert_eq!(serialized["mode_recommendation"], json!("epic"));
    assert_eq!(serialized["signals"][6]["name"], json!("risk_level"));
    assert_eq!(serialized["signals"][6]["raw_value"], json!("high"));
    assert_eq!(
        serialized["signals"][9]["raw_value"],
        json!(["cross-team", "migration", "platform"])
    );
}

#[test]
fn intake_errors_distinguish_type_from_value() {
    let classifier = ScopeClassifier::default();

    let mut wrong_type = intake();
    wrong_type["dependency_count"] = json!("three");
    let err = classifier
        .classify_value(&wrong_type)
        .expect_err("string count rejected");
    assert_eq!(err.kind(), ScopeErrorKind::Type);
    assert_eq!(err.field(), Some("dependency_count"));

    let mut wrong_value = intake();
    wrong_value["estimated_timeline_weeks"] = json!(0);
    let err = classifier
        .classify_value(&wrong_value)
        .expect_err("zero weeks rejected");
    assert_eq!(err.kind(), ScopeErrorKind::Value);
    assert_eq!(err.field(), Some("estimated_timeline_weeks"));
}

#[test]
fn shared_classifier_is_consistent_across_threads() {
    let classifier = Arc::new(ScopeClassifier::default());
    let expected = classifier.classify_value(&intake()).expect("valid intake");

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let classifier = Arc::clone(&classifier);
            thread::spawn(move || classifier.classify_value(&intake()).expect("valid intake"))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().expect("thread completes"), expected);
    }
}

#[test]
fn rubric_tracks_the_classifier_configuration() {
    let config = ScopeConfig::from_mapping(&json!({
        "feature_max_score": 40,
        "epic_max_score": 70,
        "keyword_cap": 3
    }))
    .expect("valid mapping");
    let classifier = ScopeClassifier::new(config);

    let rubric = classifier.rubric();
    assert_eq!(rubric.score_bands[0].max_score, 40);
    assert_eq!(rubric.score_bands[1].min_score, 41);
    assert_eq!(rubric.score_bands[2].label, "71+");

    let keywords = rubric
        .dimensions
        .iter()
        .find(|dimension| dimension.name == SignalKind::ComplexityKeywords)
        .expect("keyword dimension");
    assert_eq!(keywords.cap, 3);

    let result = classifier.classify_value(&intake()).expect("valid intake");
    assert_eq!(result.mode_recommendation, ScopeMode::Epic);
    assert_eq!(result.score_band, rubric.score_bands[1].label);

    let exported = serde_json::to_value(export_rubric(classifier.config())).expect("serializes");
    assert!(validate_rubric_payload(&exported, RUBRIC_VERSION).is_empty());
}
