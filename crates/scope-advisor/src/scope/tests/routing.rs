use super::common::*;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::scope::{scope_router, ScopeClassifier};

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let router = scope_router(Arc::new(ScopeClassifier::default()));
    let response = router.oneshot(request).await.expect("route executes");
    let status = response.status();
    (status, read_json_body(response).await)
}

#[tokio::test]
async fn classify_route_returns_classification_and_gate_payload() {
    let (status, body) = send(post_json(
        "/api/v1/scope/classify",
        &cross_team_migration_json(),
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["classification"]["mode_recommendation"], json!("epic"));
    assert_eq!(body["classification"]["total_score"], json!(58));
    assert_eq!(body["gate_payload"]["handoff_owner"], json!("human:planner"));
    assert_eq!(body["gate_payload"]["validation_status"]["status"], json!("pass"));
}

#[tokio::test]
async fn classify_route_serves_the_shared_classification_helper() {
    let expected = ScopeClassifier::default()
        .classify_with_payload(&cross_team_migration_json())
        .expect("intake classifies");

    let (status, body) = send(post_json(
        "/api/v1/scope/classify",
        &cross_team_migration_json(),
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::to_value(&expected).expect("response serializes"));
}

#[tokio::test]
async fn classify_route_rejects_non_canonical_risk_labels() {
    let mut intake = cross_team_migration_json();
    intake["risk_level"] = json!("HIGH");

    let (status, body) = send(post_json("/api/v1/scope/classify", &intake)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], json!("value"));
    assert_eq!(body["field"], json!("risk_level"));
}

#[tokio::test]
async fn classify_route_rejects_out_of_domain_intake() {
    let mut intake = cross_team_migration_json();
    intake["risk_level"] = json!("extreme");

    let (status, body) = send(post_json("/api/v1/scope/classify", &intake)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], json!("value"));
    assert_eq!(body["field"], json!("risk_level"));
}

#[tokio::test]
async fn rubric_route_exports_default_bands() {
    let request = Request::get("/api/v1/scope/rubric")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rubric_version"], json!("v1"));
    assert_eq!(body["score_bands"][0]["max_score"], json!(34));
    assert_eq!(body["score_bands"][2]["label"], json!("65+"));
    assert_eq!(body["dimensions"].as_array().map(Vec::len), Some(10));
}

#[tokio::test]
async fn normalize_route_fills_an_empty_payload() {
    let (status, body) = send(post_json("/api/v1/scope/gate/normalize", &json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payload"]["user_choice"], json!("feature"));
    assert_eq!(body["issues"].as_array().map(Vec::len), Some(9));
}

#[tokio::test]
async fn validate_route_blocks_unknown_fields_in_strict_mode() {
    let (_, lenient) = send(post_json(
        "/api/v1/scope/gate/validate",
        &json!({ "mode_recommendation": "feature", "extra": 1 }),
    ))
    .await;
    assert_eq!(lenient["valid"], json!(true));

    let (status, strict) = send(post_json(
        "/api/v1/scope/gate/validate?strict=true",
        &json!({ "mode_recommendation": "feature", "extra": 1 }),
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(strict["valid"], json!(false));
    assert!(strict["issues"]
        .as_array()
        .expect("issue list")
        .iter()
        .any(|issue| issue["code"] == json!("unknown_field") && issue["field"] == json!("extra")));
}

#[tokio::test]
async fn gate_routes_reject_non_object_bodies() {
    let (status, body) = send(post_json(
        "/api/v1/scope/gate/normalize",
        &json!(["feature"]),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap_or_default()
        .contains("JSON object"));
}
