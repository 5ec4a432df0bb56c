use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ScopeClassification, ScopeClassifier};
use crate::gate::{normalize_payload, validate_payload, ContractIssue, GatePayload, RawPayload};

/// Router exposing classification, rubric export, and gate payload checks.
pub fn scope_router(classifier: Arc<ScopeClassifier>) -> Router {
    Router::new()
        .route("/api/v1/scope/classify", post(classify_handler))
        .route("/api/v1/scope/rubric", get(rubric_handler))
        .route("/api/v1/scope/gate/normalize", post(normalize_handler))
        .route("/api/v1/scope/gate/validate", post(validate_handler))
        .with_state(classifier)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifyResponse {
    pub classification: ScopeClassification,
    pub gate_payload: GatePayload,
}

#[derive(Debug, Serialize)]
pub struct NormalizeResponse {
    pub payload: GatePayload,
    pub issues: Vec<ContractIssue>,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub issues: Vec<ContractIssue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GateQuery {
    #[serde(default)]
    strict: bool,
}

pub(crate) async fn classify_handler(
    State(classifier): State<Arc<ScopeClassifier>>,
    Json(intake): Json<Value>,
) -> Response {
    match classifier.classify_with_payload(&intake) {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(error) => {
            let payload = json!({
                "error": error.to_string(),
                "kind": error.kind(),
                "field": error.field(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn rubric_handler(State(classifier): State<Arc<ScopeClassifier>>) -> Response {
    (StatusCode::OK, Json(classifier.rubric())).into_response()
}

pub(crate) async fn normalize_handler(
    Query(query): Query<GateQuery>,
    Json(body): Json<Value>,
) -> Response {
    match RawPayload::try_from(body) {
        Ok(raw) => {
            let (payload, issues) = normalize_payload(&raw, query.strict);
            (StatusCode::OK, Json(NormalizeResponse { payload, issues })).into_response()
        }
        Err(error) => bad_request(error),
    }
}

pub(crate) async fn validate_handler(
    Query(query): Query<GateQuery>,
    Json(body): Json<Value>,
) -> Response {
    match RawPayload::try_from(body) {
        Ok(raw) => {
            let issues = validate_payload(&raw, query.strict);
            let valid = !issues.iter().any(ContractIssue::is_blocking);
            (StatusCode::OK, Json(ValidateResponse { valid, issues })).into_response()
        }
        Err(error) => bad_request(error),
    }
}

fn bad_request(error: impl std::fmt::Display) -> Response {
    let payload = json!({ "error": error.to_string() });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}
