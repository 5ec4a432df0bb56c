use crate::infra::shared_classifier;
use clap::Args;
use scope_advisor::config::AppConfig;
use scope_advisor::error::AppError;
use scope_advisor::gate::{normalize_payload, validate_payload, RawPayload};
use scope_advisor::scope::router::{ClassifyResponse, NormalizeResponse, ValidateResponse};
use scope_advisor::scope::{validate_rubric_payload, RUBRIC_VERSION};
use scope_advisor::ScopeClassifier;
use serde::Serialize;
use serde_json::{json, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Args, Debug)]
pub(crate) struct ClassifyArgs {
    /// JSON intake document (`-` reads stdin)
    #[arg(long)]
    pub(crate) input: PathBuf,
}

#[derive(Args, Debug, Default)]
pub(crate) struct RubricArgs {
    /// Check an existing rubric document instead of printing the current one
    #[arg(long)]
    pub(crate) check: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct GateArgs {
    /// JSON gate payload (`-` reads stdin)
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Report keys outside the contract as errors
    #[arg(long)]
    pub(crate) strict: bool,
}

pub(crate) fn run_classify(config: &AppConfig, args: ClassifyArgs) -> Result<(), AppError> {
    let classifier = shared_classifier(config)?;
    let intake = read_document(&args.input)?;
    let response = classify_document(&classifier, &intake)?;
    info!(
        mode = %response.classification.mode_recommendation,
        total_score = response.classification.total_score,
        "intake classified"
    );
    print_json(&response)
}

pub(crate) fn run_rubric(config: &AppConfig, args: RubricArgs) -> Result<(), AppError> {
    match args.check {
        Some(path) => {
            let document = read_document(&path)?;
            print_json(&check_rubric(&document))
        }
        None => {
            let classifier = shared_classifier(config)?;
            print_json(&classifier.rubric())
        }
    }
}

pub(crate) fn run_gate_normalize(args: GateArgs) -> Result<(), AppError> {
    let document = read_document(&args.input)?;
    print_json(&normalize_document(document, args.strict)?)
}

pub(crate) fn run_gate_validate(args: GateArgs) -> Result<(), AppError> {
    let document = read_document(&args.input)?;
    print_json(&validate_document(document, args.strict)?)
}

pub(crate) fn classify_document(
    classifier: &ScopeClassifier,
    intake: &Value,
) -> Result<ClassifyResponse, AppError> {
    Ok(classifier.classify_with_payload(intake)?)
}

pub(crate) fn normalize_document(
    document: Value,
    strict: bool,
) -> Result<NormalizeResponse, AppError> {
    let raw = RawPayload::try_from(document)?;
    let (payload, issues) = normalize_payload(&raw, strict);
    Ok(NormalizeResponse { payload, issues })
}

pub(crate) fn validate_document(
    document: Value,
    strict: bool,
) -> Result<ValidateResponse, AppError> {
    let raw = RawPayload::try_from(document)?;
    let issues = validate_payload(&raw, strict);
    let valid = !issues.iter().any(|issue| issue.is_blocking());
    Ok(ValidateResponse { valid, issues })
}

pub(crate) fn check_rubric(document: &Value) -> Value {
    let issues = validate_rubric_payload(document, RUBRIC_VERSION);
    json!({
        "rubric_version": RUBRIC_VERSION,
        "valid": issues.is_empty(),
        "issues": issues,
    })
}

pub(crate) fn read_document(path: &Path) -> Result<Value, AppError> {
    let contents = if path.as_os_str() == "-" {
        io::read_to_string(io::stdin())?
    } else {
        fs::read_to_string(path)?
    };
    debug!(path = %path.display(), bytes = contents.len(), "input document read");
    Ok(serde_json::from_str(&contents)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use scope_advisor::gate::{GateStatus, IssueCode};
    use scope_advisor::{ScopeConfig, ScopeMode};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_document(value: &Value) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        write!(file, "{value}").expect("document written");
        file
    }

    fn feature_intake() -> Value {
        json!({
            "description": "Add a CSV export button to the report page",
            "estimated_timeline_weeks": 1,
            "expected_work_items": 2,
            "dependency_count": 0,
            "integration_surface_count": 0,
            "domain_count": 1,
            "cross_team_count": 1,
            "risk_level": "low",
            "requires_compliance_review": false,
            "requires_migration": false
        })
    }

    #[test]
    fn classify_reads_intake_from_disk() {
        let file = write_document(&feature_intake());
        let intake = read_document(file.path()).expect("document parses");

        let response =
            classify_document(&ScopeClassifier::default(), &intake).expect("intake classifies");
        assert_eq!(
            response.classification.mode_recommendation,
            ScopeMode::Feature
        );
        assert_eq!(response.gate_payload.handoff_owner, "agent:tasks");
        assert!(response.gate_payload.validation_status.passed());

        let served = ScopeClassifier::default()
            .classify_with_payload(&intake)
            .expect("intake classifies");
        assert_eq!(response, served);
    }

    #[test]
    fn classify_surfaces_intake_errors() {
        let mut intake = feature_intake();
        intake["risk_level"] = json!("extreme");

        let err = classify_document(&ScopeClassifier::default(), &intake)
            .map(|_| ())
            .expect_err("unknown risk level rejected");
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn unreadable_documents_are_reported() {
        let missing = read_document(Path::new("does/not/exist.json")).expect_err("missing file");
        assert!(matches!(missing, AppError::Io(_)));

        let mut file = NamedTempFile::new().expect("temp file");
        write!(file, "{{ not json").expect("document written");
        let malformed = read_document(file.path()).expect_err("malformed json");
        assert!(matches!(malformed, AppError::Json(_)));
    }

    #[test]
    fn gate_commands_share_issue_lists() {
        let document = json!({ "mode_recommendation": "epic", "extra": true });

        let normalized = normalize_document(document.clone(), true).expect("object payload");
        let validated = validate_document(document, true).expect("object payload");

        assert_eq!(normalized.issues, validated.issues);
        assert_eq!(normalized.issues[0].code, IssueCode::UnknownField);
        assert_eq!(normalized.payload.user_choice, ScopeMode::Epic);
        assert_eq!(normalized.payload.validation_status.status, GateStatus::Fail);
        assert!(!validated.valid);
    }

    #[test]
    fn gate_commands_reject_non_objects() {
        let err = validate_document(json!(["epic"]), false)
            .map(|_| ())
            .expect_err("arrays rejected");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn rubric_check_reports_version_drift() {
        let classifier = ScopeClassifier::new(ScopeConfig::default());
        let mut rubric = serde_json::to_value(classifier.rubric()).expect("rubric serializes");
        assert_eq!(check_rubric(&rubric)["valid"], json!(true));

        rubric["rubric_version"] = json!("v0");
        let report = check_rubric(&rubric);
        assert_eq!(report["valid"], json!(false));
        assert_eq!(report["issues"][0]["path"], json!("rubric_version"));
    }
}
