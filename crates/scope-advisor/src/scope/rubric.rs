//! Read-only rubric projection of a [`ScopeConfig`] and a structural validator for
//! rubric-shaped documents produced elsewhere.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::config::{ScopeConfig, ScoreBand, SignalWeight};
use super::input::RiskLevel;
use super::signals::SignalKind;
use super::{ScopeMode, CONTRACT_VERSION};

pub const RUBRIC_VERSION: &str = "v1";

const V1_BAND_COUNT: usize = 3;

/// One scored dimension as documented for external tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricDimension {
    pub name: SignalKind,
    pub input_field: String,
    pub formula: String,
    pub weight: u32,
    pub cap: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricScoreBand {
    pub mode: ScopeMode,
    pub label: String,
    pub min_score: u32,
    pub max_score: u32,
}

impl From<ScoreBand> for RubricScoreBand {
    fn from(band: ScoreBand) -> Self {
        Self {
            mode: band.mode,
            label: band.label(),
            min_score: band.min_score,
            max_score: band.max_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceRubric {
    pub baseline: f64,
    pub boundary_distance_threshold: u32,
    pub boundary_penalty: f64,
}

/// Versioned table of the weights, caps, and bands a classifier applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricDescription {
    pub rubric_version: String,
    pub contract_version: String,
    pub max_total_score: u32,
    pub dimensions: Vec<RubricDimension>,
    pub score_bands: Vec<RubricScoreBand>,
    pub risk_weights: BTreeMap<String, u32>,
    pub complexity_keywords: Vec<String>,
    pub confidence: ConfidenceRubric,
}

/// Problem found in a rubric-shaped document; `path` locates the offending node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricIssue {
    pub path: String,
    pub message: String,
}

fn issue(path: impl Into<String>, message: impl Into<String>) -> RubricIssue {
    RubricIssue {
        path: path.into(),
        message: message.into(),
    }
}

/// Project `config` into its rubric. Every number is read from the same instance the
/// classifier scores with.
pub fn export_rubric(config: &ScopeConfig) -> RubricDescription {
    let risk_weights = config.risk_weights();
    let scaled = |kind: SignalKind, formula: &str, weight: SignalWeight| RubricDimension {
        name: kind,
        input_field: kind.input_field().to_string(),
        formula: formula.to_string(),
        weight: weight.multiplier,
        cap: weight.cap,
    };
    let fixed = |kind: SignalKind, formula: &str, weight: u32, cap: u32| RubricDimension {
        name: kind,
        input_field: kind.input_field().to_string(),
        formula: formula.to_string(),
        weight,
        cap,
    };

    let dimensions = vec![
        scaled(
            SignalKind::TimelineWeeks,
            "max(0, estimated_timeline_weeks - 1) * weight",
            config.timeline(),
        ),
        scaled(
            SignalKind::ExpectedWorkItems,
            "max(0, expected_work_items - 1) * weight",
            config.work_items(),
        ),
        scaled(
            SignalKind::DependencyCount,
            "dependency_count * weight",
            config.dependency(),
        ),
        scaled(
            SignalKind::IntegrationSurfaceCount,
            "integration_surface_count * weight",
            config.integration(),
        ),
        scaled(
            SignalKind::DomainCount,
            "max(0, domain_count - 1) * weight",
            config.domain(),
        ),
        scaled(
            SignalKind::CrossTeamCount,
            "max(0, cross_team_count - 1) * weight",
            config.cross_team(),
        ),
        fixed(
            SignalKind::RiskLevel,
            "risk_weights[risk_level]",
            1,
            risk_weights.max_weight(),
        ),
        fixed(
            SignalKind::RequiresComplianceReview,
            "weight if requires_compliance_review else 0",
            config.compliance_score(),
            config.compliance_score(),
        ),
        fixed(
            SignalKind::RequiresMigration,
            "weight if requires_migration else 0",
            config.migration_score(),
            config.migration_score(),
        ),
        fixed(
            SignalKind::ComplexityKeywords,
            "count of distinct complexity keywords matched as whole words in description",
            1,
            config.keyword_cap(),
        ),
    ];

    RubricDescription {
        rubric_version: RUBRIC_VERSION.to_string(),
        contract_version: CONTRACT_VERSION.to_string(),
        max_total_score: config.max_total_score(),
        dimensions,
        score_bands: config
            .score_bands()
            .into_iter()
            .map(RubricScoreBand::from)
            .collect(),
        risk_weights: RiskLevel::ALL
            .into_iter()
            .map(|level| (level.as_str().to_string(), risk_weights.weight_for(level)))
            .collect(),
        complexity_keywords: config.complexity_keywords().iter().cloned().collect(),
        confidence: ConfidenceRubric {
            baseline: config.confidence_baseline(),
            boundary_distance_threshold: config.boundary_distance_threshold(),
            boundary_penalty: config.boundary_penalty(),
        },
    }
}

/// Check a rubric-shaped document against the layout of `version`, collecting every problem.
pub fn validate_rubric_payload(payload: &Value, version: &str) -> Vec<RubricIssue> {
    let mut issues = Vec::new();

    if version != RUBRIC_VERSION {
        issues.push(issue("$", format!("unsupported rubric version '{version}'")));
        return issues;
    }

    let Some(object) = payload.as_object() else {
        issues.push(issue("$", "rubric payload must be an object"));
        return issues;
    };

    match object.get("rubric_version") {
        Some(Value::String(declared)) if declared == version => {}
        Some(Value::String(declared)) => issues.push(issue(
            "rubric_version",
            format!("expected '{version}', found '{declared}'"),
        )),
        Some(_) => issues.push(issue("rubric_version", "must be a string")),
        None => issues.push(issue("rubric_version", "is required")),
    }

    if let Some(items) = required_array(object, "dimensions", &mut issues) {
        check_dimensions(items, &mut issues);
    }
    if let Some(items) = required_array(object, "score_bands", &mut issues) {
        check_bands(items, &mut issues);
    }

    issues
}

fn required_array<'a>(
    object: &'a Map<String, Value>,
    field: &str,
    issues: &mut Vec<RubricIssue>,
) -> Option<&'a Vec<Value>> {
    match object.get(field) {
        Some(Value::Array(items)) => Some(items),
        Some(_) => {
            issues.push(issue(field, "must be an array"));
            None
        }
        None => {
            issues.push(issue(field, "is required"));
            None
        }
    }
}

fn check_dimensions(items: &[Value], issues: &mut Vec<RubricIssue>) {
    if items.is_empty() {
        issues.push(issue("dimensions", "must list at least one dimension"));
        return;
    }

    let mut seen = HashSet::new();
    for (index, item) in items.iter().enumerate() {
        let prefix = format!("dimensions[{index}]");
        let Some(dimension) = item.as_object() else {
            issues.push(issue(prefix, "must be an object"));
            continue;
        };

        for field in ["name", "input_field", "formula"] {
            expect_text(dimension, &prefix, field, issues);
        }
        for field in ["weight", "cap"] {
            expect_count(dimension, &prefix, field, issues);
        }

        if let Some(Value::String(name)) = dimension.get("name") {
            if !seen.insert(name.as_str()) {
                issues.push(issue(
                    format!("{prefix}.name"),
                    format!("duplicate dimension name '{name}'"),
                ));
            }
        }
    }
}

fn check_bands(items: &[Value], issues: &mut Vec<RubricIssue>) {
    if items.len() != V1_BAND_COUNT {
        issues.push(issue(
            "score_bands",
            format!(
                "expected exactly {V1_BAND_COUNT} score bands, found {}",
                items.len()
            ),
        ));
    }

    let mut previous_max: Option<u64> = None;
    for (index, item) in items.iter().enumerate() {
        let prefix = format!("score_bands[{index}]");
        let Some(band) = item.as_object() else {
            issues.push(issue(prefix, "must be an object"));
            previous_max = None;
            continue;
        };

        match band.get("mode").and_then(Value::as_str) {
            Some(mode) => match ScopeMode::parse(mode) {
                Some(parsed) if ScopeMode::ALL.get(index) != Some(&parsed) => issues.push(issue(
                    format!("{prefix}.mode"),
                    format!("band '{mode}' is out of order"),
                )),
                Some(_) => {}
                None => issues.push(issue(
                    format!("{prefix}.mode"),
                    format!("unknown mode '{mode}'"),
                )),
            },
            None => issues.push(issue(format!("{prefix}.mode"), "must be a string")),
        }

        let min = expect_count(band, &prefix, "min_score", issues);
        let max = expect_count(band, &prefix, "max_score", issues);

        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                issues.push(issue(
                    prefix.clone(),
                    format!("min_score {min} exceeds max_score {max}"),
                ));
            }
            if let Some(previous) = previous_max {
                if min != previous + 1 {
                    issues.push(issue(
                        format!("{prefix}.min_score"),
                        format!("band must start at {} to stay contiguous", previous + 1),
                    ));
                }
            }
        }
        previous_max = max;
    }
}

fn expect_text(
    object: &Map<String, Value>,
    prefix: &str,
    field: &str,
    issues: &mut Vec<RubricIssue>,
) {
    match object.get(field) {
        Some(Value::String(text)) if !text.trim().is_empty() => {}
        Some(_) => issues.push(issue(
            format!("{prefix}.{field}"),
            "must be a non-empty string",
        )),
        None => issues.push(issue(format!("{prefix}.{field}"), "is required")),
    }
}

fn expect_count(
    object: &Map<String, Value>,
    prefix: &str,
    field: &str,
    issues: &mut Vec<RubricIssue>,
) -> Option<u64> {
    match object.get(field) {
        Some(value) => {
            let count = value.as_u64();
            if count.is_none() {
                issues.push(issue(
                    format!("{prefix}.{field}"),
                    "must be a non-negative integer",
                ));
            }
            count
        }
        None => {
            issues.push(issue(format!("{prefix}.{field}"), "is required"));
            None
        }
    }
}
