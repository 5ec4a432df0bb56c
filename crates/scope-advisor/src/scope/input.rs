use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Declared delivery risk for an initiative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// Exact wire label only; other spellings are rejected rather than coerced.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.as_str() == value)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a rejected intake had the wrong shape or an out-of-domain value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeErrorKind {
    Type,
    Value,
}

/// Intake rejection raised before any scoring happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("scope intake must be a JSON object")]
    NotAnObject,
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("{field} must be {expected}")]
    InvalidType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("{field} {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ScopeError {
    pub fn kind(&self) -> ScopeErrorKind {
        match self {
            ScopeError::NotAnObject
            | ScopeError::MissingField { .. }
            | ScopeError::InvalidType { .. } => ScopeErrorKind::Type,
            ScopeError::InvalidValue { .. } => ScopeErrorKind::Value,
        }
    }

    /// Offending intake field, when the error concerns a single field.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ScopeError::NotAnObject => None,
            ScopeError::MissingField { field }
            | ScopeError::InvalidType { field, .. }
            | ScopeError::InvalidValue { field, .. } => Some(field),
        }
    }
}

/// Facts describing one unit of work to classify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeInput {
    pub description: String,
    pub estimated_timeline_weeks: i64,
    pub expected_work_items: i64,
    pub dependency_count: i64,
    pub integration_surface_count: i64,
    pub domain_count: i64,
    pub cross_team_count: i64,
    pub risk_level: RiskLevel,
    pub requires_compliance_review: bool,
    pub requires_migration: bool,
}

impl ScopeInput {
    /// Smallest valid intake for a description: every count at its minimum, no flags raised.
    pub fn new(description: impl Into<String>, risk_level: RiskLevel) -> Self {
        Self {
            description: description.into(),
            estimated_timeline_weeks: 1,
            expected_work_items: 1,
            dependency_count: 0,
            integration_surface_count: 0,
            domain_count: 1,
            cross_team_count: 1,
            risk_level,
            requires_compliance_review: false,
            requires_migration: false,
        }
    }

    pub fn validate(&self) -> Result<(), ScopeError> {
        if self.description.trim().is_empty() {
            return Err(ScopeError::InvalidValue {
                field: "description",
                reason: "cannot be empty".to_string(),
            });
        }

        at_least("estimated_timeline_weeks", self.estimated_timeline_weeks, 1)?;
        at_least("expected_work_items", self.expected_work_items, 1)?;
        at_least("dependency_count", self.dependency_count, 0)?;
        at_least(
            "integration_surface_count",
            self.integration_surface_count,
            0,
        )?;
        at_least("domain_count", self.domain_count, 1)?;
        at_least("cross_team_count", self.cross_team_count, 1)?;
        Ok(())
    }

    /// Convert an untyped intake document, failing on the first shape or domain violation.
    ///
    /// Integer fields that are absent fall back to their declared minimum; the description,
    /// risk level, and both review flags must be present.
    pub fn from_value(value: &Value) -> Result<Self, ScopeError> {
        let object = value.as_object().ok_or(ScopeError::NotAnObject)?;

        let input = Self {
            description: required_string(object, "description")?,
            estimated_timeline_weeks: integer_or(object, "estimated_timeline_weeks", 1)?,
            expected_work_items: integer_or(object, "expected_work_items", 1)?,
            dependency_count: integer_or(object, "dependency_count", 0)?,
            integration_surface_count: integer_or(object, "integration_surface_count", 0)?,
            domain_count: integer_or(object, "domain_count", 1)?,
            cross_team_count: integer_or(object, "cross_team_count", 1)?,
            risk_level: required_risk_level(object)?,
            requires_compliance_review: required_bool(object, "requires_compliance_review")?,
            requires_migration: required_bool(object, "requires_migration")?,
        };

        input.validate()?;
        Ok(input)
    }
}

fn at_least(field: &'static str, value: i64, minimum: i64) -> Result<(), ScopeError> {
    if value < minimum {
        return Err(ScopeError::InvalidValue {
            field,
            reason: format!("must be >= {minimum}"),
        });
    }
    Ok(())
}

fn required_string(object: &Map<String, Value>, field: &'static str) -> Result<String, ScopeError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(ScopeError::MissingField { field }),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(ScopeError::InvalidType {
            field,
            expected: "a string",
        }),
    }
}

fn required_bool(object: &Map<String, Value>, field: &'static str) -> Result<bool, ScopeError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(ScopeError::MissingField { field }),
        Some(Value::Bool(value)) => Ok(*value),
        Some(_) => Err(ScopeError::InvalidType {
            field,
            expected: "a boolean",
        }),
    }
}

fn integer_or(
    object: &Map<String, Value>,
    field: &'static str,
    default: i64,
) -> Result<i64, ScopeError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(number)) => match number.as_i64() {
            Some(value) => Ok(value),
            None if number.is_u64() => Err(ScopeError::InvalidValue {
                field,
                reason: "is out of range".to_string(),
            }),
            None => Err(ScopeError::InvalidType {
                field,
                expected: "an integer",
            }),
        },
        Some(_) => Err(ScopeError::InvalidType {
            field,
            expected: "an integer",
        }),
    }
}

fn required_risk_level(object: &Map<String, Value>) -> Result<RiskLevel, ScopeError> {
    const FIELD: &str = "risk_level";
    match object.get(FIELD) {
        None | Some(Value::Null) => Err(ScopeError::MissingField { field: FIELD }),
        Some(Value::String(raw)) => {
            RiskLevel::parse(raw).ok_or_else(|| ScopeError::InvalidValue {
                field: FIELD,
                reason: "must be one of: low, medium, high, critical".to_string(),
            })
        }
        Some(_) => Err(ScopeError::InvalidType {
            field: FIELD,
            expected: "a string",
        }),
    }
}
