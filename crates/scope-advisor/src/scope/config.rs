use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::input::RiskLevel;
use super::signals::tokenize;
use super::ScopeMode;

const DEFAULT_COMPLEXITY_KEYWORDS: [&str; 15] = [
    "platform",
    "migration",
    "rollout",
    "integration",
    "compliance",
    "audit",
    "multi-tenant",
    "legacy",
    "cross-team",
    "multi-region",
    "portfolio",
    "sso",
    "billing",
    "observability",
    "security",
];

/// Multiplier applied to a numeric signal and the cap its score is clamped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalWeight {
    pub multiplier: u32,
    pub cap: u32,
}

impl SignalWeight {
    pub const fn new(multiplier: u32, cap: u32) -> Self {
        Self { multiplier, cap }
    }

    /// `min(raw * multiplier, cap)` without overflowing on absurd inputs.
    pub fn score(&self, raw: u64) -> u32 {
        let contribution = raw.saturating_mul(u64::from(self.multiplier));
        contribution.min(u64::from(self.cap)) as u32
    }
}

/// Fixed score contributed by each declared risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskWeights {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
    pub critical: u32,
}

impl RiskWeights {
    pub fn weight_for(&self, level: RiskLevel) -> u32 {
        match level {
            RiskLevel::Low => self.low,
            RiskLevel::Medium => self.medium,
            RiskLevel::High => self.high,
            RiskLevel::Critical => self.critical,
        }
    }

    pub fn max_weight(&self) -> u32 {
        RiskLevel::ALL
            .into_iter()
            .map(|level| self.weight_for(level))
            .max()
            .unwrap_or(0)
    }
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            low: 0,
            medium: 4,
            high: 8,
            critical: 12,
        }
    }
}

/// Inclusive score range mapped to one recommendation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBand {
    pub mode: ScopeMode,
    pub min_score: u32,
    pub max_score: u32,
}

impl ScoreBand {
    pub fn contains(&self, score: u32) -> bool {
        (self.min_score..=self.max_score).contains(&score)
    }

    /// `"0-34"` style label; the program band is open-ended (`"65+"`).
    pub fn label(&self) -> String {
        match self.mode {
            ScopeMode::Program => format!("{}+", self.min_score),
            ScopeMode::Feature | ScopeMode::Epic => {
                format!("{}-{}", self.min_score, self.max_score)
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScopeConfigError {
    #[error("invalid scope_detection overrides: {0}")]
    Overrides(#[from] serde_json::Error),
    #[error(
        "score bands require feature_max_score < epic_max_score < max_total_score \
         (got {feature_max}, {epic_max}, {max_total})"
    )]
    InvalidBands {
        feature_max: u32,
        epic_max: u32,
        max_total: u32,
    },
    #[error("{field} must be within [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f64 },
    #[error("complexity keywords must contain at least one letter or digit")]
    BlankKeyword,
}

/// Per-level overrides for [`RiskWeights`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskWeightOverrides {
    pub low: Option<u32>,
    pub medium: Option<u32>,
    pub high: Option<u32>,
    pub critical: Option<u32>,
}

/// Partial configuration; unset keys keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeConfigOverrides {
    pub timeline_multiplier: Option<u32>,
    pub timeline_cap: Option<u32>,
    pub work_items_multiplier: Option<u32>,
    pub work_items_cap: Option<u32>,
    pub dependency_multiplier: Option<u32>,
    pub dependency_cap: Option<u32>,
    pub integration_multiplier: Option<u32>,
    pub integration_cap: Option<u32>,
    pub domain_multiplier: Option<u32>,
    pub domain_cap: Option<u32>,
    pub cross_team_multiplier: Option<u32>,
    pub cross_team_cap: Option<u32>,
    pub risk_weights: Option<RiskWeightOverrides>,
    pub compliance_score: Option<u32>,
    pub migration_score: Option<u32>,
    pub keyword_cap: Option<u32>,
    pub complexity_keywords: Option<Vec<String>>,
    pub feature_max_score: Option<u32>,
    pub epic_max_score: Option<u32>,
    pub max_total_score: Option<u32>,
    pub confidence_baseline: Option<f64>,
    pub boundary_distance_threshold: Option<u32>,
    pub boundary_penalty: Option<f64>,
}

/// Immutable weights, caps, and thresholds driving every classification.
///
/// Instances are validated on construction and never mutated afterwards; callers share them
/// by reference or behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeConfig {
    timeline: SignalWeight,
    work_items: SignalWeight,
    dependency: SignalWeight,
    integration: SignalWeight,
    domain: SignalWeight,
    cross_team: SignalWeight,
    risk_weights: RiskWeights,
    compliance_score: u32,
    migration_score: u32,
    keyword_cap: u32,
    complexity_keywords: BTreeSet<String>,
    feature_max_score: u32,
    epic_max_score: u32,
    max_total_score: u32,
    confidence_baseline: f64,
    boundary_distance_threshold: u32,
    boundary_penalty: f64,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            timeline: SignalWeight::new(1, 8),
            work_items: SignalWeight::new(2, 10),
            dependency: SignalWeight::new(2, 10),
            integration: SignalWeight::new(2, 8),
            domain: SignalWeight::new(6, 12),
            cross_team: SignalWeight::new(4, 8),
            risk_weights: RiskWeights::default(),
            compliance_score: 5,
            migration_score: 5,
            keyword_cap: 8,
            complexity_keywords: DEFAULT_COMPLEXITY_KEYWORDS
                .iter()
                .map(|keyword| keyword.to_string())
                .collect(),
            feature_max_score: 34,
            epic_max_score: 64,
            max_total_score: 100,
            confidence_baseline: 0.9,
            boundary_distance_threshold: 1,
            boundary_penalty: 0.1,
        }
    }
}

impl ScopeConfig {
    /// Apply overrides on top of the defaults and validate the result.
    pub fn with_overrides(overrides: ScopeConfigOverrides) -> Result<Self, ScopeConfigError> {
        let defaults = Self::default();
        let weight = |base: SignalWeight, multiplier: Option<u32>, cap: Option<u32>| {
            SignalWeight::new(
                multiplier.unwrap_or(base.multiplier),
                cap.unwrap_or(base.cap),
            )
        };

        let risk_weights = match overrides.risk_weights {
            Some(risk) => RiskWeights {
                low: risk.low.unwrap_or(defaults.risk_weights.low),
                medium: risk.medium.unwrap_or(defaults.risk_weights.medium),
                high: risk.high.unwrap_or(defaults.risk_weights.high),
                critical: risk.critical.unwrap_or(defaults.risk_weights.critical),
            },
            None => defaults.risk_weights,
        };

        let complexity_keywords = match overrides.complexity_keywords {
            Some(keywords) => normalize_keywords(keywords)?,
            None => defaults.complexity_keywords.clone(),
        };

        let config = Self {
            timeline: weight(
                defaults.timeline,
                overrides.timeline_multiplier,
                overrides.timeline_cap,
            ),
            work_items: weight(
                defaults.work_items,
                overrides.work_items_multiplier,
                overrides.work_items_cap,
            ),
            dependency: weight(
                defaults.dependency,
                overrides.dependency_multiplier,
                overrides.dependency_cap,
            ),
            integration: weight(
                defaults.integration,
                overrides.integration_multiplier,
                overrides.integration_cap,
            ),
            domain: weight(
                defaults.domain,
                overrides.domain_multiplier,
                overrides.domain_cap,
            ),
            cross_team: weight(
                defaults.cross_team,
                overrides.cross_team_multiplier,
                overrides.cross_team_cap,
            ),
            risk_weights,
            compliance_score: overrides
                .compliance_score
                .unwrap_or(defaults.compliance_score),
            migration_score: overrides
                .migration_score
                .unwrap_or(defaults.migration_score),
            keyword_cap: overrides.keyword_cap.unwrap_or(defaults.keyword_cap),
            complexity_keywords,
            feature_max_score: overrides
                .feature_max_score
                .unwrap_or(defaults.feature_max_score),
            epic_max_score: overrides.epic_max_score.unwrap_or(defaults.epic_max_score),
            max_total_score: overrides
                .max_total_score
                .unwrap_or(defaults.max_total_score),
            confidence_baseline: overrides
                .confidence_baseline
                .unwrap_or(defaults.confidence_baseline),
            boundary_distance_threshold: overrides
                .boundary_distance_threshold
                .unwrap_or(defaults.boundary_distance_threshold),
            boundary_penalty: overrides
                .boundary_penalty
                .unwrap_or(defaults.boundary_penalty),
        };

        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from an untyped `scope_detection` mapping; unknown keys are rejected.
    pub fn from_mapping(mapping: &Value) -> Result<Self, ScopeConfigError> {
        if mapping.is_null() {
            return Ok(Self::default());
        }
        let overrides = ScopeConfigOverrides::deserialize(mapping)?;
        Self::with_overrides(overrides)
    }

    fn validate(&self) -> Result<(), ScopeConfigError> {
        if !(self.feature_max_score < self.epic_max_score
            && self.epic_max_score < self.max_total_score)
        {
            return Err(ScopeConfigError::InvalidBands {
                feature_max: self.feature_max_score,
                epic_max: self.epic_max_score,
                max_total: self.max_total_score,
            });
        }

        unit_range("confidence_baseline", self.confidence_baseline)?;
        unit_range("boundary_penalty", self.boundary_penalty)?;
        Ok(())
    }

    pub fn timeline(&self) -> SignalWeight {
        self.timeline
    }

    pub fn work_items(&self) -> SignalWeight {
        self.work_items
    }

    pub fn dependency(&self) -> SignalWeight {
        self.dependency
    }

    pub fn integration(&self) -> SignalWeight {
        self.integration
    }

    pub fn domain(&self) -> SignalWeight {
        self.domain
    }

    pub fn cross_team(&self) -> SignalWeight {
        self.cross_team
    }

    pub fn risk_weights(&self) -> RiskWeights {
        self.risk_weights
    }

    pub fn compliance_score(&self) -> u32 {
        self.compliance_score
    }

    pub fn migration_score(&self) -> u32 {
        self.migration_score
    }

    pub fn keyword_cap(&self) -> u32 {
        self.keyword_cap
    }

    pub fn complexity_keywords(&self) -> &BTreeSet<String> {
        &self.complexity_keywords
    }

    pub fn feature_max_score(&self) -> u32 {
        self.feature_max_score
    }

    pub fn epic_max_score(&self) -> u32 {
        self.epic_max_score
    }

    pub fn max_total_score(&self) -> u32 {
        self.max_total_score
    }

    pub fn confidence_baseline(&self) -> f64 {
        self.confidence_baseline
    }

    pub fn boundary_distance_threshold(&self) -> u32 {
        self.boundary_distance_threshold
    }

    pub fn boundary_penalty(&self) -> f64 {
        self.boundary_penalty
    }

    /// The three contiguous bands, lowest first. Banding and the rubric export both read this.
    pub fn score_bands(&self) -> [ScoreBand; 3] {
        [
            ScoreBand {
                mode: ScopeMode::Feature,
                min_score: 0,
                max_score: self.feature_max_score,
            },
            ScoreBand {
                mode: ScopeMode::Epic,
                min_score: self.feature_max_score + 1,
                max_score: self.epic_max_score,
            },
            ScoreBand {
                mode: ScopeMode::Program,
                min_score: self.epic_max_score + 1,
                max_score: self.max_total_score,
            },
        ]
    }

    pub fn band_for(&self, score: u32) -> ScoreBand {
        let [feature, epic, program] = self.score_bands();
        if score <= feature.max_score {
            feature
        } else if score <= epic.max_score {
            epic
        } else {
            program
        }
    }
}

fn unit_range(field: &'static str, value: f64) -> Result<(), ScopeConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ScopeConfigError::OutOfUnitRange { field, value })
    }
}

fn normalize_keywords(keywords: Vec<String>) -> Result<BTreeSet<String>, ScopeConfigError> {
    keywords
        .into_iter()
        .map(|keyword| {
            let normalized = keyword.trim().to_lowercase();
            if tokenize(&normalized).is_empty() {
                Err(ScopeConfigError::BlankKeyword)
            } else {
                Ok(normalized)
            }
        })
        .collect()
}
