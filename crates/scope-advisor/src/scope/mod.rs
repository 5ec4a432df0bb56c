//! Adaptive scope classification.
//!
//! Intake signals (timeline, breadth, dependencies, risk, description keywords) are scored
//! against an immutable [`ScopeConfig`] and banded into a `feature`, `epic`, or `program`
//! recommendation. Scoring is pure: the same input and configuration always produce the same
//! classification, so classifiers can be shared freely across threads.

mod config;
mod input;
mod policy;
pub mod rubric;
pub mod router;
mod signals;

#[cfg(test)]
mod tests;

pub use config::{
    RiskWeightOverrides, RiskWeights, ScopeConfig, ScopeConfigError, ScopeConfigOverrides,
    ScoreBand, SignalWeight,
};
pub use input::{RiskLevel, ScopeError, ScopeErrorKind, ScopeInput};
pub use rubric::{
    export_rubric, validate_rubric_payload, ConfidenceRubric, RubricDescription,
    RubricDimension, RubricIssue, RubricScoreBand, RUBRIC_VERSION,
};
pub use router::{scope_router, ClassifyResponse};
pub use signals::{ScopeSignal, SignalKind, SignalValue};

use crate::gate::build_payload;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Contract version stamped on every classification.
pub const CONTRACT_VERSION: &str = "scope-detection.v1";

/// Work-breakdown granularity recommended for an initiative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeMode {
    Feature,
    Epic,
    Program,
}

impl ScopeMode {
    pub const ALL: [ScopeMode; 3] = [ScopeMode::Feature, ScopeMode::Epic, ScopeMode::Program];

    pub fn as_str(self) -> &'static str {
        match self {
            ScopeMode::Feature => "feature",
            ScopeMode::Epic => "epic",
            ScopeMode::Program => "program",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|mode| mode.as_str() == normalized)
    }
}

impl fmt::Display for ScopeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable outcome of one classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeClassification {
    pub contract_version: String,
    pub total_score: u32,
    pub score_band: String,
    pub mode_recommendation: ScopeMode,
    pub recommendation_reasons: Vec<String>,
    pub confidence: f64,
    pub signals: Vec<ScopeSignal>,
}

impl ScopeClassification {
    pub fn signal(&self, kind: SignalKind) -> Option<&ScopeSignal> {
        self.signals.iter().find(|signal| signal.name == kind)
    }
}

/// Score `input` under `config`. Fails only when the intake violates its declared constraints.
pub fn classify(
    input: &ScopeInput,
    config: &ScopeConfig,
) -> Result<ScopeClassification, ScopeError> {
    if let Err(err) = input.validate() {
        warn!(field = ?err.field(), error = %err, "scope intake rejected");
        return Err(err);
    }

    let signals = signals::score_signals(input, config);
    let raw_total: u64 = signals.iter().map(|signal| u64::from(signal.score)).sum();
    let total_score = raw_total.min(u64::from(config.max_total_score())) as u32;

    let band = config.band_for(total_score);
    let recommendation_reasons = policy::recommendation_reasons(&signals, band.mode);
    let confidence = policy::confidence(total_score, config);

    debug!(
        total_score,
        band = %band.label(),
        mode = %band.mode,
        confidence,
        "scope classified"
    );

    Ok(ScopeClassification {
        contract_version: CONTRACT_VERSION.to_string(),
        total_score,
        score_band: band.label(),
        mode_recommendation: band.mode,
        recommendation_reasons,
        confidence,
        signals,
    })
}

/// Stateless classifier bound to one shared configuration.
#[derive(Debug, Clone, Default)]
pub struct ScopeClassifier {
    config: Arc<ScopeConfig>,
}

impl ScopeClassifier {
    pub fn new(config: ScopeConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ScopeConfig {
        &self.config
    }

    pub fn classify(&self, input: &ScopeInput) -> Result<ScopeClassification, ScopeError> {
        classify(input, &self.config)
    }

    /// Convert an untyped intake document and classify it.
    pub fn classify_value(&self, value: &Value) -> Result<ScopeClassification, ScopeError> {
        let input = match ScopeInput::from_value(value) {
            Ok(input) => input,
            Err(err) => {
                warn!(field = ?err.field(), error = %err, "scope intake rejected");
                return Err(err);
            }
        };
        self.classify(&input)
    }

    /// Classify an untyped intake and wrap the result in its producer gate payload.
    pub fn classify_with_payload(&self, value: &Value) -> Result<ClassifyResponse, ScopeError> {
        let classification = self.classify_value(value)?;
        let gate_payload = build_payload(&classification);
        Ok(ClassifyResponse {
            classification,
            gate_payload,
        })
    }

    pub fn rubric(&self) -> RubricDescription {
        export_rubric(&self.config)
    }
}
