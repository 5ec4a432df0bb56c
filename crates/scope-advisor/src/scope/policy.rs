use super::config::ScopeConfig;
use super::signals::ScopeSignal;
use super::ScopeMode;

pub(crate) const MIN_REASONS: usize = 2;
pub(crate) const MAX_REASONS: usize = 3;

pub(crate) const GENERIC_FALLBACK: &str =
    "Recommendation derived deterministically from structured intake signals.";

pub(crate) fn mode_fallback(mode: ScopeMode) -> &'static str {
    match mode {
        ScopeMode::Feature => {
            "Coordination and risk signals stay low, so the work fits a single feature."
        }
        ScopeMode::Epic => {
            "Several complexity drivers are present; decompose into features before generating tasks."
        }
        ScopeMode::Program => {
            "Aggregate complexity is high; structure the work as a program of epics and features."
        }
    }
}

/// Baseline confidence, penalized when the score sits within the threshold of a band edge.
///
/// Only confidence moves near a boundary; the band itself is decided by [`ScopeConfig::band_for`].
pub(crate) fn confidence(score: u32, config: &ScopeConfig) -> f64 {
    let feature_max = config.feature_max_score();
    let epic_max = config.epic_max_score();
    let distance = [feature_max, feature_max + 1, epic_max, epic_max + 1]
        .into_iter()
        .map(|boundary| score.abs_diff(boundary))
        .min()
        .unwrap_or(u32::MAX);

    let mut confidence = config.confidence_baseline();
    if distance <= config.boundary_distance_threshold() {
        confidence -= config.boundary_penalty();
    }

    round_to_hundredths(confidence.clamp(0.0, 1.0))
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Top positive signals by score (ties broken by name), padded with fallbacks to at least two.
pub(crate) fn recommendation_reasons(signals: &[ScopeSignal], mode: ScopeMode) -> Vec<String> {
    let mut positive: Vec<&ScopeSignal> = signals.iter().filter(|signal| signal.score > 0).collect();
    positive.sort_by(|left, right| {
        right
            .score
            .cmp(&left.score)
            .then_with(|| left.name.as_str().cmp(right.name.as_str()))
    });

    let mut reasons: Vec<String> = positive
        .into_iter()
        .take(MAX_REASONS)
        .map(|signal| signal.rationale.clone())
        .collect();

    if reasons.len() < MIN_REASONS {
        reasons.push(mode_fallback(mode).to_string());
    }
    if reasons.len() < MIN_REASONS {
        reasons.push(GENERIC_FALLBACK.to_string());
    }

    reasons
}
