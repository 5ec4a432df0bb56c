use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::config::{ScopeConfig, SignalWeight};
use super::input::{RiskLevel, ScopeInput};

/// Named contribution to the total score, listed in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    TimelineWeeks,
    ExpectedWorkItems,
    DependencyCount,
    IntegrationSurfaceCount,
    DomainCount,
    CrossTeamCount,
    RiskLevel,
    RequiresComplianceReview,
    RequiresMigration,
    ComplexityKeywords,
}

impl SignalKind {
    pub const ALL: [SignalKind; 10] = [
        SignalKind::TimelineWeeks,
        SignalKind::ExpectedWorkItems,
        SignalKind::DependencyCount,
        SignalKind::IntegrationSurfaceCount,
        SignalKind::DomainCount,
        SignalKind::CrossTeamCount,
        SignalKind::RiskLevel,
        SignalKind::RequiresComplianceReview,
        SignalKind::RequiresMigration,
        SignalKind::ComplexityKeywords,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::TimelineWeeks => "timeline_weeks",
            SignalKind::ExpectedWorkItems => "expected_work_items",
            SignalKind::DependencyCount => "dependency_count",
            SignalKind::IntegrationSurfaceCount => "integration_surface_count",
            SignalKind::DomainCount => "domain_count",
            SignalKind::CrossTeamCount => "cross_team_count",
            SignalKind::RiskLevel => "risk_level",
            SignalKind::RequiresComplianceReview => "requires_compliance_review",
            SignalKind::RequiresMigration => "requires_migration",
            SignalKind::ComplexityKeywords => "complexity_keywords",
        }
    }

    /// Intake field the signal reads.
    pub fn input_field(self) -> &'static str {
        match self {
            SignalKind::TimelineWeeks => "estimated_timeline_weeks",
            SignalKind::ComplexityKeywords => "description",
            other => other.as_str(),
        }
    }

    fn detail(self) -> &'static str {
        match self {
            SignalKind::TimelineWeeks => "longer delivery horizons need staged planning",
            SignalKind::ExpectedWorkItems => "more work items need deeper decomposition",
            SignalKind::DependencyCount => "external dependencies raise coordination cost",
            SignalKind::IntegrationSurfaceCount => "integration surfaces add technical coupling",
            SignalKind::DomainCount => "each additional domain widens the scope",
            SignalKind::CrossTeamCount => "each additional team raises alignment cost",
            SignalKind::RiskLevel => "declared delivery risk",
            SignalKind::RequiresComplianceReview => "formal compliance review adds approval gates",
            SignalKind::RequiresMigration => "migration cutover adds transition and rollback risk",
            SignalKind::ComplexityKeywords => "complexity keywords found in the description",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intake value a signal was computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    Count(i64),
    Flag(bool),
    Risk(RiskLevel),
    Keywords(Vec<String>),
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Count(value) => write!(f, "{value}"),
            SignalValue::Flag(value) => write!(f, "{value}"),
            SignalValue::Risk(level) => write!(f, "{level}"),
            SignalValue::Keywords(keywords) if keywords.is_empty() => f.write_str("none"),
            SignalValue::Keywords(keywords) => f.write_str(&keywords.join(", ")),
        }
    }
}

/// One scored contribution with the sentence used when it is selected as a reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSignal {
    pub name: SignalKind,
    pub raw_value: SignalValue,
    pub weight: u32,
    pub score: u32,
    pub rationale: String,
}

impl ScopeSignal {
    fn new(name: SignalKind, raw_value: SignalValue, weight: u32, score: u32) -> Self {
        let rationale = format!(
            "{name} = {raw_value} contributes {score} point(s): {}",
            name.detail()
        );
        Self {
            name,
            raw_value,
            weight,
            score,
            rationale,
        }
    }
}

pub(crate) fn score_signals(input: &ScopeInput, config: &ScopeConfig) -> Vec<ScopeSignal> {
    let counted = |kind: SignalKind, value: i64, raw: u64, weight: SignalWeight| {
        ScopeSignal::new(
            kind,
            SignalValue::Count(value),
            weight.multiplier,
            weight.score(raw),
        )
    };

    let risk_weight = config.risk_weights().weight_for(input.risk_level);
    let flag = |kind: SignalKind, raised: bool, points: u32| {
        ScopeSignal::new(
            kind,
            SignalValue::Flag(raised),
            points,
            if raised { points } else { 0 },
        )
    };

    let keywords = matched_keywords(&input.description, config.complexity_keywords());
    let keyword_score = u32::try_from(keywords.len())
        .unwrap_or(u32::MAX)
        .min(config.keyword_cap());

    vec![
        counted(
            SignalKind::TimelineWeeks,
            input.estimated_timeline_weeks,
            beyond_first(input.estimated_timeline_weeks),
            config.timeline(),
        ),
        counted(
            SignalKind::ExpectedWorkItems,
            input.expected_work_items,
            beyond_first(input.expected_work_items),
            config.work_items(),
        ),
        counted(
            SignalKind::DependencyCount,
            input.dependency_count,
            non_negative(input.dependency_count),
            config.dependency(),
        ),
        counted(
            SignalKind::IntegrationSurfaceCount,
            input.integration_surface_count,
            non_negative(input.integration_surface_count),
            config.integration(),
        ),
        counted(
            SignalKind::DomainCount,
            input.domain_count,
            beyond_first(input.domain_count),
            config.domain(),
        ),
        counted(
            SignalKind::CrossTeamCount,
            input.cross_team_count,
            beyond_first(input.cross_team_count),
            config.cross_team(),
        ),
        ScopeSignal::new(
            SignalKind::RiskLevel,
            SignalValue::Risk(input.risk_level),
            risk_weight,
            risk_weight,
        ),
        flag(
            SignalKind::RequiresComplianceReview,
            input.requires_compliance_review,
            config.compliance_score(),
        ),
        flag(
            SignalKind::RequiresMigration,
            input.requires_migration,
            config.migration_score(),
        ),
        ScopeSignal::new(
            SignalKind::ComplexityKeywords,
            SignalValue::Keywords(keywords),
            1,
            keyword_score,
        ),
    ]
}

fn beyond_first(value: i64) -> u64 {
    non_negative(value.saturating_sub(1))
}

fn non_negative(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Lower-cased words of `text`; hyphens inside a word are kept so `cross-team` stays one token.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .map(|token| token.trim_matches('-'))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Configured keywords whose tokens occur as a contiguous run in the description.
pub(crate) fn matched_keywords(description: &str, keywords: &BTreeSet<String>) -> Vec<String> {
    let tokens = tokenize(description);
    keywords
        .iter()
        .filter(|keyword| {
            let needle = tokenize(keyword);
            !needle.is_empty()
                && tokens
                    .windows(needle.len())
                    .any(|window| window == needle.as_slice())
        })
        .cloned()
        .collect()
}
