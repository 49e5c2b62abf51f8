mod policy;
mod rules;

pub use policy::classify;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::responses::Response;
use crate::rubric::{PillarId, QuestionId, RubricConfiguration};

/// Identifier of the business record being qualified (an opportunity, a deal).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coarse qualification band derived from the total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low risk",
            RiskLevel::Medium => "medium risk",
            RiskLevel::High => "high risk",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Contribution of one pillar to the total, kept for transparent audits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PillarBreakdown {
    pub pillar_id: PillarId,
    pub pillar_name: String,
    pub weight: f64,
    pub raw_points: u32,
    pub max_points: u32,
    pub answered_questions: usize,
    pub total_questions: usize,
    pub contribution: f64,
}

/// Pure scoring output for one set of responses against one rubric version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    pub total_score: f64,
    pub risk_level: RiskLevel,
    pub pillars: Vec<PillarBreakdown>,
    pub config_version: u32,
}

/// A response that cites a pillar or question the rubric version lacks.
/// Ignored for scoring and reported back instead of failing the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("response references unknown question {question_id} in pillar {pillar_id} (rubric v{config_version})")]
pub struct UnknownQuestionReference {
    pub pillar_id: PillarId,
    pub question_id: QuestionId,
    pub config_version: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreComputation {
    pub scorecard: Scorecard,
    pub unknown_references: Vec<UnknownQuestionReference>,
}

/// Scored entity as returned to callers and held in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub entity_id: EntityId,
    pub total_score: f64,
    pub risk_level: RiskLevel,
    pub pillar_breakdown: Vec<PillarBreakdown>,
    pub config_version_used: u32,
    pub calculated_at: DateTime<Utc>,
}

impl AssessmentResult {
    pub fn new(entity_id: EntityId, scorecard: Scorecard, calculated_at: DateTime<Utc>) -> Self {
        Self {
            entity_id,
            total_score: scorecard.total_score,
            risk_level: scorecard.risk_level,
            pillar_breakdown: scorecard.pillars,
            config_version_used: scorecard.config_version,
            calculated_at,
        }
    }

    pub fn risk_label(&self) -> &'static str {
        self.risk_level.label()
    }
}

/// Weighted-sum score of `responses` against `configuration`.
///
/// Deterministic and free of side effects: the same responses and rubric
/// version always yield the same scorecard.
pub fn compute_score(
    responses: &[Response],
    configuration: &RubricConfiguration,
) -> ScoreComputation {
    let (pillars, raw_total, unknown_references) = rules::score_pillars(responses, configuration);
    // Bands apply to the exact sum; only the reported total is rounded.
    let risk_level = classify(raw_total, &configuration.thresholds);

    ScoreComputation {
        scorecard: Scorecard {
            total_score: (raw_total * 100.0).round() / 100.0,
            risk_level,
            pillars,
            config_version: configuration.version,
        },
        unknown_references,
    }
}
