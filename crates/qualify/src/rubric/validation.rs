use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::{PillarId, QuestionId, RubricDefinition};

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Whether pillar weights must add up to a fixed total before a save succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WeightPolicy {
    Strict { total: f64 },
    DraftAllowed,
}

impl Default for WeightPolicy {
    fn default() -> Self {
        WeightPolicy::Strict { total: 100.0 }
    }
}

/// One reason a rubric definition was rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ValidationIssue {
    EmptyRubric,
    NonFiniteThreshold,
    ThresholdsNotDecreasing {
        low: f64,
        medium: f64,
        high: f64,
    },
    DuplicatePillarId {
        pillar_id: PillarId,
    },
    DuplicateQuestionId {
        pillar_id: PillarId,
        question_id: QuestionId,
    },
    PillarWithoutQuestions {
        pillar_id: PillarId,
    },
    InvalidWeight {
        pillar_id: PillarId,
        weight: f64,
    },
    InvalidQuestionText {
        pillar_id: PillarId,
        question_id: QuestionId,
    },
    WeightTotalMismatch {
        expected: f64,
        actual: f64,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRubric => write!(f, "rubric must define at least one pillar"),
            ValidationIssue::NonFiniteThreshold => write!(f, "thresholds must be finite numbers"),
            ValidationIssue::ThresholdsNotDecreasing { low, medium, high } => write!(
                f,
                "thresholds must be strictly decreasing (low {low} > medium {medium} > high {high})"
            ),
            ValidationIssue::DuplicatePillarId { pillar_id } => {
                write!(f, "pillar id '{pillar_id}' is used more than once")
            }
            ValidationIssue::DuplicateQuestionId {
                pillar_id,
                question_id,
            } => write!(
                f,
                "question id '{question_id}' in pillar '{pillar_id}' is used more than once"
            ),
            ValidationIssue::PillarWithoutQuestions { pillar_id } => {
                write!(f, "pillar '{pillar_id}' has no questions")
            }
            ValidationIssue::InvalidWeight { pillar_id, weight } => {
                write!(f, "pillar '{pillar_id}' has invalid weight {weight}")
            }
            ValidationIssue::InvalidQuestionText {
                pillar_id,
                question_id,
            } => write!(
                f,
                "question '{question_id}' in pillar '{pillar_id}' needs non-blank text without blank lines"
            ),
            ValidationIssue::WeightTotalMismatch { expected, actual } => {
                write!(f, "pillar weights sum to {actual}, expected {expected}")
            }
        }
    }
}

/// Raised before persistence when a rubric definition is not acceptable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid rubric configuration: {}", summarize(.issues))]
pub struct ConfigurationValidationError {
    pub issues: Vec<ValidationIssue>,
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check a definition against the structural rules and the weight policy,
/// collecting every issue rather than stopping at the first.
pub fn validate(
    definition: &RubricDefinition,
    policy: WeightPolicy,
) -> Result<(), ConfigurationValidationError> {
    let mut issues = Vec::new();
    let thresholds = definition.thresholds;

    if definition.pillars.is_empty() {
        issues.push(ValidationIssue::EmptyRubric);
    }

    if !thresholds.is_finite() {
        issues.push(ValidationIssue::NonFiniteThreshold);
    } else if !thresholds.is_strictly_decreasing() {
        issues.push(ValidationIssue::ThresholdsNotDecreasing {
            low: thresholds.low,
            medium: thresholds.medium,
            high: thresholds.high,
        });
    }

    let mut pillar_ids = HashSet::new();
    let mut question_ids = HashSet::new();
    for pillar in &definition.pillars {
        if !pillar_ids.insert(&pillar.id) {
            issues.push(ValidationIssue::DuplicatePillarId {
                pillar_id: pillar.id.clone(),
            });
        }

        if !pillar.weight.is_finite() || pillar.weight < 0.0 {
            issues.push(ValidationIssue::InvalidWeight {
                pillar_id: pillar.id.clone(),
                weight: pillar.weight,
            });
        }

        if pillar.questions.is_empty() {
            issues.push(ValidationIssue::PillarWithoutQuestions {
                pillar_id: pillar.id.clone(),
            });
        }

        for question in &pillar.questions {
            if !question_ids.insert(&question.id) {
                issues.push(ValidationIssue::DuplicateQuestionId {
                    pillar_id: pillar.id.clone(),
                    question_id: question.id.clone(),
                });
            }

            if question.text.trim().is_empty() || question.text.contains("\n\n") {
                issues.push(ValidationIssue::InvalidQuestionText {
                    pillar_id: pillar.id.clone(),
                    question_id: question.id.clone(),
                });
            }
        }
    }

    if let WeightPolicy::Strict { total } = policy {
        let actual = definition.total_weight();
        if actual.is_finite() && (actual - total).abs() > WEIGHT_TOLERANCE {
            issues.push(ValidationIssue::WeightTotalMismatch {
                expected: total,
                actual,
            });
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ConfigurationValidationError { issues })
    }
}
