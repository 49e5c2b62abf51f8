//! Per-question responses and their conversion to and from the one-blob-per-pillar
//! "simple" representation.

mod normalizer;

pub use normalizer::{
    rehydrate_responses, to_comprehensive_format, to_simple_format, NormalizeError,
    SIMPLE_FORMAT_SEPARATOR,
};

use serde::{Deserialize, Serialize};

use crate::rubric::{PillarId, QuestionId};

/// One answer in the comprehensive representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub pillar_id: PillarId,
    pub question_id: QuestionId,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub points: u32,
}

impl Response {
    pub fn is_answered(&self) -> bool {
        !self.answer.trim().is_empty()
    }

    /// Points that count toward the score; blank answers earn nothing.
    pub fn awarded_points(&self) -> u32 {
        if self.is_answered() {
            self.points
        } else {
            0
        }
    }
}

/// Question/answer pair recovered from a pillar's text blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PillarAnswer {
    pub question_id: QuestionId,
    pub answer: String,
}

/// Outcome of parsing one pillar blob back into per-question answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PillarParse {
    pub pillar_id: PillarId,
    pub answers: Vec<PillarAnswer>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ParseAmbiguityWarning>,
}

/// Why a line of text could not be matched to a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityCause {
    MissingSeparator,
    UnknownQuestionText,
}

/// A line that fell back to the pillar's first question. Non-fatal; the text
/// is kept, but the assignment deserves a manual look.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("pillar {pillar_id}: line could not be matched ({cause:?}); assigned to question {assigned_to}")]
pub struct ParseAmbiguityWarning {
    pub pillar_id: PillarId,
    pub assigned_to: QuestionId,
    pub cause: AmbiguityCause,
    pub line: String,
}
