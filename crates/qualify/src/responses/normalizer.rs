use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use super::{AmbiguityCause, ParseAmbiguityWarning, PillarAnswer, PillarParse, Response};
use crate::rubric::{Pillar, PillarId, QuestionId, RubricConfiguration};

/// Separates rendered question/answer lines inside a pillar blob.
pub const SIMPLE_FORMAT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("rubric version has no pillar {pillar_id}")]
    UnknownPillar { pillar_id: PillarId },
    #[error("pillar {pillar_id} has no questions to receive text")]
    PillarWithoutQuestions { pillar_id: PillarId },
}

/// Render one text blob per pillar: answered questions in rubric order as
/// `"<question text>: <answer>"`, joined by a blank line. Pillars without
/// answers map to an empty string.
pub fn to_simple_format(
    responses: &[Response],
    configuration: &RubricConfiguration,
) -> BTreeMap<PillarId, String> {
    let mut latest: HashMap<(&PillarId, &QuestionId), &Response> = HashMap::new();
    for response in responses {
        latest.insert((&response.pillar_id, &response.question_id), response);
    }

    configuration
        .pillars
        .iter()
        .map(|pillar| {
            let lines: Vec<String> = pillar
                .questions
                .iter()
                .filter_map(|question| {
                    latest
                        .get(&(&pillar.id, &question.id))
                        .filter(|response| response.is_answered())
                        .map(|response| format!("{}: {}", question.text, response.answer))
                })
                .collect();
            (pillar.id.clone(), lines.join(SIMPLE_FORMAT_SEPARATOR))
        })
        .collect()
}

/// Split a pillar blob back into per-question answers.
///
/// Each blank-line separated line is matched on the text before its first
/// colon. Lines without a colon, or whose label matches no question, are
/// appended to the pillar's first question and reported as ambiguous.
pub fn to_comprehensive_format(
    pillar_id: &PillarId,
    text: &str,
    configuration: &RubricConfiguration,
) -> Result<PillarParse, NormalizeError> {
    let pillar = configuration
        .pillar(pillar_id)
        .ok_or_else(|| NormalizeError::UnknownPillar {
            pillar_id: pillar_id.clone(),
        })?;
    let first = pillar
        .questions
        .first()
        .ok_or_else(|| NormalizeError::PillarWithoutQuestions {
            pillar_id: pillar_id.clone(),
        })?;

    let mut assigned: Vec<Option<String>> = vec![None; pillar.questions.len()];
    let mut warnings = Vec::new();

    for line in split_lines(text) {
        if line.trim().is_empty() {
            continue;
        }

        match match_line(pillar, line) {
            Ok((index, answer)) => {
                if !answer.trim().is_empty() {
                    append_answer(&mut assigned[index], answer);
                }
            }
            Err(cause) => {
                warn!(
                    pillar = %pillar_id,
                    question = %first.id,
                    ?cause,
                    "unmatched rubric text assigned to first question"
                );
                append_answer(&mut assigned[0], line);
                warnings.push(ParseAmbiguityWarning {
                    pillar_id: pillar_id.clone(),
                    assigned_to: first.id.clone(),
                    cause,
                    line: line.to_string(),
                });
            }
        }
    }

    let answers = pillar
        .questions
        .iter()
        .zip(assigned)
        .filter_map(|(question, answer)| {
            answer.map(|answer| PillarAnswer {
                question_id: question.id.clone(),
                answer,
            })
        })
        .collect();

    Ok(PillarParse {
        pillar_id: pillar_id.clone(),
        answers,
        warnings,
    })
}

/// Turn an edited pillar blob back into responses, keeping the points already
/// awarded for questions that are still answered.
pub fn rehydrate_responses(
    pillar_id: &PillarId,
    text: &str,
    configuration: &RubricConfiguration,
    existing: &[Response],
) -> Result<(Vec<Response>, Vec<ParseAmbiguityWarning>), NormalizeError> {
    let parsed = to_comprehensive_format(pillar_id, text, configuration)?;

    let responses = parsed
        .answers
        .into_iter()
        .map(|parsed_answer| {
            let points = existing
                .iter()
                .rev()
                .find(|response| {
                    &response.pillar_id == pillar_id
                        && response.question_id == parsed_answer.question_id
                })
                .map(|response| response.points)
                .unwrap_or(0);
            Response {
                pillar_id: pillar_id.clone(),
                question_id: parsed_answer.question_id,
                answer: parsed_answer.answer,
                points,
            }
        })
        .collect();

    Ok((responses, parsed.warnings))
}

/// Split a blob on blank lines. In a run of three or more newlines only the
/// last two separate lines; the rest stay with the text before them, so an
/// answer ending in a newline keeps it.
fn split_lines(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] != b'\n' {
            index += 1;
            continue;
        }
        let run_end = bytes[index..]
            .iter()
            .position(|byte| *byte != b'\n')
            .map_or(bytes.len(), |offset| index + offset);
        if run_end - index >= SIMPLE_FORMAT_SEPARATOR.len() {
            lines.push(&text[start..run_end - SIMPLE_FORMAT_SEPARATOR.len()]);
            start = run_end;
        }
        index = run_end;
    }

    lines.push(&text[start..]);
    lines
}

fn match_line<'a>(pillar: &Pillar, line: &'a str) -> Result<(usize, &'a str), AmbiguityCause> {
    let Some(colon) = line.find(':') else {
        return Err(AmbiguityCause::MissingSeparator);
    };

    let label = line[..colon].trim();
    if let Some(index) = pillar
        .questions
        .iter()
        .position(|question| question.text.trim() == label)
    {
        return Ok((index, strip_separator_space(&line[colon + 1..])));
    }

    // Question texts may themselves contain a colon; match them as a prefix.
    let trimmed = line.trim_start();
    pillar
        .questions
        .iter()
        .enumerate()
        .filter(|(_, question)| question.text.contains(':'))
        .find_map(|(index, question)| {
            trimmed
                .strip_prefix(question.text.trim())
                .and_then(|rest| rest.strip_prefix(':'))
                .map(|rest| (index, strip_separator_space(rest)))
        })
        .ok_or(AmbiguityCause::UnknownQuestionText)
}

fn strip_separator_space(rest: &str) -> &str {
    rest.strip_prefix(' ').unwrap_or(rest)
}

fn append_answer(slot: &mut Option<String>, text: &str) {
    match slot {
        Some(existing) => {
            existing.push_str(SIMPLE_FORMAT_SEPARATOR);
            existing.push_str(text);
        }
        None => *slot = Some(text.to_string()),
    }
}
