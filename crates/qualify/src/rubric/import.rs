use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::domain::{Pillar, PillarId, Question, QuestionId, RubricDefinition, Thresholds};

/// Builds a rubric definition from a flat CSV export, one row per question.
///
/// Expected headers: `pillar_id,pillar_name,pillar_weight,question_id,question_text,max_points`.
/// Pillars and questions keep the order in which they first appear.
pub struct RubricImporter;

impl RubricImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        thresholds: Thresholds,
    ) -> Result<RubricDefinition, RubricImportError> {
        let file = File::open(path)?;
        Self::from_reader(file, thresholds)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        thresholds: Thresholds,
    ) -> Result<RubricDefinition, RubricImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut pillars: Vec<Pillar> = Vec::new();

        for (index, record) in csv_reader.deserialize::<RubricRow>().enumerate() {
            let row = record?;
            let line = index + 2;

            let pillar = match pillars
                .iter()
                .position(|pillar| pillar.id.as_str() == row.pillar_id)
            {
                Some(position) => {
                    let pillar = &mut pillars[position];
                    if pillar.name != row.pillar_name || pillar.weight != row.pillar_weight {
                        return Err(RubricImportError::Inconsistent {
                            line,
                            pillar_id: row.pillar_id,
                        });
                    }
                    pillar
                }
                None => {
                    pillars.push(Pillar {
                        id: PillarId(row.pillar_id.clone()),
                        name: row.pillar_name.clone(),
                        weight: row.pillar_weight,
                        questions: Vec::new(),
                    });
                    let last = pillars.len() - 1;
                    &mut pillars[last]
                }
            };

            pillar.questions.push(Question {
                id: QuestionId(row.question_id),
                text: row.question_text,
                max_points: row.max_points,
            });
        }

        if pillars.is_empty() {
            return Err(RubricImportError::Empty);
        }

        Ok(RubricDefinition {
            pillars,
            thresholds,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RubricRow {
    pillar_id: String,
    pillar_name: String,
    pillar_weight: f64,
    question_id: String,
    question_text: String,
    max_points: u32,
}

#[derive(Debug)]
pub enum RubricImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Empty,
    Inconsistent { line: usize, pillar_id: String },
}

impl std::fmt::Display for RubricImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RubricImportError::Io(err) => write!(f, "failed to read rubric export: {}", err),
            RubricImportError::Csv(err) => write!(f, "invalid rubric CSV data: {}", err),
            RubricImportError::Empty => write!(f, "rubric export contains no questions"),
            RubricImportError::Inconsistent { line, pillar_id } => write!(
                f,
                "line {}: pillar '{}' repeats with a different name or weight",
                line, pillar_id
            ),
        }
    }
}

impl std::error::Error for RubricImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RubricImportError::Io(err) => Some(err),
            RubricImportError::Csv(err) => Some(err),
            RubricImportError::Empty | RubricImportError::Inconsistent { .. } => None,
        }
    }
}

impl From<std::io::Error> for RubricImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RubricImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}
