use std::collections::BTreeMap;

use super::{PillarBreakdown, UnknownQuestionReference};
use crate::responses::Response;
use crate::rubric::{PillarId, QuestionId, RubricConfiguration};

pub(crate) fn score_pillars(
    responses: &[Response],
    configuration: &RubricConfiguration,
) -> (Vec<PillarBreakdown>, f64, Vec<UnknownQuestionReference>) {
    let mut latest: BTreeMap<(&PillarId, &QuestionId), &Response> = BTreeMap::new();
    let mut unknown_references = Vec::new();

    for response in responses {
        let known = configuration
            .pillar(&response.pillar_id)
            .and_then(|pillar| pillar.question(&response.question_id))
            .is_some();

        if known {
            latest.insert((&response.pillar_id, &response.question_id), response);
        } else {
            unknown_references.push(UnknownQuestionReference {
                pillar_id: response.pillar_id.clone(),
                question_id: response.question_id.clone(),
                config_version: configuration.version,
            });
        }
    }

    let mut breakdown = Vec::with_capacity(configuration.pillars.len());
    let mut total_score = 0.0;

    for pillar in &configuration.pillars {
        let max_points = pillar.max_points();
        let mut earned: u32 = 0;
        let mut answered_questions = 0;

        for question in &pillar.questions {
            if let Some(response) = latest.get(&(&pillar.id, &question.id)) {
                if response.is_answered() {
                    answered_questions += 1;
                    earned = earned.saturating_add(response.awarded_points());
                }
            }
        }

        let raw_points = earned.min(max_points);
        let contribution = if max_points == 0 {
            0.0
        } else {
            f64::from(raw_points) / f64::from(max_points) * pillar.weight
        };
        total_score += contribution;

        breakdown.push(PillarBreakdown {
            pillar_id: pillar.id.clone(),
            pillar_name: pillar.name.clone(),
            weight: pillar.weight,
            raw_points,
            max_points,
            answered_questions,
            total_questions: pillar.questions.len(),
            contribution,
        });
    }

    (breakdown, total_score, unknown_references)
}
