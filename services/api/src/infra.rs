use metrics_exporter_prometheus::PrometheusHandle;
use qualify::config::ScoringConfig;
use qualify::rubric::{MemoryConfigurationRepository, RubricDefinition};
use qualify::{
    ActorId, OrganizationId, Pillar, PillarId, QualificationService, Question, QuestionId,
    ScoreCache, StoreError, Thresholds,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type MemoryQualificationService = QualificationService<MemoryConfigurationRepository>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn build_service(config: &ScoringConfig) -> Arc<MemoryQualificationService> {
    let cache = Arc::new(ScoreCache::new(config.cache_settings()));
    Arc::new(QualificationService::new(
        Arc::new(MemoryConfigurationRepository::new()),
        config.weight_policy,
        cache,
    ))
}

/// Save and activate the default rubric for `organization_id`.
pub(crate) fn seed_organization(
    service: &MemoryQualificationService,
    organization_id: &OrganizationId,
    actor_id: &ActorId,
) -> Result<u32, StoreError> {
    let saved = service.store().save_configuration(
        organization_id,
        default_rubric(),
        actor_id,
        Some("default MEDDPICC rubric".to_string()),
    )?;
    service
        .store()
        .activate_configuration(organization_id, saved.version, actor_id)?;
    Ok(saved.version)
}

pub(crate) fn default_thresholds() -> Thresholds {
    Thresholds {
        low: 70.0,
        medium: 50.0,
        high: 30.0,
    }
}

/// Eight MEDDPICC pillars, weights totalling 100.
pub(crate) fn default_rubric() -> RubricDefinition {
    RubricDefinition {
        pillars: vec![
            pillar(
                "metrics",
                "Metrics",
                15.0,
                &[
                    ("m1", "What quantified value does the customer expect?", 10),
                    ("m2", "How will success be measured after go-live?", 5),
                ],
            ),
            pillar(
                "economic_buyer",
                "Economic Buyer",
                15.0,
                &[
                    ("eb1", "Who has final authority over the budget?", 10),
                    ("eb2", "Have we met the economic buyer directly?", 5),
                ],
            ),
            pillar(
                "decision_criteria",
                "Decision Criteria",
                10.0,
                &[("dc1", "Which technical and business criteria will be used?", 10)],
            ),
            pillar(
                "decision_process",
                "Decision Process",
                10.0,
                &[
                    ("dp1", "What are the steps and owners from evaluation to signature?", 10),
                    ("dp2", "What is the target decision date?", 5),
                ],
            ),
            pillar(
                "paper_process",
                "Paper Process",
                10.0,
                &[("pp1", "What legal, security, and procurement reviews apply?", 10)],
            ),
            pillar(
                "identify_pain",
                "Identify Pain",
                15.0,
                &[
                    ("ip1", "What business pain is driving the purchase?", 10),
                    ("ip2", "What happens if nothing changes?", 5),
                ],
            ),
            pillar(
                "champion",
                "Champion",
                15.0,
                &[
                    ("ch1", "Who is selling on our behalf internally?", 10),
                    ("ch2", "How has the champion shown influence?", 5),
                ],
            ),
            pillar(
                "competition",
                "Competition",
                10.0,
                &[("co1", "Which alternatives, including doing nothing, are in play?", 10)],
            ),
        ],
        thresholds: default_thresholds(),
    }
}

fn pillar(id: &str, name: &str, weight: f64, questions: &[(&str, &str, u32)]) -> Pillar {
    Pillar {
        id: PillarId::new(id),
        name: name.to_string(),
        weight,
        questions: questions
            .iter()
            .map(|(id, text, max_points)| Question {
                id: QuestionId::new(*id),
                text: text.to_string(),
                max_points: *max_points,
            })
            .collect(),
    }
}
