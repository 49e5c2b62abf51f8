use std::sync::Arc;

use axum::response::Response as HttpResponse;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::cache::{CacheSettings, ManualClock, ScoreCache};
use crate::responses::Response;
use crate::rubric::{
    ActorId, MemoryConfigurationRepository, OrganizationId, Pillar, PillarId, Question,
    QuestionId, RubricDefinition, Thresholds, WeightPolicy,
};
use crate::service::QualificationService;

pub(super) type MemoryService = QualificationService<MemoryConfigurationRepository>;

pub(super) fn organization() -> OrganizationId {
    OrganizationId::new("org-acme")
}

pub(super) fn actor() -> ActorId {
    ActorId::new("revops-admin")
}

pub(super) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
        .single()
        .expect("valid instant")
}

fn question(id: &str, text: &str, max_points: u32) -> Question {
    Question {
        id: QuestionId::new(id),
        text: text.to_string(),
        max_points,
    }
}

fn pillar(id: &str, name: &str, weight: f64, questions: Vec<Question>) -> Pillar {
    Pillar {
        id: PillarId::new(id),
        name: name.to_string(),
        weight,
        questions,
    }
}

/// Metrics 40, Economic Buyer 35, Champion 25.
pub(super) fn definition() -> RubricDefinition {
    RubricDefinition {
        pillars: vec![
            pillar(
                "metrics",
                "Metrics",
                40.0,
                vec![
                    question("m1", "What quantified value does the customer expect?", 10),
                    question("m2", "How will success be measured?", 10),
                ],
            ),
            pillar(
                "economic_buyer",
                "Economic Buyer",
                35.0,
                vec![question("eb1", "Who signs off on the budget?", 10)],
            ),
            pillar(
                "champion",
                "Champion",
                25.0,
                vec![question("ch1", "Who is championing the deal?", 10)],
            ),
        ],
        thresholds: Thresholds {
            low: 70.0,
            medium: 50.0,
            high: 30.0,
        },
    }
}

/// Same pillars with the champion pillar reweighted to 35 and metrics to 30.
pub(super) fn reweighted_definition() -> RubricDefinition {
    let mut definition = definition();
    definition.pillars[0].weight = 30.0;
    definition.pillars[2].weight = 35.0;
    definition
}

pub(super) fn response(pillar: &str, question: &str, answer: &str, points: u32) -> Response {
    Response {
        pillar_id: PillarId::new(pillar),
        question_id: QuestionId::new(question),
        answer: answer.to_string(),
        points,
    }
}

pub(super) fn responses() -> Vec<Response> {
    vec![
        response("metrics", "m1", "Cut churn by 4%", 10),
        response("metrics", "m2", "Weekly pipeline review", 5),
        response("champion", "ch1", "VP Sales", 10),
    ]
}

pub(super) fn build_service() -> (Arc<MemoryService>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start()));
    let cache = Arc::new(ScoreCache::with_clock(
        CacheSettings {
            ttl: std::time::Duration::from_secs(300),
            max_entries: 100,
        },
        clock.clone(),
    ));
    let service = QualificationService::new(
        Arc::new(MemoryConfigurationRepository::new()),
        WeightPolicy::default(),
        cache,
    );
    (Arc::new(service), clock)
}

/// Service with version 1 of [`definition`] saved and active.
pub(super) fn seeded_service() -> (Arc<MemoryService>, Arc<ManualClock>) {
    let (service, clock) = build_service();
    service
        .store()
        .save_configuration(&organization(), definition(), &actor(), None)
        .expect("rubric saves");
    service
        .store()
        .activate_configuration(&organization(), 1, &actor())
        .expect("rubric activates");
    (service, clock)
}

pub(super) async fn read_json_body(response: HttpResponse) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
