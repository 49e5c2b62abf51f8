use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::QualificationService;
use crate::cache::CacheStatus;
use crate::error::AppError;
use crate::responses::Response as QuestionResponse;
use crate::rubric::{
    ActorId, ConfigurationId, ConfigurationRepository, ConfigurationStatus, OrganizationId,
    Pillar, PillarId, RubricConfiguration, RubricDefinition, Thresholds,
};
use crate::scoring::EntityId;

/// Header reporting whether a score came from the cache.
pub const SCORE_CACHE_HEADER: &str = "x-score-cache";

/// Router builder exposing rubric administration, scoring, and format conversion.
pub fn qualification_router<R>(service: Arc<QualificationService<R>>) -> Router
where
    R: ConfigurationRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/organizations/:organization_id/rubrics",
            post(save_handler::<R>).get(list_handler::<R>),
        )
        .route(
            "/api/v1/organizations/:organization_id/rubrics/active",
            get(active_handler::<R>),
        )
        .route(
            "/api/v1/organizations/:organization_id/rubrics/history",
            get(history_handler::<R>),
        )
        .route(
            "/api/v1/organizations/:organization_id/rubrics/:version",
            get(version_handler::<R>),
        )
        .route(
            "/api/v1/organizations/:organization_id/rubrics/:version/activate",
            post(activate_handler::<R>),
        )
        .route(
            "/api/v1/organizations/:organization_id/rubrics/:version/restore",
            post(restore_handler::<R>),
        )
        .route(
            "/api/v1/organizations/:organization_id/entities/:entity_id/score",
            post(score_handler::<R>),
        )
        .route(
            "/api/v1/organizations/:organization_id/responses/simple",
            post(simple_handler::<R>),
        )
        .route(
            "/api/v1/organizations/:organization_id/responses/comprehensive",
            post(comprehensive_handler::<R>),
        )
        .route(
            "/api/v1/organizations/:organization_id/responses/rehydrate",
            post(rehydrate_handler::<R>),
        )
        .route(
            "/api/v1/admin/score-cache",
            get(cache_stats_handler::<R>).delete(cache_clear_handler::<R>),
        )
        .with_state(service)
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveRubricRequest {
    pub actor_id: ActorId,
    pub pillars: Vec<Pillar>,
    pub thresholds: Thresholds,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActorRequest {
    pub actor_id: ActorId,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub configuration_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreRequest {
    pub responses: Vec<QuestionResponse>,
    #[serde(default)]
    pub config_version: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimpleFormatRequest {
    pub responses: Vec<QuestionResponse>,
    #[serde(default)]
    pub config_version: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComprehensiveFormatRequest {
    pub pillar_id: PillarId,
    pub text: String,
    #[serde(default)]
    pub config_version: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RehydrateRequest {
    pub pillar_id: PillarId,
    pub text: String,
    #[serde(default)]
    pub existing: Vec<QuestionResponse>,
    #[serde(default)]
    pub config_version: Option<u32>,
}

/// Listing view of a stored rubric version.
#[derive(Debug, Clone, Serialize)]
pub struct VersionSummary {
    pub configuration_id: ConfigurationId,
    pub version: u32,
    pub status: ConfigurationStatus,
    pub pillar_count: usize,
    pub created_at: DateTime<Utc>,
    pub created_by: ActorId,
    pub activated_at: Option<DateTime<Utc>>,
    pub restored_from: Option<u32>,
}

impl From<&RubricConfiguration> for VersionSummary {
    fn from(configuration: &RubricConfiguration) -> Self {
        Self {
            configuration_id: configuration.id.clone(),
            version: configuration.version,
            status: configuration.status(),
            pillar_count: configuration.pillars.len(),
            created_at: configuration.created_at,
            created_by: configuration.created_by.clone(),
            activated_at: configuration.activated_at,
            restored_from: configuration.restored_from,
        }
    }
}

pub(crate) async fn save_handler<R>(
    State(service): State<Arc<QualificationService<R>>>,
    Path(organization_id): Path<String>,
    Json(request): Json<SaveRubricRequest>,
) -> Response
where
    R: ConfigurationRepository + 'static,
{
    let organization_id = OrganizationId::new(organization_id);
    let definition = RubricDefinition {
        pillars: request.pillars,
        thresholds: request.thresholds,
    };

    match service.store().save_configuration(
        &organization_id,
        definition,
        &request.actor_id,
        request.reason,
    ) {
        Ok(saved) => (StatusCode::CREATED, Json(saved)).into_response(),
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn list_handler<R>(
    State(service): State<Arc<QualificationService<R>>>,
    Path(organization_id): Path<String>,
) -> Response
where
    R: ConfigurationRepository + 'static,
{
    let organization_id = OrganizationId::new(organization_id);
    match service.store().list_versions(&organization_id) {
        Ok(versions) => {
            let summaries: Vec<VersionSummary> = versions.iter().map(VersionSummary::from).collect();
            (StatusCode::OK, Json(summaries)).into_response()
        }
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn active_handler<R>(
    State(service): State<Arc<QualificationService<R>>>,
    Path(organization_id): Path<String>,
) -> Response
where
    R: ConfigurationRepository + 'static,
{
    let organization_id = OrganizationId::new(organization_id);
    match service.store().get_active_configuration(&organization_id) {
        Ok(configuration) => (StatusCode::OK, Json(configuration)).into_response(),
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn version_handler<R>(
    State(service): State<Arc<QualificationService<R>>>,
    Path((organization_id, version)): Path<(String, u32)>,
) -> Response
where
    R: ConfigurationRepository + 'static,
{
    let organization_id = OrganizationId::new(organization_id);
    match service.store().get_configuration(&organization_id, version) {
        Ok(configuration) => (StatusCode::OK, Json(configuration)).into_response(),
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn activate_handler<R>(
    State(service): State<Arc<QualificationService<R>>>,
    Path((organization_id, version)): Path<(String, u32)>,
    Json(request): Json<ActorRequest>,
) -> Response
where
    R: ConfigurationRepository + 'static,
{
    let organization_id = OrganizationId::new(organization_id);
    match service
        .store()
        .activate_configuration(&organization_id, version, &request.actor_id)
    {
        Ok(configuration) => {
            (StatusCode::OK, Json(VersionSummary::from(&configuration))).into_response()
        }
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn restore_handler<R>(
    State(service): State<Arc<QualificationService<R>>>,
    Path((organization_id, version)): Path<(String, u32)>,
    Json(request): Json<ActorRequest>,
) -> Response
where
    R: ConfigurationRepository + 'static,
{
    let organization_id = OrganizationId::new(organization_id);
    match service.store().restore_configuration(
        &organization_id,
        version,
        &request.actor_id,
        request.reason,
    ) {
        Ok(saved) => (StatusCode::CREATED, Json(saved)).into_response(),
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn history_handler<R>(
    State(service): State<Arc<QualificationService<R>>>,
    Path(organization_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response
where
    R: ConfigurationRepository + 'static,
{
    let organization_id = OrganizationId::new(organization_id);
    let configuration_id = query.configuration_id.map(ConfigurationId::new);
    match service
        .store()
        .get_history(&organization_id, configuration_id.as_ref())
    {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn score_handler<R>(
    State(service): State<Arc<QualificationService<R>>>,
    Path((organization_id, entity_id)): Path<(String, String)>,
    Json(request): Json<ScoreRequest>,
) -> Response
where
    R: ConfigurationRepository + 'static,
{
    let organization_id = OrganizationId::new(organization_id);
    let entity_id = EntityId::new(entity_id);

    if let Some(version) = request.config_version {
        return match service.score_with_version(
            &entity_id,
            &request.responses,
            &organization_id,
            version,
        ) {
            Ok(assessment) => (StatusCode::OK, Json(assessment)).into_response(),
            Err(error) => AppError::from(error).into_response(),
        };
    }

    match service.get_score(&entity_id, &request.responses, &organization_id) {
        Ok(lookup) => {
            let marker = match lookup.status {
                CacheStatus::Hit => "hit",
                CacheStatus::Miss => "miss",
            };
            let mut response = (StatusCode::OK, Json(lookup.assessment)).into_response();
            response
                .headers_mut()
                .insert(SCORE_CACHE_HEADER, HeaderValue::from_static(marker));
            response
        }
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn simple_handler<R>(
    State(service): State<Arc<QualificationService<R>>>,
    Path(organization_id): Path<String>,
    Json(request): Json<SimpleFormatRequest>,
) -> Response
where
    R: ConfigurationRepository + 'static,
{
    let organization_id = OrganizationId::new(organization_id);
    match service.to_simple_format(&organization_id, &request.responses, request.config_version) {
        Ok(blobs) => (StatusCode::OK, Json(blobs)).into_response(),
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn comprehensive_handler<R>(
    State(service): State<Arc<QualificationService<R>>>,
    Path(organization_id): Path<String>,
    Json(request): Json<ComprehensiveFormatRequest>,
) -> Response
where
    R: ConfigurationRepository + 'static,
{
    let organization_id = OrganizationId::new(organization_id);
    match service.to_comprehensive_format(
        &organization_id,
        &request.pillar_id,
        &request.text,
        request.config_version,
    ) {
        Ok(parse) => (StatusCode::OK, Json(parse)).into_response(),
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn rehydrate_handler<R>(
    State(service): State<Arc<QualificationService<R>>>,
    Path(organization_id): Path<String>,
    Json(request): Json<RehydrateRequest>,
) -> Response
where
    R: ConfigurationRepository + 'static,
{
    let organization_id = OrganizationId::new(organization_id);
    match service.rehydrate_responses(
        &organization_id,
        &request.pillar_id,
        &request.text,
        &request.existing,
        request.config_version,
    ) {
        Ok((responses, warnings)) => {
            let payload = json!({
                "pillar_id": request.pillar_id,
                "responses": responses,
                "warnings": warnings,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn cache_stats_handler<R>(
    State(service): State<Arc<QualificationService<R>>>,
) -> Response
where
    R: ConfigurationRepository + 'static,
{
    (StatusCode::OK, Json(service.cache().stats())).into_response()
}

pub(crate) async fn cache_clear_handler<R>(
    State(service): State<Arc<QualificationService<R>>>,
) -> Response
where
    R: ConfigurationRepository + 'static,
{
    let cleared = service.cache().clear();
    tracing::info!(cleared, "score cache cleared");
    (StatusCode::OK, Json(json!({ "cleared": cleared }))).into_response()
}
