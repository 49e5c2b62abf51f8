mod router;

pub use router::{qualification_router, SCORE_CACHE_HEADER};

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use crate::cache::{CacheKey, CacheLookup, ScoreCache};
use crate::responses::{self, NormalizeError, ParseAmbiguityWarning, PillarParse, Response};
use crate::rubric::{
    ConfigurationRepository, ConfigurationStore, OrganizationId, PillarId, RubricConfiguration,
    StoreError, WeightPolicy,
};
use crate::scoring::{compute_score, AssessmentResult, EntityId, UnknownQuestionReference};

/// Facade composing the configuration store, the scoring engine, and the cache.
pub struct QualificationService<R> {
    store: ConfigurationStore<R>,
    cache: Arc<ScoreCache>,
}

impl<R> QualificationService<R>
where
    R: ConfigurationRepository + 'static,
{
    pub fn new(repository: Arc<R>, policy: WeightPolicy, cache: Arc<ScoreCache>) -> Self {
        Self::from_store(ConfigurationStore::new(repository, policy), cache)
    }

    pub fn from_store(store: ConfigurationStore<R>, cache: Arc<ScoreCache>) -> Self {
        Self { store, cache }
    }

    pub fn store(&self) -> &ConfigurationStore<R> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<ScoreCache> {
        &self.cache
    }

    /// Score `responses` against the organization's active rubric.
    ///
    /// The store is read before the cache is touched. Repeat calls with the
    /// same responses and active version are served from the cache until the
    /// entry expires.
    pub fn get_score(
        &self,
        entity_id: &EntityId,
        responses: &[Response],
        organization_id: &OrganizationId,
    ) -> Result<CacheLookup, QualificationError> {
        let configuration = self.store.get_active_configuration(organization_id)?;
        let key = CacheKey::new(organization_id, entity_id, configuration.version, responses);

        Ok(self
            .cache
            .get_or_compute(key, || score(entity_id, responses, &configuration)))
    }

    /// Score against a stored version without consulting the cache, so a past
    /// assessment can be reproduced exactly.
    pub fn score_with_version(
        &self,
        entity_id: &EntityId,
        responses: &[Response],
        organization_id: &OrganizationId,
        version: u32,
    ) -> Result<AssessmentResult, QualificationError> {
        let configuration = self.store.get_configuration(organization_id, version)?;
        Ok(score(entity_id, responses, &configuration))
    }

    pub fn to_simple_format(
        &self,
        organization_id: &OrganizationId,
        responses: &[Response],
        version: Option<u32>,
    ) -> Result<BTreeMap<PillarId, String>, QualificationError> {
        let configuration = self.resolve(organization_id, version)?;
        Ok(responses::to_simple_format(responses, &configuration))
    }

    pub fn to_comprehensive_format(
        &self,
        organization_id: &OrganizationId,
        pillar_id: &PillarId,
        text: &str,
        version: Option<u32>,
    ) -> Result<PillarParse, QualificationError> {
        let configuration = self.resolve(organization_id, version)?;
        Ok(responses::to_comprehensive_format(pillar_id, text, &configuration)?)
    }

    pub fn rehydrate_responses(
        &self,
        organization_id: &OrganizationId,
        pillar_id: &PillarId,
        text: &str,
        existing: &[Response],
        version: Option<u32>,
    ) -> Result<(Vec<Response>, Vec<ParseAmbiguityWarning>), QualificationError> {
        let configuration = self.resolve(organization_id, version)?;
        Ok(responses::rehydrate_responses(
            pillar_id,
            text,
            &configuration,
            existing,
        )?)
    }

    fn resolve(
        &self,
        organization_id: &OrganizationId,
        version: Option<u32>,
    ) -> Result<RubricConfiguration, StoreError> {
        match version {
            Some(version) => self.store.get_configuration(organization_id, version),
            None => self.store.get_active_configuration(organization_id),
        }
    }
}

fn score(
    entity_id: &EntityId,
    responses: &[Response],
    configuration: &RubricConfiguration,
) -> AssessmentResult {
    let outcome = compute_score(responses, configuration);
    for reference in &outcome.unknown_references {
        log_unknown_reference(entity_id, reference);
    }
    AssessmentResult::new(entity_id.clone(), outcome.scorecard, Utc::now())
}

fn log_unknown_reference(entity_id: &EntityId, reference: &UnknownQuestionReference) {
    warn!(
        entity = %entity_id,
        pillar = %reference.pillar_id,
        question = %reference.question_id,
        version = reference.config_version,
        "ignoring response for question outside the rubric"
    );
}

/// Error raised by the qualification service.
#[derive(Debug, thiserror::Error)]
pub enum QualificationError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

#[cfg(test)]
mod tests;
