use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};

use chrono::{DateTime, Utc};

use crate::rubric::{
    ActivationRecord, ActorId, ConfigHistoryEntry, ConfigurationRepository, ConfigurationStore,
    MemoryConfigurationRepository, NewConfiguration, OrganizationId, Pillar, PillarId, Question,
    QuestionId, RepositoryError, RubricConfiguration, RubricDefinition, Thresholds, WeightPolicy,
};

pub(super) fn organization() -> OrganizationId {
    OrganizationId::new("org-acme")
}

pub(super) fn actor() -> ActorId {
    ActorId::new("admin-1")
}

pub(super) fn thresholds() -> Thresholds {
    Thresholds {
        low: 70.0,
        medium: 50.0,
        high: 30.0,
    }
}

pub(super) fn question(id: &str, text: &str, max_points: u32) -> Question {
    Question {
        id: QuestionId::new(id),
        text: text.to_string(),
        max_points,
    }
}

pub(super) fn pillar(id: &str, name: &str, weight: f64, questions: Vec<Question>) -> Pillar {
    Pillar {
        id: PillarId::new(id),
        name: name.to_string(),
        weight,
        questions,
    }
}

pub(super) fn definition() -> RubricDefinition {
    RubricDefinition {
        pillars: vec![
            pillar(
                "metrics",
                "Metrics",
                40.0,
                vec![
                    question("m1", "What quantified value does the customer expect?", 10),
                    question("m2", "How will success be measured?", 5),
                ],
            ),
            pillar(
                "economic_buyer",
                "Economic Buyer",
                35.0,
                vec![question("eb1", "Who is the economic buyer?", 10)],
            ),
            pillar(
                "champion",
                "Champion",
                25.0,
                vec![question("ch1", "Who is championing the deal?", 10)],
            ),
        ],
        thresholds: thresholds(),
    }
}

pub(super) fn build_store() -> (
    ConfigurationStore<MemoryConfigurationRepository>,
    Arc<MemoryConfigurationRepository>,
) {
    let repository = Arc::new(MemoryConfigurationRepository::new());
    let store = ConfigurationStore::new(repository.clone(), WeightPolicy::default());
    (store, repository)
}

pub(super) fn active_count(
    repository: &impl ConfigurationRepository,
    organization_id: &OrganizationId,
) -> usize {
    repository
        .versions(organization_id)
        .expect("versions load")
        .iter()
        .filter(|config| config.is_active)
        .count()
}

pub(crate) struct UnavailableRepository;

impl ConfigurationRepository for UnavailableRepository {
    fn insert_next<F>(
        &self,
        _organization_id: &OrganizationId,
        _configuration: NewConfiguration,
        _record: F,
    ) -> Result<RubricConfiguration, RepositoryError>
    where
        F: FnOnce(Option<&RubricConfiguration>, &RubricConfiguration) -> ConfigHistoryEntry,
    {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(
        &self,
        _organization_id: &OrganizationId,
        _version: u32,
    ) -> Result<Option<RubricConfiguration>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn versions(
        &self,
        _organization_id: &OrganizationId,
    ) -> Result<Vec<RubricConfiguration>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn active(
        &self,
        _organization_id: &OrganizationId,
    ) -> Result<Option<RubricConfiguration>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn activate<F>(
        &self,
        _organization_id: &OrganizationId,
        _version: u32,
        _expected_active: Option<u32>,
        _activated_at: DateTime<Utc>,
        _record: F,
    ) -> Result<ActivationRecord, RepositoryError>
    where
        F: FnOnce(&ActivationRecord) -> ConfigHistoryEntry,
    {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn history(
        &self,
        _organization_id: &OrganizationId,
    ) -> Result<Vec<ConfigHistoryEntry>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Holds every caller at the barrier right after it reads the active version,
/// so concurrent activations all race on the same snapshot.
pub(super) struct RacingRepository {
    pub(super) inner: MemoryConfigurationRepository,
    pub(super) barrier: Barrier,
}

impl ConfigurationRepository for RacingRepository {
    fn insert_next<F>(
        &self,
        organization_id: &OrganizationId,
        configuration: NewConfiguration,
        record: F,
    ) -> Result<RubricConfiguration, RepositoryError>
    where
        F: FnOnce(Option<&RubricConfiguration>, &RubricConfiguration) -> ConfigHistoryEntry,
    {
        self.inner.insert_next(organization_id, configuration, record)
    }

    fn fetch(
        &self,
        organization_id: &OrganizationId,
        version: u32,
    ) -> Result<Option<RubricConfiguration>, RepositoryError> {
        self.inner.fetch(organization_id, version)
    }

    fn versions(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<RubricConfiguration>, RepositoryError> {
        self.inner.versions(organization_id)
    }

    fn active(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<RubricConfiguration>, RepositoryError> {
        let active = self.inner.active(organization_id);
        self.barrier.wait();
        active
    }

    fn activate<F>(
        &self,
        organization_id: &OrganizationId,
        version: u32,
        expected_active: Option<u32>,
        activated_at: DateTime<Utc>,
        record: F,
    ) -> Result<ActivationRecord, RepositoryError>
    where
        F: FnOnce(&ActivationRecord) -> ConfigHistoryEntry,
    {
        self.inner
            .activate(organization_id, version, expected_active, activated_at, record)
    }

    fn history(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<ConfigHistoryEntry>, RepositoryError> {
        self.inner.history(organization_id)
    }
}

/// Memory repository whose audit log can be taken offline. While offline every
/// write fails as a whole, the way a transactional store rolls back.
#[derive(Default)]
pub(super) struct AuditOutageRepository {
    pub(super) inner: MemoryConfigurationRepository,
    pub(super) audit_offline: AtomicBool,
}

impl AuditOutageRepository {
    fn audit_available(&self) -> Result<(), RepositoryError> {
        if self.audit_offline.load(Ordering::SeqCst) {
            Err(RepositoryError::Unavailable("audit log offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl ConfigurationRepository for AuditOutageRepository {
    fn insert_next<F>(
        &self,
        organization_id: &OrganizationId,
        configuration: NewConfiguration,
        record: F,
    ) -> Result<RubricConfiguration, RepositoryError>
    where
        F: FnOnce(Option<&RubricConfiguration>, &RubricConfiguration) -> ConfigHistoryEntry,
    {
        self.audit_available()?;
        self.inner.insert_next(organization_id, configuration, record)
    }

    fn fetch(
        &self,
        organization_id: &OrganizationId,
        version: u32,
    ) -> Result<Option<RubricConfiguration>, RepositoryError> {
        self.inner.fetch(organization_id, version)
    }

    fn versions(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<RubricConfiguration>, RepositoryError> {
        self.inner.versions(organization_id)
    }

    fn active(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<RubricConfiguration>, RepositoryError> {
        self.inner.active(organization_id)
    }

    fn activate<F>(
        &self,
        organization_id: &OrganizationId,
        version: u32,
        expected_active: Option<u32>,
        activated_at: DateTime<Utc>,
        record: F,
    ) -> Result<ActivationRecord, RepositoryError>
    where
        F: FnOnce(&ActivationRecord) -> ConfigHistoryEntry,
    {
        self.audit_available()?;
        self.inner
            .activate(organization_id, version, expected_active, activated_at, record)
    }

    fn history(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<ConfigHistoryEntry>, RepositoryError> {
        self.inner.history(organization_id)
    }
}
