use chrono::{DateTime, Utc};

use super::domain::{NewConfiguration, OrganizationId, RubricConfiguration};
use super::history::ConfigHistoryEntry;

/// Result of a committed activation: the version that lost the active flag
/// (if any) and the version that now holds it.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationRecord {
    pub previous: Option<RubricConfiguration>,
    pub activated: RubricConfiguration,
}

/// Storage abstraction for rubric versions and their audit trail.
///
/// Every write commits the state change together with the history entry
/// built by `record`; if either cannot be stored, neither is. `insert_next`
/// allocates strictly increasing versions per organization and hands `record`
/// the version that was the latest inside the same transaction. `activate` is
/// an atomic compare-and-set: the flag moves only if the organization's active
/// version still equals `expected_active`, otherwise
/// `RepositoryError::Conflict` is returned and nothing changes.
pub trait ConfigurationRepository: Send + Sync {
    fn insert_next<F>(
        &self,
        organization_id: &OrganizationId,
        configuration: NewConfiguration,
        record: F,
    ) -> Result<RubricConfiguration, RepositoryError>
    where
        F: FnOnce(Option<&RubricConfiguration>, &RubricConfiguration) -> ConfigHistoryEntry;

    fn fetch(
        &self,
        organization_id: &OrganizationId,
        version: u32,
    ) -> Result<Option<RubricConfiguration>, RepositoryError>;

    /// All versions for the organization, oldest first.
    fn versions(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<RubricConfiguration>, RepositoryError>;

    fn active(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<RubricConfiguration>, RepositoryError>;

    fn activate<F>(
        &self,
        organization_id: &OrganizationId,
        version: u32,
        expected_active: Option<u32>,
        activated_at: DateTime<Utc>,
        record: F,
    ) -> Result<ActivationRecord, RepositoryError>
    where
        F: FnOnce(&ActivationRecord) -> ConfigHistoryEntry;

    /// History entries for the organization in append order.
    fn history(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<ConfigHistoryEntry>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("concurrent update detected")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
