use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{
    ActorId, ConfigurationId, ConfigurationStatus, NewConfiguration, OrganizationId,
    RubricConfiguration, RubricDefinition, SavedConfiguration,
};
use super::history::{ChangeType, ConfigHistoryEntry};
use super::repository::{ConfigurationRepository, RepositoryError};
use super::validation::{validate, ConfigurationValidationError, WeightPolicy};

/// Versioned rubric storage with validation and an audit trail.
pub struct ConfigurationStore<R> {
    repository: Arc<R>,
    policy: WeightPolicy,
}

impl<R> ConfigurationStore<R>
where
    R: ConfigurationRepository + 'static,
{
    pub fn new(repository: Arc<R>, policy: WeightPolicy) -> Self {
        Self { repository, policy }
    }

    pub fn policy(&self) -> WeightPolicy {
        self.policy
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Validate and persist a new draft version, recording a `created` entry.
    pub fn save_configuration(
        &self,
        organization_id: &OrganizationId,
        definition: RubricDefinition,
        actor_id: &ActorId,
        reason: Option<String>,
    ) -> Result<SavedConfiguration, StoreError> {
        self.persist_version(
            organization_id,
            definition,
            actor_id,
            reason,
            None,
            ChangeType::Created,
        )
    }

    /// Copy an old version's snapshot into a brand-new version.
    pub fn restore_configuration(
        &self,
        organization_id: &OrganizationId,
        version: u32,
        actor_id: &ActorId,
        reason: Option<String>,
    ) -> Result<SavedConfiguration, StoreError> {
        let source = self.get_configuration(organization_id, version)?;
        self.persist_version(
            organization_id,
            source.definition(),
            actor_id,
            reason,
            Some(version),
            ChangeType::RolledBack,
        )
    }

    fn persist_version(
        &self,
        organization_id: &OrganizationId,
        definition: RubricDefinition,
        actor_id: &ActorId,
        reason: Option<String>,
        restored_from: Option<u32>,
        change_type: ChangeType,
    ) -> Result<SavedConfiguration, StoreError> {
        validate(&definition, self.policy)?;

        let now = Utc::now();
        let stored = self.repository.insert_next(
            organization_id,
            NewConfiguration {
                definition,
                created_by: actor_id.clone(),
                created_at: now,
                restored_from,
            },
            |head, stored| {
                ConfigHistoryEntry::stored(change_type, head, stored, actor_id, now, reason)
            },
        )?;

        info!(
            organization = %organization_id,
            version = stored.version,
            change = change_type.label(),
            actor = %actor_id,
            "rubric version stored"
        );

        Ok(SavedConfiguration {
            configuration_id: stored.id,
            version: stored.version,
        })
    }

    /// Move the active flag to `version`. Loses with a conflict error when a
    /// concurrent activation commits between the read and the swap.
    ///
    /// Superseded versions are not reactivated; restore them as a new version.
    pub fn activate_configuration(
        &self,
        organization_id: &OrganizationId,
        version: u32,
        actor_id: &ActorId,
    ) -> Result<RubricConfiguration, StoreError> {
        let current = self.repository.active(organization_id)?;
        if let Some(active) = current.as_ref().filter(|active| active.version == version) {
            return Ok(active.clone());
        }

        // Read after `current`: a later supersession needs an activation,
        // which fails the compare-and-set below.
        let target = self.get_configuration(organization_id, version)?;
        if target.status() == ConfigurationStatus::Superseded {
            return Err(StoreError::SupersededVersion {
                organization_id: organization_id.clone(),
                version,
            });
        }

        let expected_active = current.as_ref().map(|config| config.version);
        let now = Utc::now();
        let record = self
            .repository
            .activate(organization_id, version, expected_active, now, |change| {
                ConfigHistoryEntry::activation(change, actor_id, now)
            })
            .map_err(|err| match err {
                RepositoryError::Conflict => {
                    warn!(
                        organization = %organization_id,
                        version,
                        "rubric activation lost to a concurrent activation"
                    );
                    StoreError::Conflict(ConfigurationConflictError {
                        organization_id: organization_id.clone(),
                        requested_version: version,
                        expected_active,
                    })
                }
                RepositoryError::NotFound => StoreError::VersionNotFound {
                    organization_id: organization_id.clone(),
                    version,
                },
                other => StoreError::Infrastructure(other),
            })?;

        info!(
            organization = %organization_id,
            version,
            previous = ?expected_active,
            actor = %actor_id,
            "rubric version activated"
        );

        Ok(record.activated)
    }

    pub fn get_active_configuration(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<RubricConfiguration, StoreError> {
        self.repository
            .active(organization_id)?
            .ok_or_else(|| StoreError::NoActiveConfiguration {
                organization_id: organization_id.clone(),
            })
    }

    pub fn get_configuration(
        &self,
        organization_id: &OrganizationId,
        version: u32,
    ) -> Result<RubricConfiguration, StoreError> {
        self.repository
            .fetch(organization_id, version)?
            .ok_or_else(|| StoreError::VersionNotFound {
                organization_id: organization_id.clone(),
                version,
            })
    }

    pub fn list_versions(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<RubricConfiguration>, StoreError> {
        Ok(self.repository.versions(organization_id)?)
    }

    /// Audit entries newest first, optionally narrowed to one configuration.
    pub fn get_history(
        &self,
        organization_id: &OrganizationId,
        configuration_id: Option<&ConfigurationId>,
    ) -> Result<Vec<ConfigHistoryEntry>, StoreError> {
        let mut entries = self.repository.history(organization_id)?;
        if let Some(configuration_id) = configuration_id {
            entries.retain(|entry| &entry.configuration_id == configuration_id);
        }
        entries.reverse();
        Ok(entries)
    }
}

/// Raised when another activation for the same organization committed first.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "activation of version {requested_version} for organization {organization_id} lost to a concurrent activation"
)]
pub struct ConfigurationConflictError {
    pub organization_id: OrganizationId,
    pub requested_version: u32,
    pub expected_active: Option<u32>,
}

/// Error raised by the configuration store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ConfigurationValidationError),
    #[error(transparent)]
    Conflict(#[from] ConfigurationConflictError),
    #[error("organization {organization_id} has no active rubric configuration")]
    NoActiveConfiguration { organization_id: OrganizationId },
    #[error("organization {organization_id} has no rubric version {version}")]
    VersionNotFound {
        organization_id: OrganizationId,
        version: u32,
    },
    #[error(
        "version {version} of organization {organization_id} was superseded; restore it as a new version"
    )]
    SupersededVersion {
        organization_id: OrganizationId,
        version: u32,
    },
    #[error("configuration storage unavailable: {0}")]
    Infrastructure(#[from] RepositoryError),
}

impl StoreError {
    /// Conflicts and infrastructure outages may succeed on retry; validation
    /// and lookup failures need different input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict(_) | StoreError::Infrastructure(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::NoActiveConfiguration { .. } | StoreError::VersionNotFound { .. }
        )
    }
}
