use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{NewConfiguration, OrganizationId, RubricConfiguration};
use super::history::ConfigHistoryEntry;
use super::repository::{ActivationRecord, ConfigurationRepository, RepositoryError};

#[derive(Default)]
struct MemoryState {
    configurations: HashMap<OrganizationId, Vec<RubricConfiguration>>,
    history: Vec<ConfigHistoryEntry>,
}

/// Process-local repository. A single mutex plays the role of the storage
/// transaction, so the active flag is never observed half-moved and no change
/// is visible without its history entry.
#[derive(Default)]
pub struct MemoryConfigurationRepository {
    state: Mutex<MemoryState>,
}

impl MemoryConfigurationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("configuration state poisoned".to_string()))
    }
}

impl ConfigurationRepository for MemoryConfigurationRepository {
    fn insert_next<F>(
        &self,
        organization_id: &OrganizationId,
        configuration: NewConfiguration,
        record: F,
    ) -> Result<RubricConfiguration, RepositoryError>
    where
        F: FnOnce(Option<&RubricConfiguration>, &RubricConfiguration) -> ConfigHistoryEntry,
    {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let versions = state
            .configurations
            .entry(organization_id.clone())
            .or_default();
        let head = versions.last();
        let next_version = head.map(|latest| latest.version + 1).unwrap_or(1);

        let stored = configuration.into_configuration(organization_id, next_version);
        let entry = record(head, &stored);
        versions.push(stored.clone());
        state.history.push(entry);
        Ok(stored)
    }

    fn fetch(
        &self,
        organization_id: &OrganizationId,
        version: u32,
    ) -> Result<Option<RubricConfiguration>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .configurations
            .get(organization_id)
            .and_then(|versions| versions.iter().find(|config| config.version == version))
            .cloned())
    }

    fn versions(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<RubricConfiguration>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .configurations
            .get(organization_id)
            .cloned()
            .unwrap_or_default())
    }

    fn active(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<RubricConfiguration>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .configurations
            .get(organization_id)
            .and_then(|versions| versions.iter().find(|config| config.is_active))
            .cloned())
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
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let versions = state
            .configurations
            .get_mut(organization_id)
            .ok_or(RepositoryError::NotFound)?;

        if !versions.iter().any(|config| config.version == version) {
            return Err(RepositoryError::NotFound);
        }

        let current_active = versions
            .iter()
            .find(|config| config.is_active)
            .map(|config| config.version);
        if current_active != expected_active {
            return Err(RepositoryError::Conflict);
        }

        let mut previous = None;
        let mut activated = None;
        for config in versions.iter_mut() {
            if config.version == version {
                config.is_active = true;
                config.activated_at = Some(activated_at);
                activated = Some(config.clone());
            } else if config.is_active {
                config.is_active = false;
                previous = Some(config.clone());
            }
        }

        let activated = activated.ok_or(RepositoryError::NotFound)?;
        let change = ActivationRecord {
            previous,
            activated,
        };
        state.history.push(record(&change));
        Ok(change)
    }

    fn history(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<ConfigHistoryEntry>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .history
            .iter()
            .filter(|entry| &entry.organization_id == organization_id)
            .cloned()
            .collect())
    }
}
