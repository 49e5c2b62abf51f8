//! Versioned rubric definitions, validation, and the configuration audit trail.
//!
//! Every save produces a new immutable version. Activation moves a single
//! per-organization flag through an atomic compare-and-set in the repository,
//! and each mutation appends a history entry with before/after snapshots.

pub mod domain;
pub mod history;
pub mod import;
pub mod memory;
pub mod repository;
pub mod store;
pub mod validation;

#[cfg(test)]
pub(crate) mod tests;

pub use domain::{
    ActorId, ConfigurationId, ConfigurationStatus, NewConfiguration, OrganizationId, Pillar,
    PillarId, Question, QuestionId, RubricConfiguration, RubricDefinition, SavedConfiguration,
    Thresholds,
};
pub use history::{
    ChangeType, ConfigHistoryEntry, ConfigurationDiff, QuestionRef, ThresholdChange, WeightChange,
};
pub use import::{RubricImportError, RubricImporter};
pub use memory::MemoryConfigurationRepository;
pub use repository::{ActivationRecord, ConfigurationRepository, RepositoryError};
pub use store::{ConfigurationConflictError, ConfigurationStore, StoreError};
pub use validation::{validate, ConfigurationValidationError, ValidationIssue, WeightPolicy};
