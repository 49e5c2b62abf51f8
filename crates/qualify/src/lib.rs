//! Versioned qualification rubrics, response normalization, and cached scoring.
//!
//! An organization defines a weighted rubric of pillars and questions. Each edit
//! produces a new immutable version, exactly one of which is active at a time.
//! Scores are computed deterministically against the active version and cached
//! per entity until the responses or the active version change.

pub mod cache;
pub mod config;
pub mod error;
pub mod responses;
pub mod rubric;
pub mod scoring;
pub mod service;
pub mod telemetry;

pub use cache::{CacheSettings, CacheStats, ScoreCache};
pub use responses::{ParseAmbiguityWarning, PillarAnswer, PillarParse, Response};
pub use rubric::{
    ActorId, ConfigurationId, ConfigurationStore, OrganizationId, Pillar, PillarId, Question,
    QuestionId, RubricConfiguration, StoreError, Thresholds, WeightPolicy,
};
pub use scoring::{AssessmentResult, EntityId, PillarBreakdown, RiskLevel};
pub use service::{qualification_router, QualificationError, QualificationService};
