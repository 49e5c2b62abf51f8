use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Tenant that owns a rubric lineage.
    OrganizationId
);
string_id!(
    /// Authenticated caller recorded on every configuration mutation.
    ActorId
);
string_id!(PillarId);
string_id!(QuestionId);
string_id!(
    /// Stable identifier of one stored rubric version.
    ConfigurationId
);

impl ConfigurationId {
    pub fn for_version(organization_id: &OrganizationId, version: u32) -> Self {
        Self(format!("{}:v{}", organization_id, version))
    }
}

/// Single rubric question and the most points an answer can earn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub max_points: u32,
}

/// Weighted qualification category owning an ordered list of questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pillar {
    pub id: PillarId,
    pub name: String,
    pub weight: f64,
    pub questions: Vec<Question>,
}

impl Pillar {
    pub fn max_points(&self) -> u32 {
        self.questions
            .iter()
            .fold(0u32, |total, question| total.saturating_add(question.max_points))
    }

    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|question| &question.id == id)
    }
}

/// Score cutoffs for the risk bands. Valid only when `low > medium > high`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Thresholds {
    pub fn is_strictly_decreasing(&self) -> bool {
        self.low > self.medium && self.medium > self.high
    }

    pub fn is_finite(&self) -> bool {
        self.low.is_finite() && self.medium.is_finite() && self.high.is_finite()
    }
}

/// The editable part of a rubric: what an administrator submits on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricDefinition {
    pub pillars: Vec<Pillar>,
    pub thresholds: Thresholds,
}

impl RubricDefinition {
    pub fn total_weight(&self) -> f64 {
        self.pillars.iter().map(|pillar| pillar.weight).sum()
    }
}

/// Lifecycle of a stored version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationStatus {
    Draft,
    Active,
    Superseded,
}

impl ConfigurationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ConfigurationStatus::Draft => "draft",
            ConfigurationStatus::Active => "active",
            ConfigurationStatus::Superseded => "superseded",
        }
    }
}

/// Immutable, versioned rubric snapshot. Only the activation fields change
/// after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricConfiguration {
    pub id: ConfigurationId,
    pub organization_id: OrganizationId,
    pub version: u32,
    pub pillars: Vec<Pillar>,
    pub thresholds: Thresholds,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: ActorId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored_from: Option<u32>,
}

impl RubricConfiguration {
    pub fn status(&self) -> ConfigurationStatus {
        match (self.is_active, self.activated_at) {
            (true, _) => ConfigurationStatus::Active,
            (false, Some(_)) => ConfigurationStatus::Superseded,
            (false, None) => ConfigurationStatus::Draft,
        }
    }

    pub fn pillar(&self, id: &PillarId) -> Option<&Pillar> {
        self.pillars.iter().find(|pillar| &pillar.id == id)
    }

    pub fn definition(&self) -> RubricDefinition {
        RubricDefinition {
            pillars: self.pillars.clone(),
            thresholds: self.thresholds,
        }
    }
}

/// Input for a new version; the repository assigns the version number.
#[derive(Debug, Clone, PartialEq)]
pub struct NewConfiguration {
    pub definition: RubricDefinition,
    pub created_by: ActorId,
    pub created_at: DateTime<Utc>,
    pub restored_from: Option<u32>,
}

impl NewConfiguration {
    pub(crate) fn into_configuration(
        self,
        organization_id: &OrganizationId,
        version: u32,
    ) -> RubricConfiguration {
        RubricConfiguration {
            id: ConfigurationId::for_version(organization_id, version),
            organization_id: organization_id.clone(),
            version,
            pillars: self.definition.pillars,
            thresholds: self.definition.thresholds,
            is_active: false,
            created_at: self.created_at,
            created_by: self.created_by,
            activated_at: None,
            restored_from: self.restored_from,
        }
    }
}

/// Identifiers handed back to callers after a successful save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedConfiguration {
    pub configuration_id: ConfigurationId,
    pub version: u32,
}
