use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    ActorId, ConfigurationId, OrganizationId, Pillar, PillarId, QuestionId, RubricConfiguration,
    Thresholds,
};
use super::repository::ActivationRecord;

/// Kind of mutation recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Created,
    Activated,
    RolledBack,
}

impl ChangeType {
    pub fn label(&self) -> &'static str {
        match self {
            ChangeType::Created => "created",
            ChangeType::Activated => "activated",
            ChangeType::RolledBack => "rolled_back",
        }
    }
}

/// Append-only audit record for a single configuration mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigHistoryEntry {
    pub configuration_id: ConfigurationId,
    pub organization_id: OrganizationId,
    pub change_type: ChangeType,
    pub previous_version: Option<u32>,
    pub new_version: u32,
    pub diff: ConfigurationDiff,
    pub before: Option<RubricConfiguration>,
    pub after: RubricConfiguration,
    pub actor_id: ActorId,
    pub recorded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ConfigHistoryEntry {
    /// Entry for a newly stored version, diffed against the version that was
    /// the organization's latest when it was inserted.
    pub fn stored(
        change_type: ChangeType,
        head: Option<&RubricConfiguration>,
        stored: &RubricConfiguration,
        actor_id: &ActorId,
        recorded_at: DateTime<Utc>,
        reason: Option<String>,
    ) -> Self {
        Self {
            configuration_id: stored.id.clone(),
            organization_id: stored.organization_id.clone(),
            change_type,
            previous_version: head.map(|config| config.version),
            new_version: stored.version,
            diff: ConfigurationDiff::between(head, stored),
            before: head.cloned(),
            after: stored.clone(),
            actor_id: actor_id.clone(),
            recorded_at,
            reason,
        }
    }

    pub fn activation(
        record: &ActivationRecord,
        actor_id: &ActorId,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            configuration_id: record.activated.id.clone(),
            organization_id: record.activated.organization_id.clone(),
            change_type: ChangeType::Activated,
            previous_version: record.previous.as_ref().map(|config| config.version),
            new_version: record.activated.version,
            diff: ConfigurationDiff::between(record.previous.as_ref(), &record.activated),
            before: record.previous.clone(),
            after: record.activated.clone(),
            actor_id: actor_id.clone(),
            recorded_at,
            reason: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdChange {
    pub before: Thresholds,
    pub after: Thresholds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightChange {
    pub pillar_id: PillarId,
    pub before: f64,
    pub after: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRef {
    pub pillar_id: PillarId,
    pub question_id: QuestionId,
}

/// Structured difference between two rubric snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationDiff {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<ThresholdChange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pillars_added: Vec<PillarId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pillars_removed: Vec<PillarId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pillars_renamed: Vec<PillarId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weights_changed: Vec<WeightChange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions_added: Vec<QuestionRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions_removed: Vec<QuestionRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions_changed: Vec<QuestionRef>,
}

impl ConfigurationDiff {
    /// Compare two snapshots. A missing `before` treats every pillar as added.
    pub fn between(before: Option<&RubricConfiguration>, after: &RubricConfiguration) -> Self {
        let Some(before) = before else {
            return Self {
                pillars_added: after.pillars.iter().map(|pillar| pillar.id.clone()).collect(),
                ..Self::default()
            };
        };

        let mut diff = Self::default();

        if before.thresholds != after.thresholds {
            diff.thresholds = Some(ThresholdChange {
                before: before.thresholds,
                after: after.thresholds,
            });
        }

        let previous: BTreeMap<&PillarId, &Pillar> = before
            .pillars
            .iter()
            .map(|pillar| (&pillar.id, pillar))
            .collect();

        for pillar in &after.pillars {
            match previous.get(&pillar.id) {
                None => diff.pillars_added.push(pillar.id.clone()),
                Some(old) => diff.compare_pillar(old, pillar),
            }
        }

        for pillar in &before.pillars {
            if after.pillar(&pillar.id).is_none() {
                diff.pillars_removed.push(pillar.id.clone());
            }
        }

        diff
    }

    fn compare_pillar(&mut self, old: &Pillar, new: &Pillar) {
        if old.name != new.name {
            self.pillars_renamed.push(new.id.clone());
        }

        if old.weight != new.weight {
            self.weights_changed.push(WeightChange {
                pillar_id: new.id.clone(),
                before: old.weight,
                after: new.weight,
            });
        }

        for question in &new.questions {
            let reference = QuestionRef {
                pillar_id: new.id.clone(),
                question_id: question.id.clone(),
            };
            match old.question(&question.id) {
                None => self.questions_added.push(reference),
                Some(previous) if previous != question => self.questions_changed.push(reference),
                Some(_) => {}
            }
        }

        for question in &old.questions {
            if new.question(&question.id).is_none() {
                self.questions_removed.push(QuestionRef {
                    pillar_id: old.id.clone(),
                    question_id: question.id.clone(),
                });
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_none()
            && self.pillars_added.is_empty()
            && self.pillars_removed.is_empty()
            && self.pillars_renamed.is_empty()
            && self.weights_changed.is_empty()
            && self.questions_added.is_empty()
            && self.questions_removed.is_empty()
            && self.questions_changed.is_empty()
    }

    /// One-line human summary, e.g. "2 pillar(s) added; thresholds changed".
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "no rubric changes".to_string();
        }

        let counts = [
            (self.pillars_added.len(), "pillar(s) added"),
            (self.pillars_removed.len(), "pillar(s) removed"),
            (self.pillars_renamed.len(), "pillar(s) renamed"),
            (self.weights_changed.len(), "weight(s) changed"),
            (self.questions_added.len(), "question(s) added"),
            (self.questions_removed.len(), "question(s) removed"),
            (self.questions_changed.len(), "question(s) changed"),
        ];

        let mut parts: Vec<String> = counts
            .iter()
            .filter(|(count, _)| *count > 0)
            .map(|(count, label)| format!("{count} {label}"))
            .collect();
        if self.thresholds.is_some() {
            parts.push("thresholds changed".to_string());
        }
        parts.join("; ")
    }
}
