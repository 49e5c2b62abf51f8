use std::fmt::Write as _;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::responses::Response;
use crate::rubric::OrganizationId;
use crate::scoring::EntityId;

/// Identity of a cached assessment.
///
/// Any change to the submitted responses or to the organization's active rubric
/// version yields a different key, so stale entries are never read again and
/// simply age out through the sweep.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CacheKey {
    pub organization_id: OrganizationId,
    pub entity_id: EntityId,
    pub config_version: u32,
    pub responses_digest: String,
}

impl CacheKey {
    pub fn new(
        organization_id: &OrganizationId,
        entity_id: &EntityId,
        config_version: u32,
        responses: &[Response],
    ) -> Self {
        Self {
            organization_id: organization_id.clone(),
            entity_id: entity_id.clone(),
            config_version,
            responses_digest: responses_digest(responses),
        }
    }
}

/// Hex SHA-256 over the responses in submission order. Order is significant
/// because a later response for the same question overrides an earlier one.
pub fn responses_digest(responses: &[Response]) -> String {
    let mut hasher = Sha256::new();
    for response in responses {
        hasher.update(response.pillar_id.as_str().as_bytes());
        hasher.update([0x1f]);
        hasher.update(response.question_id.as_str().as_bytes());
        hasher.update([0x1f]);
        hasher.update(response.answer.as_bytes());
        hasher.update([0x1f]);
        hasher.update(response.points.to_le_bytes());
        hasher.update([0x1e]);
    }

    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}
