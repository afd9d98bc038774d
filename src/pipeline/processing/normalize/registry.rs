use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

use super::family::JobFamily;
use crate::types::{CanonicalEntity, EntityId};

/// Deterministic id of a canonical name: the first four bytes of the SHA-256
/// digest of its UTF-8 bytes, read as a big-endian `u32`.
///
/// No collision resolution is attempted. Two distinct canonical names may map
/// to the same id with birthday-bound probability at this width.
pub fn entity_id(canonical_name: &str) -> EntityId {
    let digest = Sha256::digest(canonical_name.as_bytes());
    EntityId::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Write-once cache of canonical entities for one pipeline run.
///
/// The first registration of a canonical name wins; repeats are no-ops.
/// Safe to share across worker threads.
#[derive(Debug)]
pub struct EntityRegistry {
    kind: &'static str,
    entries: RwLock<HashMap<String, CanonicalEntity>>,
}

impl EntityRegistry {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn id_for(&self, canonical_name: &str) -> EntityId {
        entity_id(canonical_name)
    }

    /// Register a canonical name (and optional derived family) and return its id.
    pub fn register(&self, canonical_name: &str, family: Option<JobFamily>) -> EntityId {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entity) = entries.get(canonical_name) {
                return entity.id;
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry(canonical_name.to_string())
            .or_insert_with(|| CanonicalEntity {
                id: entity_id(canonical_name),
                canonical_name: canonical_name.to_string(),
                family,
            })
            .id
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The deduplicated entity table, ordered by canonical name.
    pub fn entities(&self) -> Vec<CanonicalEntity> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut entities: Vec<CanonicalEntity> = entries.values().cloned().collect();
        entities.sort_by(|a, b| a.canonical_name.cmp(&b.canonical_name));
        debug!("{} registry holds {} entities", self.kind, entities.len());
        entities
    }
}
