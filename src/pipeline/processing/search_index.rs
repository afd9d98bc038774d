use serde::Serialize;

use crate::pipeline::processing::normalize::JobFamily;
use crate::types::{CanonicalEntity, EntityId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployerEntry {
    pub id: EntityId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobEntry {
    pub id: EntityId,
    pub title: String,
    pub family: JobFamily,
}

/// Lookup table for front-end search, built from the entity tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchIndex {
    pub employers: Vec<EmployerEntry>,
    pub jobs: Vec<JobEntry>,
}

impl SearchIndex {
    pub fn build(employers: &[CanonicalEntity], jobs: &[CanonicalEntity]) -> Self {
        Self {
            employers: employers
                .iter()
                .map(|e| EmployerEntry {
                    id: e.id,
                    name: e.canonical_name.clone(),
                })
                .collect(),
            jobs: jobs
                .iter()
                .map(|j| JobEntry {
                    id: j.id,
                    title: j.canonical_name.clone(),
                    family: j.family.unwrap_or(JobFamily::Other),
                })
                .collect(),
        }
    }
}
