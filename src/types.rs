use serde::{Deserialize, Serialize};

use crate::pipeline::processing::normalize::family::JobFamily;

/// Deterministic identifier of a canonical employer or job (first 32 bits of
/// the SHA-256 of the canonical name).
pub type EntityId = u32;

/// Synthetic identity produced by the linker: the ordinal of the chain start.
pub type PersonId = u64;

/// One disclosed person-year as delivered by the ingestion collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub year: i32,
    pub sector: String,
    pub last_name: String,
    pub first_name: String,
    pub employer_raw: String,
    pub job_title_raw: String,
    pub salary: f64,
    pub benefits: f64,
}

impl RawRecord {
    pub fn total_comp(&self) -> f64 {
        self.salary + self.benefits
    }

    /// Linkage key: `upper(first + " " + last)`, trimmed.
    pub fn name_key(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .to_uppercase()
            .trim()
            .to_string()
    }
}

/// A canonical employer or job, shared by both registries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub id: EntityId,
    pub canonical_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<JobFamily>,
}

/// A raw record after employer and job resolution, before linkage.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub raw: RawRecord,
    pub employer_id: EntityId,
    pub employer_canonical: String,
    pub job_id: EntityId,
    pub job_canonical: String,
    pub job_family: JobFamily,
}

impl CanonicalRecord {
    pub fn total_comp(&self) -> f64 {
        self.raw.total_comp()
    }
}

/// The terminal, denormalized unit of the fact table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRecord {
    pub year: i32,
    pub person_id: PersonId,
    pub employer_id: EntityId,
    pub job_id: EntityId,
    pub sector: String,
    pub salary: f64,
    pub benefits: f64,
    pub total_comp: f64,
    pub first_name: String,
    pub last_name: String,
    pub employer_canonical: String,
    pub job_canonical: String,
}
