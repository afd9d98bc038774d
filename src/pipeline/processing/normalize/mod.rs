use rayon::prelude::*;
use tracing::{debug, info};

pub mod alias;
pub mod canonicalizer;
pub mod family;
pub mod registry;

pub use alias::{AliasResolver, AliasTable, Resolution};
pub use canonicalizer::{NormalizationProfile, StringCanonicalizer, EMPLOYER_PROFILE, JOB_TITLE_PROFILE};
pub use family::JobFamily;
pub use registry::{entity_id, EntityRegistry};

use crate::observability::metrics::{emit_counter, emit_gauge, MetricName};
use crate::types::{CanonicalEntity, CanonicalRecord, RawRecord};

/// Output of the canonicalization stage.
#[derive(Debug, Clone)]
pub struct CanonicalizationOutput {
    pub records: Vec<CanonicalRecord>,
    /// Deduplicated employer table, ordered by canonical name.
    pub employers: Vec<CanonicalEntity>,
    /// Deduplicated job table with inferred family, ordered by canonical name.
    pub jobs: Vec<CanonicalEntity>,
    pub employer_alias_hits: usize,
    pub job_alias_hits: usize,
}

/// Resolves employer and job fields of raw records to canonical entities.
///
/// Employer and job resolution are independent: each has its own resolver
/// and registry.
pub struct Canonicalizer {
    employer_resolver: AliasResolver,
    job_resolver: AliasResolver,
    employers: EntityRegistry,
    jobs: EntityRegistry,
}

impl Canonicalizer {
    pub fn new(employer_aliases: AliasTable, job_aliases: AliasTable) -> Self {
        Self {
            employer_resolver: AliasResolver::new(StringCanonicalizer::employer(), employer_aliases),
            job_resolver: AliasResolver::new(StringCanonicalizer::job_title(), job_aliases),
            employers: EntityRegistry::new("employer"),
            jobs: EntityRegistry::new("job"),
        }
    }

    /// Resolve one record. Returns the record plus whether each field hit an alias.
    pub fn canonicalize(&self, raw: RawRecord) -> (CanonicalRecord, bool, bool) {
        let employer = self.employer_resolver.resolve_detailed(&raw.employer_raw);
        let job = self.job_resolver.resolve_detailed(&raw.job_title_raw);
        let job_family = JobFamily::infer(&job.canonical);

        let employer_id = self.employers.register(&employer.canonical, None);
        let job_id = self.jobs.register(&job.canonical, Some(job_family));

        let record = CanonicalRecord {
            raw,
            employer_id,
            employer_canonical: employer.canonical,
            job_id,
            job_canonical: job.canonical,
            job_family,
        };
        (record, employer.aliased, job.aliased)
    }

    /// Canonicalize a whole batch. Record order is preserved.
    pub fn run(self, raw_records: Vec<RawRecord>) -> CanonicalizationOutput {
        let input_len = raw_records.len();
        info!("Canonicalizing {} raw records", input_len);

        let resolved: Vec<(CanonicalRecord, bool, bool)> = raw_records
            .into_par_iter()
            .map(|raw| self.canonicalize(raw))
            .collect();

        let employer_alias_hits = resolved.iter().filter(|(_, e, _)| *e).count();
        let job_alias_hits = resolved.iter().filter(|(_, _, j)| *j).count();
        let records: Vec<CanonicalRecord> = resolved.into_iter().map(|(r, _, _)| r).collect();

        let employers = self.employers.entities();
        let jobs = self.jobs.entities();

        emit_counter(MetricName::CanonicalizeRecordsProcessed, input_len as u64);
        emit_counter(
            MetricName::CanonicalizeAliasHits,
            (employer_alias_hits + job_alias_hits) as u64,
        );
        emit_gauge(MetricName::CanonicalizeEmployersRegistered, employers.len() as f64);
        emit_gauge(MetricName::CanonicalizeJobsRegistered, jobs.len() as f64);

        debug!(
            "Alias hits: {} employer, {} job",
            employer_alias_hits, job_alias_hits
        );
        info!(
            "Canonicalized {} records into {} employers and {} jobs",
            records.len(),
            employers.len(),
            jobs.len()
        );

        CanonicalizationOutput {
            records,
            employers,
            jobs,
            employer_alias_hits,
            job_alias_hits,
        }
    }
}

/// Convenience wrapper: canonicalize a batch with the given alias tables.
pub fn canonicalize_records(
    raw_records: Vec<RawRecord>,
    employer_aliases: AliasTable,
    job_aliases: AliasTable,
) -> CanonicalizationOutput {
    Canonicalizer::new(employer_aliases, job_aliases).run(raw_records)
}
