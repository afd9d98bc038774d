use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::constants::MAX_LINK_GAP_YEARS;
use crate::observability::metrics::{emit_counter, MetricName};
use crate::types::{CanonicalRecord, FactRecord, PersonId};

/// Confidence attached to an accepted link. The rule set is strict and has no
/// graded scoring, so every accepted link is `High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LinkConfidence {
    High,
}

/// Per-record outcome of the chain scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkDecision {
    /// The record starts a new chain (and therefore a new person id).
    NewChain,
    /// The record continues the chain of its predecessor in scan order.
    Linked(LinkConfidence),
}

/// Output of the linkage stage.
#[derive(Debug, Clone)]
pub struct LinkageOutput {
    /// Facts in global scan order: name key, then year, then total_comp.
    pub facts: Vec<FactRecord>,
    /// Decision for each fact, index-aligned with `facts`.
    pub decisions: Vec<LinkDecision>,
    pub chain_count: u64,
    pub linked_count: usize,
}

impl LinkageOutput {
    /// Accepted links tallied by confidence tag.
    pub fn links_by_confidence(&self) -> BTreeMap<LinkConfidence, usize> {
        let mut tally = BTreeMap::new();
        for decision in &self.decisions {
            if let LinkDecision::Linked(confidence) = decision {
                *tally.entry(*confidence).or_insert(0) += 1;
            }
        }
        tally
    }
}

/// Links per-year records into "same individual" chains using only the name
/// key, employer id and year.
///
/// Records are partitioned by identical name key (no cross-group linking),
/// each group is ordered by (year, total_comp), and a record links to its
/// immediate predecessor iff both share the employer id and are at most
/// two years apart. Person ids count chain starts in global scan order.
#[derive(Debug, Default)]
pub struct IdentityLinker;

impl IdentityLinker {
    pub fn new() -> Self {
        Self
    }

    pub fn should_link(previous: &CanonicalRecord, current: &CanonicalRecord) -> bool {
        previous.raw.name_key() == current.raw.name_key()
            && previous.employer_id == current.employer_id
            && current.raw.year - previous.raw.year <= MAX_LINK_GAP_YEARS
    }

    pub fn link(&self, records: Vec<CanonicalRecord>) -> LinkageOutput {
        let record_count = records.len();

        // Partition by name key; BTreeMap fixes the global group order and
        // push order keeps input order within a group.
        let mut groups: BTreeMap<String, Vec<CanonicalRecord>> = BTreeMap::new();
        for record in records {
            groups.entry(record.raw.name_key()).or_default().push(record);
        }
        let group_count = groups.len();
        debug!("Linking {} records across {} name groups", record_count, group_count);

        // Groups are independent; the scan inside each group is sequential.
        let scanned: Vec<(Vec<CanonicalRecord>, Vec<LinkDecision>)> = groups
            .into_values()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(scan_group)
            .collect();

        let mut facts = Vec::with_capacity(record_count);
        let mut decisions = Vec::with_capacity(record_count);
        let mut chain_count: PersonId = 0;
        let mut linked_count = 0usize;

        for (group, group_decisions) in scanned {
            for (record, decision) in group.into_iter().zip(group_decisions) {
                match decision {
                    LinkDecision::NewChain => chain_count += 1,
                    LinkDecision::Linked(_) => linked_count += 1,
                }
                facts.push(to_fact(record, chain_count));
                decisions.push(decision);
            }
        }

        emit_counter(MetricName::LinkChainsStarted, chain_count);
        emit_counter(MetricName::LinkRecordsLinked, linked_count as u64);
        info!(
            "Linked {} records into {} person chains ({} links, {} name groups)",
            record_count, chain_count, linked_count, group_count
        );

        LinkageOutput {
            facts,
            decisions,
            chain_count,
            linked_count,
        }
    }
}

/// Order one name group by (year, total_comp) and decide each record's link.
fn scan_group(mut group: Vec<CanonicalRecord>) -> (Vec<CanonicalRecord>, Vec<LinkDecision>) {
    // Stable sort: exact (year, total_comp) ties keep input order.
    group.sort_by(|a, b| {
        a.raw
            .year
            .cmp(&b.raw.year)
            .then_with(|| a.total_comp().total_cmp(&b.total_comp()))
    });

    let decisions = group
        .iter()
        .enumerate()
        .map(|(i, record)| {
            if i > 0 && IdentityLinker::should_link(&group[i - 1], record) {
                LinkDecision::Linked(LinkConfidence::High)
            } else {
                LinkDecision::NewChain
            }
        })
        .collect();

    (group, decisions)
}

fn to_fact(record: CanonicalRecord, person_id: PersonId) -> FactRecord {
    let total_comp = record.total_comp();
    let CanonicalRecord {
        raw,
        employer_id,
        employer_canonical,
        job_id,
        job_canonical,
        ..
    } = record;

    FactRecord {
        year: raw.year,
        person_id,
        employer_id,
        job_id,
        sector: raw.sector,
        salary: raw.salary,
        benefits: raw.benefits,
        total_comp,
        first_name: raw.first_name,
        last_name: raw.last_name,
        employer_canonical,
        job_canonical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::normalize::{entity_id, JobFamily};
    use crate::types::RawRecord;
    use proptest::prelude::*;

    /// Facts grouped by person id.
    fn person_chains(facts: &[FactRecord]) -> BTreeMap<PersonId, Vec<&FactRecord>> {
        let mut chains: BTreeMap<PersonId, Vec<&FactRecord>> = BTreeMap::new();
        for fact in facts {
            chains.entry(fact.person_id).or_default().push(fact);
        }
        chains
    }

    fn record(first: &str, last: &str, employer: &str, year: i32, salary: f64) -> CanonicalRecord {
        CanonicalRecord {
            raw: RawRecord {
                year,
                sector: "Universities".to_string(),
                last_name: last.to_string(),
                first_name: first.to_string(),
                employer_raw: employer.to_string(),
                job_title_raw: "Professor".to_string(),
                salary,
                benefits: 0.0,
            },
            employer_id: entity_id(employer),
            employer_canonical: employer.to_string(),
            job_id: entity_id("PROFESSOR"),
            job_canonical: "PROFESSOR".to_string(),
            job_family: JobFamily::Academic,
        }
    }

    fn link(records: Vec<CanonicalRecord>) -> LinkageOutput {
        IdentityLinker::new().link(records)
    }

    #[test]
    fn test_gap_of_two_links_gap_of_three_does_not() {
        let output = link(vec![
            record("John", "Smith", "ACME", 1996, 120_000.0),
            record("John", "Smith", "ACME", 1998, 130_000.0),
        ]);
        assert_eq!(output.facts[0].person_id, output.facts[1].person_id);
        assert_eq!(output.decisions[1], LinkDecision::Linked(LinkConfidence::High));
        assert_eq!(output.links_by_confidence().get(&LinkConfidence::High), Some(&1));

        let output = link(vec![
            record("John", "Smith", "ACME", 1996, 120_000.0),
            record("John", "Smith", "ACME", 1999, 130_000.0),
        ]);
        assert_ne!(output.facts[0].person_id, output.facts[1].person_id);
        assert_eq!(output.chain_count, 2);
    }

    #[test]
    fn test_employer_change_splits_chain() {
        let output = link(vec![
            record("John", "Smith", "ACME", 1996, 120_000.0),
            record("John", "Smith", "HYDRO ONE", 1997, 130_000.0),
            record("John", "Smith", "ACME", 1998, 140_000.0),
        ]);
        let ids: Vec<PersonId> = output.facts.iter().map(|f| f.person_id).collect();
        // The 1998 ACME record compares only to its predecessor (HYDRO ONE).
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_names_never_link_across_groups() {
        let output = link(vec![
            record("Jon", "Smith", "ACME", 1996, 120_000.0),
            record("John", "Smith", "ACME", 1997, 120_000.0),
        ]);
        assert_ne!(output.facts[0].person_id, output.facts[1].person_id);
    }

    #[test]
    fn test_name_key_is_case_insensitive_and_trimmed() {
        let output = link(vec![
            record("john", "smith ", "ACME", 1996, 120_000.0),
            record("JOHN", "SMITH", "ACME", 1997, 125_000.0),
        ]);
        assert_eq!(output.chain_count, 1);
    }

    #[test]
    fn test_person_ids_are_dense_chain_start_ordinals_in_scan_order() {
        let output = link(vec![
            record("Zoe", "Adams", "ACME", 2001, 100_000.0),
            record("Amy", "Brown", "ACME", 2003, 100_000.0),
            record("Amy", "Brown", "ACME", 2001, 100_000.0),
            record("Amy", "Brown", "ACME", 2010, 100_000.0),
        ]);
        let summary: Vec<(&str, i32, PersonId)> = output
            .facts
            .iter()
            .map(|f| (f.first_name.as_str(), f.year, f.person_id))
            .collect();
        assert_eq!(
            summary,
            vec![("Amy", 2001, 1), ("Amy", 2003, 1), ("Amy", 2010, 2), ("Zoe", 2001, 3)]
        );
        assert_eq!(output.chain_count, 3);
        assert_eq!(output.linked_count, 1);
    }

    #[test]
    fn test_same_year_duplicates_order_by_total_comp() {
        let output = link(vec![
            record("Ann", "Lee", "ACME", 2005, 150_000.0),
            record("Ann", "Lee", "ACME", 2005, 101_000.0),
        ]);
        assert_eq!(output.facts[0].total_comp, 101_000.0);
        assert_eq!(output.facts[1].total_comp, 150_000.0);
        assert_eq!(output.chain_count, 1);
    }

    #[test]
    fn test_singleton_group_is_own_chain() {
        let output = link(vec![record("Solo", "Person", "ACME", 2000, 100_000.0)]);
        assert_eq!(output.facts[0].person_id, 1);
        assert_eq!(output.decisions, vec![LinkDecision::NewChain]);
        assert_eq!(person_chains(&output.facts).len(), 1);
    }

    #[test]
    fn test_empty_input() {
        let output = link(Vec::new());
        assert!(output.facts.is_empty());
        assert_eq!(output.chain_count, 0);
    }

    fn arb_record() -> impl Strategy<Value = CanonicalRecord> {
        (
            prop::sample::select(vec!["Ann", "Bob"]),
            prop::sample::select(vec!["ACME", "CITY TORONTO", "HYDRO ONE"]),
            1996i32..2010,
            100_000u32..200_000,
        )
            .prop_map(|(first, employer, year, salary)| {
                record(first, "Smith", employer, year, salary as f64)
            })
    }

    proptest! {
        #[test]
        fn prop_shared_person_id_implies_same_name_and_employer(
            records in prop::collection::vec(arb_record(), 0..40)
        ) {
            let output = link(records);
            for records in person_chains(&output.facts).values() {
                let first = records[0];
                for fact in records {
                    prop_assert_eq!(fact.employer_id, first.employer_id);
                    prop_assert_eq!(&fact.first_name, &first.first_name);
                }
                for pair in records.windows(2) {
                    prop_assert!(pair[1].year - pair[0].year <= MAX_LINK_GAP_YEARS);
                }
            }
        }

        #[test]
        fn prop_person_ids_are_dense(records in prop::collection::vec(arb_record(), 1..40)) {
            let output = link(records);
            let mut previous = 0;
            for fact in &output.facts {
                prop_assert!(fact.person_id == previous || fact.person_id == previous + 1);
                previous = fact.person_id;
            }
            prop_assert_eq!(previous, output.chain_count);
        }
    }
}
