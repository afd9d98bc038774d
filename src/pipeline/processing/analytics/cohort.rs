use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::stats::{median, Distribution, Percentile, EMPLOYER_PERCENTILES, JOB_PERCENTILES};
use crate::types::{EntityId, FactRecord, PersonId};

/// Backward-looking cohort dynamics of one employer-year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortDynamics {
    pub stayed_count: usize,
    pub retention_rate: f64,
    pub growth_median: f64,
}

impl CohortDynamics {
    /// Values reported when no prior cohort exists.
    pub fn zero() -> Self {
        Self {
            stayed_count: 0,
            retention_rate: 0.0,
            growth_median: 0.0,
        }
    }
}

/// Per-key, per-year distribution plus optional cohort dynamics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortMetric {
    pub year: i32,
    #[serde(flatten)]
    pub distribution: Distribution,
    #[serde(flatten)]
    pub cohort: Option<CohortDynamics>,
}

/// Metrics grouped by key, each holding a year-ordered series.
pub type GroupedMetrics<K> = BTreeMap<K, Vec<CohortMetric>>;

pub fn retention_rate(stayed_count: usize, current_headcount: usize) -> f64 {
    if current_headcount == 0 {
        0.0
    } else {
        stayed_count as f64 / current_headcount as f64
    }
}

/// Relative change from the prior compensation. `None` when the prior value
/// gives no finite ratio.
///
/// A zero prior would give an infinite ratio. That pair still counts as
/// stayed but is left out of the growth median, which keeps every published
/// median finite and representable in JSON.
pub fn growth_ratio(prior_total_comp: f64, current_total_comp: f64) -> Option<f64> {
    if prior_total_comp == 0.0 || !prior_total_comp.is_finite() {
        return None;
    }
    let ratio = (current_total_comp - prior_total_comp) / prior_total_comp;
    ratio.is_finite().then_some(ratio)
}

#[derive(Default)]
struct EmployerYearAccumulator {
    total_comps: Vec<f64>,
    stayed_count: usize,
    growth: Vec<f64>,
}

/// Employer × year distributions with retention and growth against the most
/// recent prior record of the same (person, employer) pair.
///
/// Years are processed in ascending order. The prior population for year Y
/// holds, for each (person_id, employer_id), the record from the latest year
/// before Y; among several records of that year the last occurrence in the
/// fact stream wins. The first dataset year reports zero dynamics.
pub fn employer_metrics(facts: &[FactRecord]) -> GroupedMetrics<EntityId> {
    let mut by_year: BTreeMap<i32, Vec<&FactRecord>> = BTreeMap::new();
    for fact in facts {
        by_year.entry(fact.year).or_default().push(fact);
    }

    let mut prior: HashMap<(PersonId, EntityId), f64> = HashMap::new();
    let mut output: GroupedMetrics<EntityId> = BTreeMap::new();

    for (index, (year, current)) in by_year.into_iter().enumerate() {
        let is_first_year = index == 0;
        let mut per_employer: BTreeMap<EntityId, EmployerYearAccumulator> = BTreeMap::new();

        for fact in &current {
            let acc = per_employer.entry(fact.employer_id).or_default();
            acc.total_comps.push(fact.total_comp);

            if let Some(prior_comp) = prior.get(&(fact.person_id, fact.employer_id)) {
                acc.stayed_count += 1;
                if let Some(ratio) = growth_ratio(*prior_comp, fact.total_comp) {
                    acc.growth.push(ratio);
                }
            }
        }

        debug!("Employer cohorts for {}: {} employers", year, per_employer.len());

        for (employer_id, acc) in per_employer {
            let distribution = Distribution::compute(&acc.total_comps, EMPLOYER_PERCENTILES);
            let cohort = if is_first_year {
                CohortDynamics::zero()
            } else {
                CohortDynamics {
                    stayed_count: acc.stayed_count,
                    retention_rate: retention_rate(acc.stayed_count, distribution.headcount),
                    growth_median: median(&acc.growth).unwrap_or(0.0),
                }
            };
            output.entry(employer_id).or_default().push(CohortMetric {
                year,
                distribution,
                cohort: Some(cohort),
            });
        }

        // This year becomes the most recent prior for every pair it contains.
        for fact in &current {
            prior.insert((fact.person_id, fact.employer_id), fact.total_comp);
        }
    }

    output
}

/// Pure distributional metrics per key × year.
pub fn distribution_metrics<K, F>(
    facts: &[FactRecord],
    key_fn: F,
    percentiles: &[Percentile],
) -> GroupedMetrics<K>
where
    K: Ord + Clone + Send + Sync,
    F: Fn(&FactRecord) -> K,
{
    let mut groups: BTreeMap<(K, i32), Vec<f64>> = BTreeMap::new();
    for fact in facts {
        groups
            .entry((key_fn(fact), fact.year))
            .or_default()
            .push(fact.total_comp);
    }

    let computed: Vec<((K, i32), Distribution)> = groups
        .into_iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(key, values)| (key, Distribution::compute(&values, percentiles)))
        .collect();

    let mut output: GroupedMetrics<K> = BTreeMap::new();
    for ((key, year), distribution) in computed {
        output.entry(key).or_default().push(CohortMetric {
            year,
            distribution,
            cohort: None,
        });
    }
    output
}

pub fn job_metrics(facts: &[FactRecord]) -> GroupedMetrics<EntityId> {
    distribution_metrics(facts, |f| f.job_id, JOB_PERCENTILES)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(person_id: PersonId, employer_id: EntityId, year: i32, total_comp: f64) -> FactRecord {
        FactRecord {
            year,
            person_id,
            employer_id,
            job_id: 7,
            sector: "Hospitals".to_string(),
            salary: total_comp,
            benefits: 0.0,
            total_comp,
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            employer_canonical: format!("EMPLOYER {}", employer_id),
            job_canonical: "NURSE".to_string(),
        }
    }

    fn dynamics(metric: &CohortMetric) -> &CohortDynamics {
        metric.cohort.as_ref().expect("employer metrics carry cohort dynamics")
    }

    #[test]
    fn test_first_year_dynamics_are_zero() {
        let facts = vec![fact(1, 10, 2000, 100.0), fact(2, 20, 2000, 200.0), fact(1, 10, 2001, 110.0)];
        let metrics = employer_metrics(&facts);
        for series in metrics.values() {
            let first = &series[0];
            assert_eq!(first.year, 2000);
            assert_eq!(dynamics(first), &CohortDynamics::zero());
        }
    }

    #[test]
    fn test_retention_arithmetic() {
        let mut facts = Vec::new();
        for person in 1..=10 {
            facts.push(fact(person, 1, 2010, 100_000.0));
        }
        for person in 1..=4 {
            facts.push(fact(person, 1, 2011, 110_000.0));
        }
        for person in 11..=16 {
            facts.push(fact(person, 1, 2011, 120_000.0));
        }

        let metrics = employer_metrics(&facts);
        let y2011 = &metrics[&1][1];
        assert_eq!(y2011.distribution.headcount, 10);
        assert_eq!(dynamics(y2011).stayed_count, 4);
        assert_eq!(dynamics(y2011).retention_rate, 0.4);
        assert!((dynamics(y2011).growth_median - 0.1).abs() < 1e-12);
        assert_eq!(retention_rate(4, 10), 0.4);
        assert_eq!(retention_rate(0, 0), 0.0);
    }

    #[test]
    fn test_lookback_uses_most_recent_prior_year() {
        // Person 1 at employer 5: 2000 -> 100, 2001 -> 200, gap in 2002, 2003 -> 300.
        let facts = vec![
            fact(1, 5, 2000, 100.0),
            fact(1, 5, 2001, 200.0),
            fact(9, 6, 2002, 50.0),
            fact(1, 5, 2003, 300.0),
        ];
        let metrics = employer_metrics(&facts);
        let series = &metrics[&5];
        let years: Vec<i32> = series.iter().map(|m| m.year).collect();
        assert_eq!(years, vec![2000, 2001, 2003]);
        assert_eq!(dynamics(&series[1]).growth_median, 1.0);
        assert_eq!(dynamics(&series[2]).retention_rate, 1.0);
        assert_eq!(dynamics(&series[2]).growth_median, 0.5);
    }

    #[test]
    fn test_duplicate_prior_rows_last_occurrence_wins() {
        let facts = vec![
            fact(1, 5, 2000, 100.0),
            fact(1, 5, 2000, 400.0),
            fact(1, 5, 2001, 200.0),
        ];
        let metrics = employer_metrics(&facts);
        assert_eq!(dynamics(&metrics[&5][1]).growth_median, -0.5);
    }

    #[test]
    fn test_retention_requires_same_employer() {
        let facts = vec![fact(1, 5, 2000, 100.0), fact(1, 6, 2001, 200.0)];
        let metrics = employer_metrics(&facts);
        let moved_to = &metrics[&6][0];
        assert_eq!(dynamics(moved_to).stayed_count, 0);
        assert_eq!(dynamics(moved_to).retention_rate, 0.0);
        assert_eq!(dynamics(moved_to).growth_median, 0.0);
    }

    #[test]
    fn test_zero_prior_comp_counts_as_stayed_without_growth() {
        let facts = vec![fact(1, 5, 2000, 0.0), fact(1, 5, 2001, 200.0)];
        let metrics = employer_metrics(&facts);
        let y2001 = dynamics(&metrics[&5][1]);
        assert_eq!(y2001.stayed_count, 1);
        assert_eq!(y2001.retention_rate, 1.0);
        assert_eq!(y2001.growth_median, 0.0);
    }

    #[test]
    fn test_job_metrics_have_no_cohort_fields() {
        let facts = vec![fact(1, 5, 2001, 300.0), fact(2, 5, 2000, 100.0), fact(3, 6, 2000, 200.0)];
        let metrics = job_metrics(&facts);
        let series = &metrics[&7];
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].year, 2000);
        assert_eq!(series[0].distribution.headcount, 2);
        assert_eq!(series[0].distribution.mean_pay, 150.0);
        assert!(series.iter().all(|m| m.cohort.is_none()));

        let json = serde_json::to_value(&series[0]).unwrap();
        assert!(json.get("retention_rate").is_none());
        assert_eq!(json["p50"], 150.0);
    }

    #[test]
    fn test_employer_metric_serializes_flat() {
        let facts = vec![fact(1, 5, 2000, 100.0)];
        let metrics = employer_metrics(&facts);
        let json = serde_json::to_value(&metrics).unwrap();
        let row = &json["5"][0];
        assert_eq!(row["year"], 2000);
        assert_eq!(row["retention_rate"], 0.0);
        assert_eq!(row["p99"], 100.0);
    }
}
