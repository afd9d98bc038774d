use serde::Serialize;
use std::collections::BTreeMap;

use super::stats::{Distribution, YEAR_SUMMARY_PERCENTILES};
use crate::types::{FactRecord, PersonId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearSummary {
    pub year: i32,
    #[serde(flatten)]
    pub distribution: Distribution,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopEarner {
    pub rank: usize,
    pub person_id: PersonId,
    pub first_name: String,
    pub last_name: String,
    pub employer_canonical: String,
    pub job_canonical: String,
    pub total_comp: f64,
    pub salary: f64,
    pub benefits: f64,
}

fn by_year(facts: &[FactRecord]) -> BTreeMap<i32, Vec<&FactRecord>> {
    let mut years: BTreeMap<i32, Vec<&FactRecord>> = BTreeMap::new();
    for fact in facts {
        years.entry(fact.year).or_default().push(fact);
    }
    years
}

/// One distribution row per year, ascending.
pub fn year_summary(facts: &[FactRecord]) -> Vec<YearSummary> {
    by_year(facts)
        .into_iter()
        .map(|(year, rows)| {
            let values: Vec<f64> = rows.iter().map(|f| f.total_comp).collect();
            YearSummary {
                year,
                distribution: Distribution::compute(&values, YEAR_SUMMARY_PERCENTILES),
            }
        })
        .collect()
}

/// Highest `limit` earners per year. Equal `total_comp` keeps fact order.
pub fn top_earners(facts: &[FactRecord], limit: usize) -> BTreeMap<i32, Vec<TopEarner>> {
    by_year(facts)
        .into_iter()
        .map(|(year, mut rows)| {
            rows.sort_by(|a, b| b.total_comp.total_cmp(&a.total_comp));
            let ranked = rows
                .into_iter()
                .take(limit)
                .enumerate()
                .map(|(i, f)| TopEarner {
                    rank: i + 1,
                    person_id: f.person_id,
                    first_name: f.first_name.clone(),
                    last_name: f.last_name.clone(),
                    employer_canonical: f.employer_canonical.clone(),
                    job_canonical: f.job_canonical.clone(),
                    total_comp: f.total_comp,
                    salary: f.salary,
                    benefits: f.benefits,
                })
                .collect();
            (year, ranked)
        })
        .collect()
}
