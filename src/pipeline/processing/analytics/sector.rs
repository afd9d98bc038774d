use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::stats::{mean, quantile_sorted, round_to, sorted_copy};
use crate::constants::OVERALL_SECTOR_KEY;
use crate::types::{EntityId, FactRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorYearMetric {
    pub headcount: usize,
    pub total_payroll: f64,
    pub mean_pay: f64,
    pub median_pay: f64,
    pub p75: f64,
    pub p90: f64,
    pub p99: f64,
    pub min_pay: f64,
    pub max_pay: f64,
    pub unique_employers: usize,
    pub yoy_headcount_growth: f64,
    pub yoy_pay_growth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorReport {
    pub years: BTreeMap<i32, SectorYearMetric>,
    pub top_job_titles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallYearMetric {
    pub headcount: usize,
    pub total_payroll: f64,
    pub mean_pay: f64,
    pub median_pay: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallReport {
    pub years: BTreeMap<i32, OverallYearMetric>,
}

/// Sector reports keyed by display sector name, plus the all-sectors aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorMetrics {
    pub sectors: BTreeMap<String, SectorReport>,
    pub overall: OverallReport,
}

// One flat map: every sector, then the aggregate under OVERALL_SECTOR_KEY.
impl Serialize for SectorMetrics {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sectors.len() + 1))?;
        for (sector, report) in &self.sectors {
            map.serialize_entry(sector, report)?;
        }
        map.serialize_entry(OVERALL_SECTOR_KEY, &self.overall)?;
        map.end()
    }
}

/// Display key for a sector: trimmed, each alphabetic run capitalized.
pub fn sector_key(sector: &str) -> String {
    let mut out = String::with_capacity(sector.len());
    let mut previous_alpha = false;
    for c in sector.trim().chars() {
        if c.is_alphabetic() {
            if previous_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_alpha = true;
        } else {
            out.push(c);
            previous_alpha = false;
        }
    }
    out
}

fn relative_change(current: f64, previous: f64) -> f64 {
    let change = (current - previous) / previous;
    if change.is_finite() {
        change
    } else {
        0.0
    }
}

struct SectorYear {
    total_comps: Vec<f64>,
    employers: BTreeSet<EntityId>,
}

pub fn sector_metrics(facts: &[FactRecord], top_job_titles: usize) -> SectorMetrics {
    let mut groups: BTreeMap<String, BTreeMap<i32, SectorYear>> = BTreeMap::new();
    let mut job_counts: BTreeMap<String, HashMap<&str, usize>> = BTreeMap::new();
    let mut overall_groups: BTreeMap<i32, Vec<f64>> = BTreeMap::new();

    for fact in facts {
        let key = sector_key(&fact.sector);
        let year = groups
            .entry(key.clone())
            .or_default()
            .entry(fact.year)
            .or_insert_with(|| SectorYear {
                total_comps: Vec::new(),
                employers: BTreeSet::new(),
            });
        year.total_comps.push(fact.total_comp);
        year.employers.insert(fact.employer_id);

        *job_counts
            .entry(key)
            .or_default()
            .entry(fact.job_canonical.as_str())
            .or_default() += 1;

        overall_groups.entry(fact.year).or_default().push(fact.total_comp);
    }

    let mut sectors = BTreeMap::new();
    for (sector, years) in groups {
        let mut rows = BTreeMap::new();
        let mut previous: Option<(usize, f64)> = None;

        for (year, group) in years {
            let sorted = sorted_copy(&group.total_comps);
            let headcount = sorted.len();
            let total_payroll: f64 = sorted.iter().sum();
            let mean_pay = mean(&sorted);

            let (yoy_headcount_growth, yoy_pay_growth) = match previous {
                Some((prev_headcount, prev_mean)) => (
                    relative_change(headcount as f64, prev_headcount as f64),
                    relative_change(mean_pay, prev_mean),
                ),
                None => (0.0, 0.0),
            };
            previous = Some((headcount, mean_pay));

            rows.insert(
                year,
                SectorYearMetric {
                    headcount,
                    total_payroll: round_to(total_payroll, 2),
                    mean_pay: round_to(mean_pay, 2),
                    median_pay: round_to(quantile_sorted(&sorted, 0.5), 2),
                    p75: round_to(quantile_sorted(&sorted, 0.75), 2),
                    p90: round_to(quantile_sorted(&sorted, 0.90), 2),
                    p99: round_to(quantile_sorted(&sorted, 0.99), 2),
                    min_pay: round_to(sorted[0], 2),
                    max_pay: round_to(sorted[headcount - 1], 2),
                    unique_employers: group.employers.len(),
                    yoy_headcount_growth: round_to(yoy_headcount_growth, 4),
                    yoy_pay_growth: round_to(yoy_pay_growth, 4),
                },
            );
        }

        let top = top_titles(job_counts.get(&sector), top_job_titles);
        sectors.insert(
            sector,
            SectorReport {
                years: rows,
                top_job_titles: top,
            },
        );
    }

    let overall = OverallReport {
        years: overall_groups
            .into_iter()
            .map(|(year, values)| {
                let sorted = sorted_copy(&values);
                (
                    year,
                    OverallYearMetric {
                        headcount: sorted.len(),
                        total_payroll: round_to(sorted.iter().sum(), 2),
                        mean_pay: round_to(mean(&sorted), 2),
                        median_pay: round_to(quantile_sorted(&sorted, 0.5), 2),
                    },
                )
            })
            .collect(),
    };

    SectorMetrics { sectors, overall }
}

/// Most frequent job titles, ties broken by title.
fn top_titles(counts: Option<&HashMap<&str, usize>>, limit: usize) -> Vec<String> {
    let Some(counts) = counts else {
        return Vec::new();
    };
    let mut ranked: Vec<(&str, usize)> = counts.iter().map(|(t, c)| (*t, *c)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(title, _)| title.to_string())
        .collect()
}
