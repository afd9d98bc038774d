use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, info};

use crate::config::QualityConfig;
use crate::observability::metrics::{emit_gauge, MetricName};
use crate::pipeline::processing::analytics::stats::{mean, median};
use crate::types::FactRecord;

/// Data-quality report produced from the fact stream.
#[derive(Debug, Clone, Serialize)]
pub struct DataQualityReport {
    pub generated_at: DateTime<Utc>,
    pub summary: SummaryStats,
    pub issue_counts: IssueCounts,
    pub issues: Vec<QualityIssue>,
}

impl DataQualityReport {
    pub fn has_high_severity(&self) -> bool {
        self.issue_counts.high > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub total_records: usize,
    pub year_range: Option<(i32, i32)>,
    pub unique_employers: usize,
    pub unique_persons: usize,
    pub unique_job_titles: usize,
    pub total_compensation_sum: f64,
    pub mean_compensation: Option<f64>,
    pub median_compensation: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssueCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
}

/// Severity levels for quality issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualitySeverity {
    Info,
    Low,
    Medium,
    High,
}

/// Checks run over the fact stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityCheck {
    NullValues,
    HighSalary,
    ZeroNegativeSalary,
    BelowThreshold,
    LargeHeadcountDrops,
    ExactDuplicates,
    SamePersonEmployerYear,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityIssue {
    pub check: QualityCheck,
    pub severity: QualitySeverity,
    #[serde(flatten)]
    pub details: IssueDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalarySample {
    pub first_name: String,
    pub last_name: String,
    pub employer_canonical: String,
    pub total_comp: f64,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadcountDrop {
    pub employer: String,
    pub year: i32,
    pub prev_count: usize,
    pub curr_count: usize,
    pub drop_pct: f64,
}

/// Check-specific payload, serialized inline next to `check` and `severity`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IssueDetails {
    Missing {
        field: String,
        empty_count: usize,
    },
    Outliers {
        count: usize,
        max_value: f64,
        sample: Vec<SalarySample>,
    },
    YearsAffected {
        count: usize,
        years_affected: Vec<i32>,
    },
    Drops {
        count: usize,
        samples: Vec<HeadcountDrop>,
    },
    Duplicates {
        count: usize,
        unique_groups: usize,
    },
    Count {
        count: usize,
        note: String,
    },
}

/// Trait for producing a quality report from a complete fact stream
pub trait QualityGate {
    fn assess(&self, facts: &[FactRecord], generated_at: DateTime<Utc>) -> DataQualityReport;
}

/// Quality gate with configurable thresholds
pub struct DefaultQualityGate {
    pub config: QualityConfig,
}

impl DefaultQualityGate {
    pub fn new() -> Self {
        Self {
            config: QualityConfig::default(),
        }
    }

    pub fn with_config(config: QualityConfig) -> Self {
        Self { config }
    }

    fn check_null_values(&self, facts: &[FactRecord]) -> Vec<QualityIssue> {
        let text_fields = [
            ("first_name", facts.iter().filter(|f| f.first_name.is_empty()).count()),
            ("last_name", facts.iter().filter(|f| f.last_name.is_empty()).count()),
            (
                "employer_canonical",
                facts.iter().filter(|f| f.employer_canonical.is_empty()).count(),
            ),
        ];

        let mut issues = Vec::new();
        for (field, empty_count) in text_fields {
            if empty_count > 0 {
                issues.push(QualityIssue {
                    check: QualityCheck::NullValues,
                    severity: QualitySeverity::Medium,
                    details: IssueDetails::Missing {
                        field: field.to_string(),
                        empty_count,
                    },
                });
            }
        }

        let non_finite = facts.iter().filter(|f| !f.total_comp.is_finite()).count();
        if non_finite > 0 {
            issues.push(QualityIssue {
                check: QualityCheck::NullValues,
                severity: QualitySeverity::High,
                details: IssueDetails::Missing {
                    field: "total_comp".to_string(),
                    empty_count: non_finite,
                },
            });
        }
        issues
    }

    fn check_salary_anomalies(&self, facts: &[FactRecord]) -> Vec<QualityIssue> {
        let mut issues = Vec::new();

        let high: Vec<&FactRecord> = facts
            .iter()
            .filter(|f| f.total_comp > self.config.high_salary_threshold)
            .collect();
        if !high.is_empty() {
            let max_value = high
                .iter()
                .map(|f| f.total_comp)
                .fold(f64::NEG_INFINITY, f64::max);
            issues.push(QualityIssue {
                check: QualityCheck::HighSalary,
                severity: QualitySeverity::Info,
                details: IssueDetails::Outliers {
                    count: high.len(),
                    max_value,
                    sample: high
                        .iter()
                        .take(self.config.outlier_samples)
                        .map(|f| SalarySample {
                            first_name: f.first_name.clone(),
                            last_name: f.last_name.clone(),
                            employer_canonical: f.employer_canonical.clone(),
                            total_comp: f.total_comp,
                            year: f.year,
                        })
                        .collect(),
                },
            });
        }

        let non_positive: Vec<&FactRecord> = facts.iter().filter(|f| f.total_comp <= 0.0).collect();
        if !non_positive.is_empty() {
            let years: BTreeSet<i32> = non_positive.iter().map(|f| f.year).collect();
            issues.push(QualityIssue {
                check: QualityCheck::ZeroNegativeSalary,
                severity: QualitySeverity::Medium,
                details: IssueDetails::YearsAffected {
                    count: non_positive.len(),
                    years_affected: years.into_iter().collect(),
                },
            });
        }

        let below = facts
            .iter()
            .filter(|f| f.total_comp > 0.0 && f.total_comp < self.config.disclosure_threshold)
            .count();
        if below > 0 {
            issues.push(QualityIssue {
                check: QualityCheck::BelowThreshold,
                severity: QualitySeverity::Low,
                details: IssueDetails::Count {
                    count: below,
                    note: "Records below the disclosure threshold; may be partial year or data issue"
                        .to_string(),
                },
            });
        }
        issues
    }

    /// Employer headcount between consecutive dataset years; an employer
    /// missing from a year counts as zero.
    fn check_headcount_drops(&self, facts: &[FactRecord]) -> Vec<QualityIssue> {
        let mut counts: BTreeMap<&str, HashMap<i32, usize>> = BTreeMap::new();
        let mut years = BTreeSet::new();
        for fact in facts {
            *counts
                .entry(fact.employer_canonical.as_str())
                .or_default()
                .entry(fact.year)
                .or_default() += 1;
            years.insert(fact.year);
        }
        let years: Vec<i32> = years.into_iter().collect();

        let mut drops = Vec::new();
        for pair in years.windows(2) {
            let (prev_year, curr_year) = (pair[0], pair[1]);
            let dropped = counts
                .iter()
                .filter_map(|(employer, by_year)| {
                    let prev = by_year.get(&prev_year).copied().unwrap_or(0);
                    let curr = by_year.get(&curr_year).copied().unwrap_or(0);
                    let is_drop = prev >= self.config.headcount_drop_min_prev
                        && (curr as f64) < prev as f64 * self.config.headcount_drop_ratio
                        && curr > 0;
                    is_drop.then(|| HeadcountDrop {
                        employer: employer.to_string(),
                        year: curr_year,
                        prev_count: prev,
                        curr_count: curr,
                        drop_pct: ((1.0 - curr as f64 / prev as f64) * 1000.0).round() / 10.0,
                    })
                })
                .take(self.config.drops_per_year);
            drops.extend(dropped);
        }

        if drops.is_empty() {
            return Vec::new();
        }
        let count = drops.len();
        drops.truncate(self.config.drop_samples);
        vec![QualityIssue {
            check: QualityCheck::LargeHeadcountDrops,
            severity: QualitySeverity::Info,
            details: IssueDetails::Drops {
                count,
                samples: drops,
            },
        }]
    }

    fn check_duplicates(&self, facts: &[FactRecord]) -> Vec<QualityIssue> {
        let mut exact: HashMap<(&str, &str, &str, i32, u64), usize> = HashMap::new();
        let mut near: HashMap<(&str, &str, &str, i32), usize> = HashMap::new();
        for f in facts {
            let base = (
                f.first_name.as_str(),
                f.last_name.as_str(),
                f.employer_canonical.as_str(),
                f.year,
            );
            *exact
                .entry((base.0, base.1, base.2, base.3, f.total_comp.to_bits()))
                .or_default() += 1;
            *near.entry(base).or_default() += 1;
        }

        let exact_rows: usize = exact.values().filter(|c| **c > 1).sum();
        let exact_groups = exact.values().filter(|c| **c > 1).count();
        let near_rows: usize = near.values().filter(|c| **c > 1).sum();

        let mut issues = Vec::new();
        if exact_rows > 0 {
            issues.push(QualityIssue {
                check: QualityCheck::ExactDuplicates,
                severity: QualitySeverity::High,
                details: IssueDetails::Duplicates {
                    count: exact_rows,
                    unique_groups: exact_groups,
                },
            });
        }
        let near_only = near_rows - exact_rows;
        if near_only > 0 {
            issues.push(QualityIssue {
                check: QualityCheck::SamePersonEmployerYear,
                severity: QualitySeverity::Low,
                details: IssueDetails::Count {
                    count: near_only,
                    note: "May indicate job changes within same year and employer".to_string(),
                },
            });
        }
        issues
    }

    fn summary_stats(&self, facts: &[FactRecord]) -> SummaryStats {
        let comps: Vec<f64> = facts
            .iter()
            .map(|f| f.total_comp)
            .filter(|v| v.is_finite())
            .collect();
        let min_year = facts.iter().map(|f| f.year).min();
        let max_year = facts.iter().map(|f| f.year).max();

        SummaryStats {
            total_records: facts.len(),
            year_range: min_year.zip(max_year),
            unique_employers: facts
                .iter()
                .map(|f| f.employer_canonical.as_str())
                .collect::<HashSet<_>>()
                .len(),
            unique_persons: facts.iter().map(|f| f.person_id).collect::<HashSet<_>>().len(),
            unique_job_titles: facts
                .iter()
                .map(|f| f.job_canonical.as_str())
                .collect::<HashSet<_>>()
                .len(),
            total_compensation_sum: comps.iter().sum(),
            mean_compensation: (!comps.is_empty()).then(|| mean(&comps)),
            median_compensation: median(&comps),
        }
    }
}

impl QualityGate for DefaultQualityGate {
    fn assess(&self, facts: &[FactRecord], generated_at: DateTime<Utc>) -> DataQualityReport {
        debug!("Running quality checks over {} facts", facts.len());

        let mut issues = Vec::new();
        issues.extend(self.check_null_values(facts));
        issues.extend(self.check_salary_anomalies(facts));
        issues.extend(self.check_headcount_drops(facts));
        issues.extend(self.check_duplicates(facts));

        let mut issue_counts = IssueCounts::default();
        for issue in &issues {
            match issue.severity {
                QualitySeverity::High => issue_counts.high += 1,
                QualitySeverity::Medium => issue_counts.medium += 1,
                QualitySeverity::Low => issue_counts.low += 1,
                QualitySeverity::Info => issue_counts.info += 1,
            }
        }

        emit_gauge(MetricName::QualityIssuesHigh, issue_counts.high as f64);
        emit_gauge(MetricName::QualityIssuesMedium, issue_counts.medium as f64);
        emit_gauge(MetricName::QualityIssuesLow, issue_counts.low as f64);
        emit_gauge(MetricName::QualityIssuesInfo, issue_counts.info as f64);
        info!(
            "Quality report: {} high, {} medium, {} low, {} info",
            issue_counts.high, issue_counts.medium, issue_counts.low, issue_counts.info
        );

        DataQualityReport {
            generated_at,
            summary: self.summary_stats(facts),
            issue_counts,
            issues,
        }
    }
}

impl Default for DefaultQualityGate {
    fn default() -> Self {
        Self::new()
    }
}
