use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

pub mod cohort;
pub mod sector;
pub mod stats;
pub mod summary;

pub use cohort::{employer_metrics, job_metrics, CohortDynamics, CohortMetric, GroupedMetrics};
pub use sector::{sector_key, sector_metrics, SectorMetrics};
pub use stats::{Distribution, Percentile};
pub use summary::{top_earners, year_summary, TopEarner, YearSummary};

use crate::config::AnalyticsConfig;
use crate::types::{EntityId, FactRecord};

/// Every analytics artifact derived from one fact stream.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub year_summary: Vec<YearSummary>,
    pub top_earners: BTreeMap<i32, Vec<TopEarner>>,
    pub employer_metrics: GroupedMetrics<EntityId>,
    pub job_metrics: GroupedMetrics<EntityId>,
    pub sector_metrics: SectorMetrics,
}

pub fn compute_analytics(facts: &[FactRecord], config: &AnalyticsConfig) -> AnalyticsReport {
    let report = AnalyticsReport {
        year_summary: year_summary(facts),
        top_earners: top_earners(facts, config.top_earners),
        employer_metrics: employer_metrics(facts),
        job_metrics: job_metrics(facts),
        sector_metrics: sector_metrics(facts, config.top_job_titles),
    };

    info!(
        "Analytics: {} years, {} employers, {} jobs, {} sectors",
        report.year_summary.len(),
        report.employer_metrics.len(),
        report.job_metrics.len(),
        report.sector_metrics.sectors.len()
    );
    report
}
