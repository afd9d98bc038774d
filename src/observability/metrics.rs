//! Metric names and recording helpers for the salary pipeline.
//!
//! Recording goes through the `metrics` facade; nothing is exported unless the
//! embedding process installs a recorder.

use std::fmt;

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Ingestion
    IngestRowsRead,
    IngestBatchesAccepted,
    IngestBatchesRejected,
    IngestMalformedValues,
    IngestBatchRows,

    // Canonicalization
    CanonicalizeRecordsProcessed,
    CanonicalizeEmployersRegistered,
    CanonicalizeJobsRegistered,
    CanonicalizeAliasHits,

    // Linkage
    LinkChainsStarted,
    LinkRecordsLinked,

    // Quality
    QualityIssuesHigh,
    QualityIssuesMedium,
    QualityIssuesLow,
    QualityIssuesInfo,

    // Stages
    StageDuration,
    StageFailures,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::IngestRowsRead => "sunshine_ingest_rows_read_total",
            MetricName::IngestBatchesAccepted => "sunshine_ingest_batches_accepted_total",
            MetricName::IngestBatchesRejected => "sunshine_ingest_batches_rejected_total",
            MetricName::IngestMalformedValues => "sunshine_ingest_malformed_values_total",
            MetricName::IngestBatchRows => "sunshine_ingest_batch_rows",

            MetricName::CanonicalizeRecordsProcessed => "sunshine_canonicalize_records_processed_total",
            MetricName::CanonicalizeEmployersRegistered => "sunshine_canonicalize_employers_registered",
            MetricName::CanonicalizeJobsRegistered => "sunshine_canonicalize_jobs_registered",
            MetricName::CanonicalizeAliasHits => "sunshine_canonicalize_alias_hits_total",

            MetricName::LinkChainsStarted => "sunshine_link_chains_started_total",
            MetricName::LinkRecordsLinked => "sunshine_link_records_linked_total",

            MetricName::QualityIssuesHigh => "sunshine_quality_issues_high",
            MetricName::QualityIssuesMedium => "sunshine_quality_issues_medium",
            MetricName::QualityIssuesLow => "sunshine_quality_issues_low",
            MetricName::QualityIssuesInfo => "sunshine_quality_issues_info",

            MetricName::StageDuration => "sunshine_stage_duration_seconds",
            MetricName::StageFailures => "sunshine_stage_failures_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn emit_counter(name: MetricName, value: u64) {
    ::metrics::counter!(name.as_str()).increment(value);
}

pub fn emit_gauge(name: MetricName, value: f64) {
    ::metrics::gauge!(name.as_str()).set(value);
}

pub fn emit_histogram(name: MetricName, value: f64) {
    ::metrics::histogram!(name.as_str()).record(value);
}

/// Record a stage duration, labelled with the stage name.
pub fn emit_stage_duration(stage: &'static str, secs: f64) {
    ::metrics::histogram!(MetricName::StageDuration.as_str(), "stage" => stage).record(secs);
}

pub fn emit_stage_failure(stage: &'static str) {
    ::metrics::counter!(MetricName::StageFailures.as_str(), "stage" => stage).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_follow_prometheus_convention() {
        let counters = [
            MetricName::IngestRowsRead,
            MetricName::LinkChainsStarted,
            MetricName::StageFailures,
        ];
        for name in counters {
            assert!(name.as_str().starts_with("sunshine_"));
            assert!(name.as_str().ends_with("_total"));
        }
        // Gauges and histograms never carry the counter suffix
        let others = [
            MetricName::QualityIssuesHigh,
            MetricName::QualityIssuesMedium,
            MetricName::QualityIssuesLow,
            MetricName::QualityIssuesInfo,
            MetricName::CanonicalizeEmployersRegistered,
            MetricName::IngestBatchRows,
        ];
        for name in others {
            assert!(name.as_str().starts_with("sunshine_"));
            assert!(!name.as_str().ends_with("_total"));
        }
        assert_eq!(MetricName::StageDuration.to_string(), "sunshine_stage_duration_seconds");
    }

    #[test]
    fn test_emit_without_recorder_is_noop() {
        emit_counter(MetricName::IngestRowsRead, 3);
        emit_gauge(MetricName::CanonicalizeEmployersRegistered, 2.0);
        emit_histogram(MetricName::IngestBatchRows, 12.0);
        emit_stage_duration("ingest", 0.5);
    }
}
