use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::app::ports::{
    AliasKind, AliasTablePort, Artifact, ArtifactOutputPort, ArtifactTarget, LoadedAliasTable,
    RawBatchSourcePort,
};
use crate::config::PipelineConfig;
use crate::constants::*;
use crate::error::PipelineError;
use crate::idempotency::{compute_input_fingerprint, FingerprintPart};
use crate::observability::metrics::{emit_stage_duration, emit_stage_failure};
use crate::pipeline::ingestion::{ingest_batches, IngestReport};
use crate::pipeline::processing::analytics::compute_analytics;
use crate::pipeline::processing::linkage::{IdentityLinker, LinkConfidence};
use crate::pipeline::processing::normalize::canonicalize_records;
use crate::pipeline::processing::quality_gate::{
    DataQualityReport, DefaultQualityGate, IssueCounts, QualityGate,
};
use crate::pipeline::processing::search_index::SearchIndex;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub skip_validation: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageTiming {
    pub stage: &'static str,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunCounts {
    pub raw_records: usize,
    pub facts: usize,
    pub employers: usize,
    pub jobs: usize,
    pub persons: u64,
    pub linked_records: usize,
    pub links_by_confidence: BTreeMap<LinkConfidence, usize>,
    pub employer_alias_hits: usize,
    pub job_alias_hits: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_issues: Option<IssueCounts>,
}

/// Provenance record published alongside the artifacts of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub input_fingerprint: String,
    pub validation_skipped: bool,
    pub stages: Vec<StageTiming>,
    pub counts: RunCounts,
    pub ingest: IngestReport,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub manifest: RunManifest,
    pub quality_report: Option<DataQualityReport>,
    pub published: Vec<PathBuf>,
}

#[derive(Default)]
struct StageClock {
    timings: Vec<StageTiming>,
}

impl StageClock {
    fn time<T>(&mut self, stage: &'static str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let output = info_span!("stage", name = stage).in_scope(f);
        self.record(stage, start.elapsed());
        output
    }

    fn record(&mut self, stage: &'static str, elapsed: Duration) {
        emit_stage_duration(stage, elapsed.as_secs_f64());
        debug!("Stage {} finished in {:?}", stage, elapsed);
        self.timings.push(StageTiming {
            stage,
            duration_ms: elapsed.as_millis() as u64,
        });
    }
}

/// Use case for a full pipeline run: ingest, canonicalize, link, validate,
/// analytics and search index, then publish.
///
/// Every artifact is built in memory first. Nothing is published unless
/// every stage succeeded.
pub struct RunPipelineUseCase {
    batches: Box<dyn RawBatchSourcePort>,
    aliases: Box<dyn AliasTablePort>,
    output: Box<dyn ArtifactOutputPort>,
    quality_gate: Box<dyn QualityGate + Send + Sync>,
    config: PipelineConfig,
}

impl RunPipelineUseCase {
    pub fn new(
        batches: Box<dyn RawBatchSourcePort>,
        aliases: Box<dyn AliasTablePort>,
        output: Box<dyn ArtifactOutputPort>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            batches,
            aliases,
            output,
            quality_gate: Box::new(DefaultQualityGate::with_config(config.quality.clone())),
            config,
        }
    }

    fn stage_failure(&self, stage: &'static str, message: impl Into<String>) -> anyhow::Error {
        let err = PipelineError::stage(stage, message);
        emit_stage_failure(stage);
        error!("{}", err);
        err.into()
    }

    async fn load_aliases(&self, kind: AliasKind) -> Result<LoadedAliasTable> {
        self.aliases.load(kind).await.map_err(|e| {
            self.stage_failure(STAGE_INGEST, e.to_string())
                .context(format!("loading {} table", kind.as_str()))
        })
    }

    pub async fn run(&self, options: RunOptions) -> Result<RunOutcome> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut clock = StageClock::default();
        info!("Starting pipeline run {}", run_id);

        // Ingest
        let ingest_span = info_span!("stage", name = STAGE_INGEST);
        let ingest_start = Instant::now();
        let (raw_batches, employer_aliases, job_aliases) = async {
            let raw_batches = self.batches.load_batches().await.map_err(|e| {
                self.stage_failure(STAGE_INGEST, e.to_string())
                    .context("loading raw batches")
            })?;
            let employer_aliases = self.load_aliases(AliasKind::Employer).await?;
            let job_aliases = self.load_aliases(AliasKind::Job).await?;
            Ok::<_, anyhow::Error>((raw_batches, employer_aliases, job_aliases))
        }
        .instrument(ingest_span.clone())
        .await?;

        let input_fingerprint = {
            let mut parts: Vec<FingerprintPart<'_>> = raw_batches
                .iter()
                .map(|b| FingerprintPart {
                    name: &b.name,
                    bytes: &b.bytes,
                })
                .collect();
            parts.push(FingerprintPart {
                name: AliasKind::Employer.as_str(),
                bytes: &employer_aliases.source_bytes,
            });
            parts.push(FingerprintPart {
                name: AliasKind::Job.as_str(),
                bytes: &job_aliases.source_bytes,
            });
            compute_input_fingerprint(&mut parts)
        };

        let ingested = ingest_span.in_scope(|| ingest_batches(raw_batches));
        clock.record(STAGE_INGEST, ingest_start.elapsed());
        if ingested.report.accepted_batches() == 0 {
            return Err(self.stage_failure(STAGE_INGEST, "no raw batch was accepted"));
        }
        let raw_records = ingested.records.len();

        // Canonicalize
        let canonical = clock.time(STAGE_CANONICALIZE, || {
            canonicalize_records(ingested.records, employer_aliases.table, job_aliases.table)
        });

        // Link
        let linkage = clock.time(STAGE_LINK, || IdentityLinker::new().link(canonical.records));
        let links_by_confidence = linkage.links_by_confidence();
        let facts = linkage.facts;

        // Validate
        let quality_report = if options.skip_validation {
            info!("Skipping validation");
            None
        } else {
            Some(clock.time(STAGE_VALIDATE, || self.quality_gate.assess(&facts, Utc::now())))
        };

        // Analytics
        let analytics = clock.time(STAGE_ANALYTICS, || compute_analytics(&facts, &self.config.analytics));

        // Search index
        let search_index = clock.time(STAGE_SEARCH_INDEX, || {
            SearchIndex::build(&canonical.employers, &canonical.jobs)
        });

        let mut artifacts = vec![
            Artifact::ndjson(ArtifactTarget::Curated, FACT_TABLE_FILE, &facts)?,
            Artifact::json(ArtifactTarget::Curated, EMPLOYER_DIM_FILE, &canonical.employers)?,
            Artifact::json(ArtifactTarget::Curated, JOB_DIM_FILE, &canonical.jobs)?,
            Artifact::json(ArtifactTarget::Analytics, YEAR_SUMMARY_FILE, &analytics.year_summary)?,
            Artifact::json(ArtifactTarget::Analytics, TOP_EARNERS_FILE, &analytics.top_earners)?,
            Artifact::json(ArtifactTarget::Analytics, EMPLOYER_METRICS_FILE, &analytics.employer_metrics)?,
            Artifact::json(ArtifactTarget::Analytics, JOB_METRICS_FILE, &analytics.job_metrics)?,
            Artifact::json(ArtifactTarget::Analytics, SECTOR_METRICS_FILE, &analytics.sector_metrics)?,
            Artifact::json(ArtifactTarget::Analytics, SEARCH_INDEX_FILE, &search_index)?,
        ];
        if let Some(report) = &quality_report {
            artifacts.push(Artifact::json(ArtifactTarget::Analytics, QUALITY_REPORT_FILE, report)?);
        }

        let manifest = RunManifest {
            run_id,
            started_at,
            finished_at: Utc::now(),
            input_fingerprint,
            validation_skipped: options.skip_validation,
            stages: clock.timings,
            counts: RunCounts {
                raw_records,
                facts: facts.len(),
                employers: canonical.employers.len(),
                jobs: canonical.jobs.len(),
                persons: linkage.chain_count,
                linked_records: linkage.linked_count,
                links_by_confidence,
                employer_alias_hits: canonical.employer_alias_hits,
                job_alias_hits: canonical.job_alias_hits,
                quality_issues: quality_report.as_ref().map(|r| r.issue_counts.clone()),
            },
            ingest: ingested.report,
        };
        artifacts.push(Artifact::json(ArtifactTarget::Curated, RUN_MANIFEST_FILE, &manifest)?);

        let published = self
            .output
            .publish(&artifacts)
            .instrument(info_span!("publish", artifacts = artifacts.len()))
            .await
            .context("publishing run artifacts")?;
        info!(
            "Run {} complete: {} facts, {} persons, {} artifacts",
            run_id,
            manifest.counts.facts,
            manifest.counts.persons,
            published.len()
        );
        if quality_report.as_ref().is_some_and(|r| r.has_high_severity()) {
            warn!("High severity data-quality issues detected; review {}", QUALITY_REPORT_FILE);
        }

        Ok(RunOutcome {
            manifest,
            quality_report,
            published,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ingestion::RawBatch;
    use crate::pipeline::processing::normalize::AliasTable;
    use crate::types::FactRecord;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    const HEADER: &str = "sector,last name,first name,salary paid,taxable benefits,employer,job title\n";

    struct MockBatches {
        batches: Vec<RawBatch>,
    }

    #[async_trait]
    impl RawBatchSourcePort for MockBatches {
        async fn load_batches(&self) -> crate::error::Result<Vec<RawBatch>> {
            Ok(self.batches.clone())
        }
    }

    struct MockAliases {
        employer: AliasTable,
    }

    #[async_trait]
    impl AliasTablePort for MockAliases {
        async fn load(&self, kind: AliasKind) -> crate::error::Result<LoadedAliasTable> {
            Ok(match kind {
                AliasKind::Employer => LoadedAliasTable {
                    table: self.employer.clone(),
                    source_bytes: b"raw,canonical\n".to_vec(),
                },
                AliasKind::Job => LoadedAliasTable::default(),
            })
        }
    }

    struct UnreadableAliases;

    #[async_trait]
    impl AliasTablePort for UnreadableAliases {
        async fn load(&self, kind: AliasKind) -> crate::error::Result<LoadedAliasTable> {
            match kind {
                AliasKind::Employer => Ok(LoadedAliasTable::default()),
                AliasKind::Job => Err(PipelineError::MissingField {
                    source_name: "job_title_aliases.csv".to_string(),
                    field: "canonical".to_string(),
                }),
            }
        }
    }

    struct MockOutput {
        artifacts: Arc<Mutex<Vec<Artifact>>>,
    }

    #[async_trait]
    impl ArtifactOutputPort for MockOutput {
        async fn publish(&self, artifacts: &[Artifact]) -> crate::error::Result<Vec<PathBuf>> {
            self.artifacts.lock().await.extend(artifacts.iter().cloned());
            Ok(artifacts.iter().map(|a| PathBuf::from(a.file_name)).collect())
        }
    }

    fn batch(name: &str, rows: &[&str]) -> RawBatch {
        let mut text = HEADER.to_string();
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        RawBatch {
            name: name.to_string(),
            bytes: text.into_bytes(),
        }
    }

    fn use_case(batches: Vec<RawBatch>) -> (RunPipelineUseCase, Arc<Mutex<Vec<Artifact>>>) {
        let published = Arc::new(Mutex::new(Vec::new()));
        let use_case = RunPipelineUseCase::new(
            Box::new(MockBatches { batches }),
            Box::new(MockAliases {
                employer: AliasTable::new(),
            }),
            Box::new(MockOutput {
                artifacts: published.clone(),
            }),
            PipelineConfig::default(),
        );
        (use_case, published)
    }

    fn facts_from(artifacts: &[Artifact]) -> Vec<FactRecord> {
        let fact_table = artifacts
            .iter()
            .find(|a| a.file_name == FACT_TABLE_FILE)
            .expect("fact table published");
        String::from_utf8(fact_table.bytes.clone())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_same_employer_two_years_apart_is_one_person() {
        let (use_case, published) = use_case(vec![
            batch("1996.csv", &["Universities,Smith,John,120000,5000,Acme Inc,Professor"]),
            batch("1998.csv", &["Universities,Smith,John,130000,6000,ACME,Professor"]),
        ]);

        let outcome = use_case.run(RunOptions::default()).await.unwrap();
        let artifacts = published.lock().await;
        let facts = facts_from(&artifacts);

        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].employer_id, facts[1].employer_id);
        assert_eq!(facts[0].person_id, facts[1].person_id);
        assert_eq!(facts[0].total_comp, 125_000.0);
        assert_eq!(outcome.manifest.counts.persons, 1);
        assert_eq!(
            outcome.manifest.counts.links_by_confidence.get(&LinkConfidence::High),
            Some(&1)
        );
        let manifest = artifacts.last().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&manifest.bytes).unwrap();
        assert_eq!(json["counts"]["links_by_confidence"]["High"], 1);
        assert_eq!(artifacts.last().unwrap().file_name, RUN_MANIFEST_FILE);
        assert!(artifacts.iter().any(|a| a.file_name == QUALITY_REPORT_FILE));
    }

    #[tokio::test]
    async fn test_different_employer_gives_two_people() {
        let (use_case, published) = use_case(vec![
            batch("1996.csv", &["Universities,Smith,John,120000,5000,Acme Inc,Professor"]),
            batch("1998.csv", &["Universities,Smith,John,130000,6000,Hydro One,Professor"]),
        ]);

        use_case.run(RunOptions::default()).await.unwrap();
        let facts = facts_from(&published.lock().await);
        assert_ne!(facts[0].person_id, facts[1].person_id);
    }

    #[tokio::test]
    async fn test_no_accepted_batch_is_stage_failure_and_publishes_nothing() {
        let bad = RawBatch {
            name: "1996.csv".to_string(),
            bytes: b"sector,employer\nColleges,Acme\n".to_vec(),
        };
        let (use_case, published) = use_case(vec![bad]);

        let err = use_case.run(RunOptions::default()).await.unwrap_err();
        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::StageFailure { stage, .. }) => assert_eq!(stage, STAGE_INGEST),
            other => panic!("expected stage failure, got {:?}", other),
        }
        assert!(published.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_skip_validation_omits_quality_report() {
        let (use_case, published) = use_case(vec![batch(
            "2001.csv",
            &["Hospitals,Lee,Ann,150000,0,Mercy Hospital,Nurse"],
        )]);

        let outcome = use_case
            .run(RunOptions {
                skip_validation: true,
            })
            .await
            .unwrap();
        assert!(outcome.quality_report.is_none());
        assert!(outcome.manifest.validation_skipped);
        assert!(outcome.manifest.stages.iter().all(|s| s.stage != STAGE_VALIDATE));
        assert!(!published
            .lock()
            .await
            .iter()
            .any(|a| a.file_name == QUALITY_REPORT_FILE));
    }

    #[tokio::test]
    async fn test_rejected_batch_is_reported_but_run_continues() {
        let (use_case, _published) = use_case(vec![
            batch("2000.csv", &["Hospitals,Lee,Ann,150000,0,Mercy Hospital,Nurse"]),
            RawBatch {
                name: "2001.csv".to_string(),
                bytes: b"sector,employer\nHospitals,Mercy\n".to_vec(),
            },
        ]);

        let outcome = use_case.run(RunOptions::default()).await.unwrap();
        assert_eq!(outcome.manifest.ingest.accepted_batches(), 1);
        assert_eq!(outcome.manifest.ingest.rejected_batches(), 1);
        assert_eq!(outcome.manifest.counts.facts, 1);
    }

    #[tokio::test]
    async fn test_fingerprint_is_stable_across_runs() {
        let batches = vec![batch("2000.csv", &["Hospitals,Lee,Ann,150000,0,Mercy Hospital,Nurse"])];
        let (first, _) = use_case(batches.clone());
        let (second, _) = use_case(batches);

        let a = first.run(RunOptions::default()).await.unwrap().manifest;
        let b = second.run(RunOptions::default()).await.unwrap().manifest;
        assert_eq!(a.input_fingerprint, b.input_fingerprint);
        assert_ne!(a.run_id, b.run_id);
        let stages: Vec<&str> = a.stages.iter().map(|s| s.stage).collect();
        assert_eq!(
            stages,
            vec![
                STAGE_INGEST,
                STAGE_CANONICALIZE,
                STAGE_LINK,
                STAGE_VALIDATE,
                STAGE_ANALYTICS,
                STAGE_SEARCH_INDEX
            ]
        );
    }

    #[tokio::test]
    async fn test_alias_table_failure_names_the_table() {
        let published = Arc::new(Mutex::new(Vec::new()));
        let use_case = RunPipelineUseCase::new(
            Box::new(MockBatches {
                batches: vec![batch("2000.csv", &["Hospitals,Lee,Ann,150000,0,Mercy Hospital,Nurse"])],
            }),
            Box::new(UnreadableAliases),
            Box::new(MockOutput {
                artifacts: published.clone(),
            }),
            PipelineConfig::default(),
        );

        let err = use_case.run(RunOptions::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "loading job_title_aliases table");
        assert!(format!("{:#}", err).contains("Missing required field 'canonical'"));
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::StageFailure { .. })
        ));
        assert!(published.lock().await.is_empty());
    }
}
