use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::app::ports::{Artifact, ArtifactOutputPort, ArtifactTarget, FactTablePort};
use crate::config::QualityConfig;
use crate::constants::QUALITY_REPORT_FILE;
use crate::pipeline::processing::quality_gate::{DataQualityReport, DefaultQualityGate, QualityGate};

/// Use case for re-validating a published fact table on its own
pub struct QualityGateUseCase {
    quality_gate: Box<dyn QualityGate + Send + Sync>,
    facts: Box<dyn FactTablePort>,
    output: Box<dyn ArtifactOutputPort>,
}

impl QualityGateUseCase {
    pub fn new(
        quality_gate: Box<dyn QualityGate + Send + Sync>,
        facts: Box<dyn FactTablePort>,
        output: Box<dyn ArtifactOutputPort>,
    ) -> Self {
        Self {
            quality_gate,
            facts,
            output,
        }
    }

    /// Create a use case with the default quality gate
    pub fn with_default_quality_gate(
        config: QualityConfig,
        facts: Box<dyn FactTablePort>,
        output: Box<dyn ArtifactOutputPort>,
    ) -> Self {
        Self::new(Box::new(DefaultQualityGate::with_config(config)), facts, output)
    }

    pub async fn run(&self) -> Result<DataQualityReport> {
        let facts = self.facts.load_facts().await.context("loading fact table")?;
        info!("Validating {} facts", facts.len());

        let report = self.quality_gate.assess(&facts, Utc::now());
        let artifact = Artifact::json(ArtifactTarget::Analytics, QUALITY_REPORT_FILE, &report)?;
        self.output
            .publish(&[artifact])
            .await
            .context("publishing data-quality report")?;

        if report.has_high_severity() {
            warn!("High severity data-quality issues detected; review {}", QUALITY_REPORT_FILE);
        }
        Ok(report)
    }
}
