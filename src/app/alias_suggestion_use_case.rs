use anyhow::{Context, Result};
use tracing::info;

use crate::app::ports::{Artifact, ArtifactOutputPort, ArtifactTarget, RawBatchSourcePort};
use crate::config::SuggestionConfig;
use crate::constants::SUGGESTED_ALIASES_FILE;
use crate::pipeline::ingestion::ingest_batches;
use crate::pipeline::processing::alias_suggest::{AliasSuggester, AliasSuggestion};

const SUGGESTION_HEADER: &[u8] = b"raw,canonical,reason\n";

/// Use case for proposing employer aliases from the raw batches, for manual review
pub struct AliasSuggestionUseCase {
    batches: Box<dyn RawBatchSourcePort>,
    output: Box<dyn ArtifactOutputPort>,
    suggester: AliasSuggester,
}

impl AliasSuggestionUseCase {
    pub fn new(
        batches: Box<dyn RawBatchSourcePort>,
        output: Box<dyn ArtifactOutputPort>,
        config: SuggestionConfig,
    ) -> Self {
        Self {
            batches,
            output,
            suggester: AliasSuggester::new(config),
        }
    }

    pub async fn run(&self) -> Result<Vec<AliasSuggestion>> {
        let batches = self
            .batches
            .load_batches()
            .await
            .context("loading raw batches")?;
        let ingested = ingest_batches(batches);
        let suggestions = self
            .suggester
            .suggest(ingested.records.iter().map(|r| r.employer_raw.as_str()));

        let artifact = if suggestions.is_empty() {
            Artifact {
                target: ArtifactTarget::Dictionaries,
                file_name: SUGGESTED_ALIASES_FILE,
                bytes: SUGGESTION_HEADER.to_vec(),
            }
        } else {
            Artifact::csv(ArtifactTarget::Dictionaries, SUGGESTED_ALIASES_FILE, &suggestions)?
        };
        self.output
            .publish(&[artifact])
            .await
            .context("publishing alias suggestions")?;

        info!(
            "Wrote {} suggestions to {}; review before adding to the alias table",
            suggestions.len(),
            SUGGESTED_ALIASES_FILE
        );
        Ok(suggestions)
    }
}
