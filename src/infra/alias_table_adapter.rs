use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::app::ports::{AliasKind, AliasTablePort, LoadedAliasTable};
use crate::error::{PipelineError, Result};
use crate::pipeline::processing::normalize::AliasTable;

/// Parse an alias CSV with a `raw,canonical` header. Rows with an empty
/// `raw` cell or a blank `canonical` cell are skipped, so the raw value keeps
/// its normalized form. Later rows override earlier ones.
pub fn parse_alias_csv(source_name: &str, bytes: &[u8]) -> Result<AliasTable> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| PipelineError::MissingField {
                source_name: source_name.to_string(),
                field: name.to_string(),
            })
    };
    let raw_idx = column("raw")?;
    let canonical_idx = column("canonical")?;

    let mut table = AliasTable::new();
    for row in reader.records() {
        let row = row?;
        let raw = row.get(raw_idx).unwrap_or("");
        let canonical = row.get(canonical_idx).unwrap_or("");
        if raw.is_empty() || canonical.trim().is_empty() {
            continue;
        }
        table.insert(raw, canonical);
    }
    Ok(table)
}

/// File-based implementation of AliasTablePort
pub struct FsAliasTableAdapter {
    employer_path: PathBuf,
    job_path: PathBuf,
}

impl FsAliasTableAdapter {
    pub fn new(employer_path: impl Into<PathBuf>, job_path: impl Into<PathBuf>) -> Self {
        Self {
            employer_path: employer_path.into(),
            job_path: job_path.into(),
        }
    }

    fn path_for(&self, kind: AliasKind) -> &PathBuf {
        match kind {
            AliasKind::Employer => &self.employer_path,
            AliasKind::Job => &self.job_path,
        }
    }
}

#[async_trait]
impl AliasTablePort for FsAliasTableAdapter {
    async fn load(&self, kind: AliasKind) -> Result<LoadedAliasTable> {
        let path = self.path_for(kind);
        if !tokio::fs::try_exists(path).await? {
            debug!("No {} table at {}, using none", kind.as_str(), path.display());
            return Ok(LoadedAliasTable::default());
        }

        let source_bytes = tokio::fs::read(path).await?;
        let table = parse_alias_csv(&path.display().to_string(), &source_bytes)?;
        info!("Loaded {} {} from {}", table.len(), kind.as_str(), path.display());
        Ok(LoadedAliasTable {
            table,
            source_bytes,
        })
    }
}
