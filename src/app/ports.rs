use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;

use crate::error::Result;
use crate::pipeline::ingestion::RawBatch;
use crate::pipeline::processing::normalize::AliasTable;
use crate::types::FactRecord;

// Input-side ports

#[async_trait]
pub trait RawBatchSourcePort: Send + Sync {
    /// All raw batch files of the run, sorted by file name.
    async fn load_batches(&self) -> Result<Vec<RawBatch>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasKind {
    Employer,
    Job,
}

impl AliasKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AliasKind::Employer => "employer_aliases",
            AliasKind::Job => "job_title_aliases",
        }
    }
}

/// An alias table together with the bytes it was read from.
#[derive(Debug, Clone, Default)]
pub struct LoadedAliasTable {
    pub table: AliasTable,
    pub source_bytes: Vec<u8>,
}

#[async_trait]
pub trait AliasTablePort: Send + Sync {
    /// A missing table loads as empty.
    async fn load(&self, kind: AliasKind) -> Result<LoadedAliasTable>;
}

#[async_trait]
pub trait FactTablePort: Send + Sync {
    async fn load_facts(&self) -> Result<Vec<FactRecord>>;
}

// Output-side ports

/// Output directory an artifact is published to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactTarget {
    Curated,
    Analytics,
    Dictionaries,
}

/// A fully serialized output file, held in memory until publication.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub target: ArtifactTarget,
    pub file_name: &'static str,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn json<T: Serialize + ?Sized>(
        target: ArtifactTarget,
        file_name: &'static str,
        value: &T,
    ) -> Result<Self> {
        Ok(Self {
            target,
            file_name,
            bytes: serde_json::to_vec_pretty(value)?,
        })
    }

    /// Newline-delimited JSON, one value per line.
    pub fn ndjson<'a, T, I>(target: ArtifactTarget, file_name: &'static str, values: I) -> Result<Self>
    where
        T: Serialize + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let mut bytes = Vec::new();
        for value in values {
            serde_json::to_writer(&mut bytes, value)?;
            bytes.push(b'\n');
        }
        Ok(Self {
            target,
            file_name,
            bytes,
        })
    }

    /// CSV with a header row derived from the record's field names.
    pub fn csv<'a, T, I>(target: ArtifactTarget, file_name: &'static str, rows: I) -> Result<Self>
    where
        T: Serialize + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in rows {
            writer.serialize(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| crate::error::PipelineError::Io(e.into_error()))?;
        Ok(Self {
            target,
            file_name,
            bytes,
        })
    }
}

#[async_trait]
pub trait ArtifactOutputPort: Send + Sync {
    /// Publish every artifact or report the first failure. Returns the
    /// published paths in input order.
    async fn publish(&self, artifacts: &[Artifact]) -> Result<Vec<PathBuf>>;
}
