use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::app::ports::RawBatchSourcePort;
use crate::error::Result;
use crate::pipeline::ingestion::{is_batch_file_name, RawBatch};

/// Reads raw disclosure batches from a directory.
pub struct FsRawBatchSource {
    raw_dir: PathBuf,
}

impl FsRawBatchSource {
    pub fn new(raw_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
        }
    }
}

#[async_trait]
impl RawBatchSourcePort for FsRawBatchSource {
    async fn load_batches(&self) -> Result<Vec<RawBatch>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.raw_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_batch_file_name(&name) {
                names.push(name);
            } else {
                debug!("Skipping {}", name);
            }
        }
        names.sort();

        let mut batches = Vec::with_capacity(names.len());
        for name in names {
            let bytes = tokio::fs::read(self.raw_dir.join(&name)).await?;
            batches.push(RawBatch { name, bytes });
        }
        info!("Found {} raw batches in {}", batches.len(), self.raw_dir.display());
        Ok(batches)
    }
}
