use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use crate::app::ports::FactTablePort;
use crate::error::Result;
use crate::types::FactRecord;

/// Reads a published newline-delimited JSON fact table.
pub struct NdjsonFactTableAdapter {
    path: PathBuf,
}

impl NdjsonFactTableAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FactTablePort for NdjsonFactTableAdapter {
    async fn load_facts(&self) -> Result<Vec<FactRecord>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let facts = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<std::result::Result<Vec<FactRecord>, _>>()?;
        info!("Loaded {} facts from {}", facts.len(), self.path.display());
        Ok(facts)
    }
}
