use serde::{Deserialize, Serialize};

/// Outcome of reading one raw batch file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchStatus {
    Accepted,
    Rejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub file: String,
    pub year: Option<i32>,
    pub rows: usize,
    pub malformed_values: usize,
    #[serde(flatten)]
    pub status: BatchStatus,
}

impl BatchReport {
    pub fn is_accepted(&self) -> bool {
        self.status == BatchStatus::Accepted
    }
}

/// Per-run summary of the ingestion stage, recorded in the run manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub batches: Vec<BatchReport>,
}

impl IngestReport {
    pub fn push(&mut self, batch: BatchReport) {
        self.batches.push(batch);
    }

    pub fn accepted_batches(&self) -> usize {
        self.batches.iter().filter(|b| b.is_accepted()).count()
    }

    pub fn rejected_batches(&self) -> usize {
        self.batches.len() - self.accepted_batches()
    }

    pub fn total_rows(&self) -> usize {
        self.batches
            .iter()
            .filter(|b| b.is_accepted())
            .map(|b| b.rows)
            .sum()
    }

    pub fn malformed_values(&self) -> usize {
        self.batches.iter().map(|b| b.malformed_values).sum()
    }

    pub fn years(&self) -> Vec<i32> {
        self.batches
            .iter()
            .filter(|b| b.is_accepted())
            .filter_map(|b| b.year)
            .collect()
    }
}
