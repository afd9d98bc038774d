// Data processing pipeline: raw batch ingestion and the processing stages

pub mod ingestion;
pub mod processing;
