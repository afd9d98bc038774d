use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Missing required field '{field}' in {source_name}")]
    MissingField { source_name: String, field: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Stage '{stage}' failed: {message}")]
    StageFailure { stage: String, message: String },
}

impl PipelineError {
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::StageFailure {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
