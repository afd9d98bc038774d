use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::DEFAULT_CONFIG_FILE;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub quality: QualityConfig,
    pub analytics: AnalyticsConfig,
    pub suggestions: SuggestionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub raw_dir: PathBuf,
    pub employer_aliases: PathBuf,
    pub job_aliases: PathBuf,
    pub curated_dir: PathBuf,
    pub analytics_dir: PathBuf,
    pub dictionaries_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            employer_aliases: PathBuf::from("data/dictionaries/employer_aliases.csv"),
            job_aliases: PathBuf::from("data/dictionaries/job_title_aliases.csv"),
            curated_dir: PathBuf::from("data/curated"),
            analytics_dir: PathBuf::from("data/analytics"),
            dictionaries_dir: PathBuf::from("data/dictionaries"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

/// Thresholds used by the data-quality report.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub high_salary_threshold: f64,
    pub disclosure_threshold: f64,
    pub headcount_drop_min_prev: usize,
    pub headcount_drop_ratio: f64,
    pub drops_per_year: usize,
    pub drop_samples: usize,
    pub outlier_samples: usize,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            high_salary_threshold: 2_000_000.0,
            disclosure_threshold: 100_000.0,
            headcount_drop_min_prev: 50,
            headcount_drop_ratio: 0.5,
            drops_per_year: 5,
            drop_samples: 10,
            outlier_samples: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub top_earners: usize,
    pub top_job_titles: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            top_earners: 100,
            top_job_titles: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    pub min_keyword_overlap: f64,
    pub min_name_len: usize,
    pub min_keyword_len: usize,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            min_keyword_overlap: 0.7,
            min_name_len: 10,
            min_keyword_len: 3,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from an explicit path, or from `pipeline.toml` in the
    /// working directory when present, falling back to built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    debug!("No {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: PipelineConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.quality.headcount_drop_ratio) {
            return Err(PipelineError::Config(format!(
                "quality.headcount_drop_ratio must be within [0, 1], got {}",
                self.quality.headcount_drop_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.suggestions.min_keyword_overlap) {
            return Err(PipelineError::Config(format!(
                "suggestions.min_keyword_overlap must be within [0, 1], got {}",
                self.suggestions.min_keyword_overlap
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [paths]
            raw_dir = "/srv/disclosures"

            [analytics]
            top_earners = 25
            "#,
        )
        .unwrap();

        assert_eq!(config.paths.raw_dir, PathBuf::from("/srv/disclosures"));
        assert_eq!(config.paths.curated_dir, PathBuf::from("data/curated"));
        assert_eq!(config.analytics.top_earners, 25);
        assert_eq!(config.analytics.top_job_titles, 10);
        assert_eq!(config.quality.high_salary_threshold, 2_000_000.0);
    }

    #[test]
    fn test_validate_rejects_out_of_range_ratio() {
        let mut config = PipelineConfig::default();
        config.quality.headcount_drop_ratio = 1.5;
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let result = PipelineConfig::load(Some(Path::new("/nonexistent/pipeline.toml")));
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }
}
