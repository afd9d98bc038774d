/// Stage names, artifact file names and fixed policy constants shared across the pipeline.

// Stage names (used in logs, metrics labels and the run manifest)
pub const STAGE_INGEST: &str = "ingest";
pub const STAGE_CANONICALIZE: &str = "canonicalize";
pub const STAGE_LINK: &str = "link_persons";
pub const STAGE_VALIDATE: &str = "validate";
pub const STAGE_ANALYTICS: &str = "analytics";
pub const STAGE_SEARCH_INDEX: &str = "search_index";

// Curated artifacts
pub const FACT_TABLE_FILE: &str = "fact_comp.ndjson";
pub const EMPLOYER_DIM_FILE: &str = "dim_employer.json";
pub const JOB_DIM_FILE: &str = "dim_job.json";
pub const RUN_MANIFEST_FILE: &str = "run_manifest.json";

// Analytics artifacts
pub const YEAR_SUMMARY_FILE: &str = "year_summary.json";
pub const TOP_EARNERS_FILE: &str = "top_earners.json";
pub const EMPLOYER_METRICS_FILE: &str = "employer_metrics.json";
pub const JOB_METRICS_FILE: &str = "job_metrics.json";
pub const SECTOR_METRICS_FILE: &str = "sector_metrics.json";
pub const QUALITY_REPORT_FILE: &str = "data_quality_report.json";
pub const SEARCH_INDEX_FILE: &str = "search_index.json";
pub const SUGGESTED_ALIASES_FILE: &str = "suggested_employer_aliases.csv";

/// Largest year gap that still links two records of the same name and employer.
pub const MAX_LINK_GAP_YEARS: i32 = 2;

/// Key of the all-sectors aggregate in the sector report.
pub const OVERALL_SECTOR_KEY: &str = "_overall";

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "pipeline.toml";
