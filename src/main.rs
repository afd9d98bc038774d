use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use sunshine_pipeline::app::alias_suggestion_use_case::AliasSuggestionUseCase;
use sunshine_pipeline::app::pipeline_use_case::{RunOptions, RunPipelineUseCase};
use sunshine_pipeline::app::quality_gate_use_case::QualityGateUseCase;
use sunshine_pipeline::config::PipelineConfig;
use sunshine_pipeline::constants::FACT_TABLE_FILE;
use sunshine_pipeline::infra::alias_table_adapter::FsAliasTableAdapter;
use sunshine_pipeline::infra::artifact_output_adapter::FsArtifactOutputAdapter;
use sunshine_pipeline::infra::fact_table_adapter::NdjsonFactTableAdapter;
use sunshine_pipeline::infra::raw_batch_adapter::FsRawBatchSource;
use sunshine_pipeline::logging;

#[derive(Parser)]
#[command(name = "sunshine_pipeline")]
#[command(about = "Public-sector salary disclosure pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the pipeline config file (defaults to ./pipeline.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every stage and publish the curated and analytics artifacts
    Run {
        /// Skip the data-quality report
        #[arg(long)]
        skip_validation: bool,
    },
    /// Rebuild the data-quality report from the published fact table
    Validate,
    /// Suggest employer aliases from the raw batches for manual review
    SuggestAliases,
}

fn output_adapter(config: &PipelineConfig) -> FsArtifactOutputAdapter {
    FsArtifactOutputAdapter::new(
        &config.paths.curated_dir,
        &config.paths.analytics_dir,
        &config.paths.dictionaries_dir,
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = PipelineConfig::load(cli.config.as_deref())?;
    logging::init_logging(&config.paths.log_dir);

    match cli.command {
        Commands::Run { skip_validation } => {
            println!("🚀 Running full pipeline...");
            let use_case = RunPipelineUseCase::new(
                Box::new(FsRawBatchSource::new(&config.paths.raw_dir)),
                Box::new(FsAliasTableAdapter::new(
                    &config.paths.employer_aliases,
                    &config.paths.job_aliases,
                )),
                Box::new(output_adapter(&config)),
                config.clone(),
            );

            match use_case.run(RunOptions { skip_validation }).await {
                Ok(outcome) => {
                    let manifest = &outcome.manifest;
                    println!("\n📊 Pipeline Results:");
                    println!("   Run id: {}", manifest.run_id);
                    println!(
                        "   Batches: {} accepted, {} rejected",
                        manifest.ingest.accepted_batches(),
                        manifest.ingest.rejected_batches()
                    );
                    println!("   Facts: {}", manifest.counts.facts);
                    println!("   Persons: {}", manifest.counts.persons);
                    println!("   Employers: {}", manifest.counts.employers);
                    println!("   Jobs: {}", manifest.counts.jobs);
                    for timing in &manifest.stages {
                        println!("   {:<14} {} ms", timing.stage, timing.duration_ms);
                    }
                    if let Some(counts) = &manifest.counts.quality_issues {
                        println!(
                            "   Quality issues: {} high, {} medium, {} low, {} info",
                            counts.high, counts.medium, counts.low, counts.info
                        );
                    }
                    println!("✅ Published {} artifacts", outcome.published.len());
                }
                Err(e) => {
                    error!("Pipeline run failed: {:#}", e);
                    println!("❌ Pipeline run failed: {:#}", e);
                    return Err(e);
                }
            }
        }
        Commands::Validate => {
            println!("🔍 Validating published fact table...");
            let use_case = QualityGateUseCase::with_default_quality_gate(
                config.quality.clone(),
                Box::new(NdjsonFactTableAdapter::new(
                    config.paths.curated_dir.join(FACT_TABLE_FILE),
                )),
                Box::new(output_adapter(&config)),
            );
            let report = use_case.run().await?;
            println!("   Total records: {}", report.summary.total_records);
            println!(
                "   Issues: {} high, {} medium, {} low, {} info",
                report.issue_counts.high,
                report.issue_counts.medium,
                report.issue_counts.low,
                report.issue_counts.info
            );
            if report.has_high_severity() {
                println!("⚠️  High severity issues detected - review the report!");
            }
        }
        Commands::SuggestAliases => {
            println!("🔎 Generating employer alias suggestions...");
            let use_case = AliasSuggestionUseCase::new(
                Box::new(FsRawBatchSource::new(&config.paths.raw_dir)),
                Box::new(output_adapter(&config)),
                config.suggestions.clone(),
            );
            let suggestions = use_case.run().await?;
            println!("   Total suggestions: {}", suggestions.len());
            for s in suggestions.iter().take(10) {
                println!("   '{}' -> '{}' ({})", s.raw, s.canonical, s.reason);
            }
        }
    }

    info!("Done");
    Ok(())
}
