use clap::{Parser, Subcommand};
use tracing::error;

use vitals_insights::config::Config;
use vitals_insights::constants;
use vitals_insights::logging::{self, log_step, StepSeverity};
use vitals_insights::metrics;
use vitals_insights::pipeline::Pipeline;
use vitals_insights::reader::JsonFileSource;
use vitals_insights::sinks::{FsTableSink, JsonDirAuditSink};

#[derive(Parser)]
#[command(name = "vitals_insights")]
#[command(about = "Patient vitals data-quality and risk-insights pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: ingest, validate, audit rejects, aggregate, write
    Run {
        /// Path to the pipeline config file
        #[arg(long, default_value = constants::DEFAULT_CONFIG_PATH)]
        config: String,
    },
    /// Read and validate the source, report counts, write nothing
    Check {
        /// Path to the pipeline config file
        #[arg(long, default_value = constants::DEFAULT_CONFIG_PATH)]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logging();
    metrics::register_metrics();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            let config = Config::load(&config)?;

            log_step(
                constants::STEP_PIPELINE_START,
                "Patient vitals processing pipeline initiated.",
                StepSeverity::Info,
            );
            println!("🚀 Running vitals insights pipeline...");

            let source = JsonFileSource::new(&config.source.path);
            let audit = JsonDirAuditSink::new(&config.audit.path);
            let analytics = FsTableSink::new(
                &config.analytics.warehouse_root,
                &config.analytics.table,
                &config.analytics.staging_path,
            );

            match Pipeline::run(&source, &audit, &analytics).await {
                Ok(summary) => {
                    log_step(
                        constants::STEP_PIPELINE_END,
                        "Patient vitals processing pipeline completed.",
                        StepSeverity::Info,
                    );
                    println!("\n📊 Pipeline results (run {}):", summary.run_id);
                    println!("   Records read: {}", summary.records_read);
                    println!("   Valid: {}", summary.valid_records);
                    println!("   Invalid: {}", summary.invalid_records);
                    println!("   Patients aggregated: {}", summary.patients);
                    if let Some(batch) = &summary.audit_batch {
                        println!("   Audit batch: {}", batch);
                    }
                }
                Err(e) => {
                    error!("Pipeline failed: {}", e);
                    println!("❌ Pipeline failed: {}", e);
                    return Err(e.into());
                }
            }
        }
        Commands::Check { config } => {
            let config = Config::load(&config)?;
            println!("🔎 Validating source records (no writes)...");

            let source = JsonFileSource::new(&config.source.path);
            match Pipeline::check(&source).await {
                Ok(report) => {
                    println!("\n📊 Validation results:");
                    println!("   Records read: {}", report.records_read);
                    println!("   Valid: {}", report.valid_records);
                    println!("   Invalid: {}", report.invalid_records);
                }
                Err(e) => {
                    error!("Validation check failed: {}", e);
                    println!("❌ Validation check failed: {}", e);
                    return Err(e.into());
                }
            }
        }
    }
    Ok(())
}
