use crate::aggregator;
use crate::constants::{
    STEP_INGESTION, STEP_INVALID_DATA, STEP_TRANSFORMATION, STEP_VALIDATION, STEP_WRITE,
};
use crate::error::Result;
use crate::logging::{log_step, StepSeverity};
use crate::metrics::{
    AUDIT_BATCHES_TOTAL, PATIENTS_PER_RUN, PIPELINE_DURATION_SECONDS, PIPELINE_RUNS_TOTAL,
    RECORDS_INVALID_TOTAL, RECORDS_READ_TOTAL, RECORDS_VALID_TOTAL,
};
use crate::reader::RecordSource;
use crate::sinks::{AnalyticsSink, AuditSink};
use crate::validator;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

/// Result of a complete pipeline run
#[derive(Debug, Serialize)]
pub struct PipelineRunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub records_read: usize,
    pub valid_records: usize,
    pub invalid_records: usize,
    pub patients: usize,
    /// Identifier of the audit batch written this run, if any
    pub audit_batch: Option<String>,
}

/// Counts from a read-and-validate pass with no writes.
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub records_read: usize,
    pub valid_records: usize,
    pub invalid_records: usize,
}

pub struct Pipeline;

impl Pipeline {
    /// Run the full five-stage pipeline: ingest, split, audit the rejects,
    /// aggregate, overwrite the analytics table.
    ///
    /// Stages run strictly in sequence; each stage's output is fully
    /// materialized before the next begins. A sink failure aborts the run
    /// after an ERROR step event; an audit batch that already landed stays
    /// landed (append semantics carry no rollback).
    #[instrument(skip_all, fields(run_id = tracing::field::Empty))]
    pub async fn run(
        source: &dyn RecordSource,
        audit: &dyn AuditSink,
        analytics: &dyn AnalyticsSink,
    ) -> Result<PipelineRunSummary> {
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));
        let started_at = Utc::now();
        let t_run = std::time::Instant::now();
        ::metrics::counter!(PIPELINE_RUNS_TOTAL).increment(1);

        // Step 1: ingest raw records
        log_step(STEP_INGESTION, "Reading raw data from the source.", StepSeverity::Info);
        let records = source.read().await?;
        let records_read = records.len();
        ::metrics::counter!(RECORDS_READ_TOTAL).increment(records_read as u64);
        info!("Ingested {} raw record(s)", records_read);

        // Step 2: validate and split
        log_step(STEP_VALIDATION, "Starting data validation.", StepSeverity::Info);
        let split = validator::split(records);
        log_step(
            STEP_VALIDATION,
            &format!(
                "Valid records: {}, Invalid records: {}",
                split.valid.len(),
                split.invalid.len()
            ),
            StepSeverity::Info,
        );
        ::metrics::counter!(RECORDS_VALID_TOTAL).increment(split.valid.len() as u64);
        ::metrics::counter!(RECORDS_INVALID_TOTAL).increment(split.invalid.len() as u64);

        // Step 3: route rejects to the audit location
        let mut audit_batch = None;
        if !split.invalid.is_empty() {
            log_step(STEP_INVALID_DATA, "Found invalid records.", StepSeverity::Warning);
            match audit.append(&split.invalid).await {
                Ok(batch) => {
                    ::metrics::counter!(AUDIT_BATCHES_TOTAL).increment(1);
                    audit_batch = Some(batch);
                }
                Err(e) => {
                    log_step(
                        STEP_INVALID_DATA,
                        &format!("Failed to append rejected records: {}", e),
                        StepSeverity::Error,
                    );
                    return Err(e);
                }
            }
        }

        // Step 4: aggregate, join, classify
        log_step(
            STEP_TRANSFORMATION,
            "Aggregating vitals and flagging high-risk patients.",
            StepSeverity::Info,
        );
        let aggregates = aggregator::aggregate(&split.valid);
        ::metrics::histogram!(PATIENTS_PER_RUN).record(aggregates.len() as f64);
        info!("Aggregated {} patient(s)", aggregates.len());

        // Step 5: overwrite the analytics table
        log_step(
            STEP_WRITE,
            "Writing aggregated and transformed data to the analytics table.",
            StepSeverity::Info,
        );
        if let Err(e) = analytics.overwrite(&aggregates).await {
            log_step(
                STEP_WRITE,
                &format!("Failed to write the analytics table: {}", e),
                StepSeverity::Error,
            );
            return Err(e);
        }

        ::metrics::histogram!(PIPELINE_DURATION_SECONDS).record(t_run.elapsed().as_secs_f64());

        Ok(PipelineRunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            records_read,
            valid_records: split.valid.len(),
            invalid_records: split.invalid.len(),
            patients: aggregates.len(),
            audit_batch,
        })
    }

    /// Read and validate only; counts are reported, nothing is written.
    #[instrument(skip_all)]
    pub async fn check(source: &dyn RecordSource) -> Result<ValidationReport> {
        log_step(STEP_INGESTION, "Reading raw data from the source.", StepSeverity::Info);
        let records = source.read().await?;
        let records_read = records.len();

        log_step(STEP_VALIDATION, "Starting data validation.", StepSeverity::Info);
        let split = validator::split(records);
        log_step(
            STEP_VALIDATION,
            &format!(
                "Valid records: {}, Invalid records: {}",
                split.valid.len(),
                split.invalid.len()
            ),
            StepSeverity::Info,
        );

        Ok(ValidationReport {
            records_read,
            valid_records: split.valid.len(),
            invalid_records: split.invalid.len(),
        })
    }
}
