//! Metric catalog for the pipeline.
//!
//! Names are declared once here and pre-registered at startup so a typo in a
//! stage shows up as an unregistered series instead of silently forking a new
//! one. The `metrics` facade is recorder-agnostic; no exporter is wired.

use once_cell::sync::Lazy;
use tracing::debug;

pub const PIPELINE_RUNS_TOTAL: &str = "vitals_pipeline_runs_total";
pub const PIPELINE_DURATION_SECONDS: &str = "vitals_pipeline_duration_seconds";
pub const RECORDS_READ_TOTAL: &str = "vitals_records_read_total";
pub const RECORDS_VALID_TOTAL: &str = "vitals_records_valid_total";
pub const RECORDS_INVALID_TOTAL: &str = "vitals_records_invalid_total";
pub const CORRUPT_LINES_TOTAL: &str = "vitals_corrupt_lines_total";
pub const AUDIT_BATCHES_TOTAL: &str = "vitals_audit_batches_total";
pub const PATIENTS_PER_RUN: &str = "vitals_patients_per_run";

#[derive(Debug, Clone, Copy)]
pub enum MetricKind {
    Counter,
    Histogram,
}

/// Documentation for a single metric.
#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub kind: MetricKind,
    pub help: &'static str,
}

pub static METRIC_CATALOG: Lazy<Vec<MetricDoc>> = Lazy::new(|| {
    vec![
        MetricDoc {
            name: PIPELINE_RUNS_TOTAL,
            kind: MetricKind::Counter,
            help: "Completed pipeline invocations",
        },
        MetricDoc {
            name: PIPELINE_DURATION_SECONDS,
            kind: MetricKind::Histogram,
            help: "Wall-clock duration of a full pipeline run",
        },
        MetricDoc {
            name: RECORDS_READ_TOTAL,
            kind: MetricKind::Counter,
            help: "Raw records ingested from the source",
        },
        MetricDoc {
            name: RECORDS_VALID_TOTAL,
            kind: MetricKind::Counter,
            help: "Records that passed the plausibility rules",
        },
        MetricDoc {
            name: RECORDS_INVALID_TOTAL,
            kind: MetricKind::Counter,
            help: "Records routed to the audit sink",
        },
        MetricDoc {
            name: CORRUPT_LINES_TOTAL,
            kind: MetricKind::Counter,
            help: "Source lines that failed to parse and became all-null rows",
        },
        MetricDoc {
            name: AUDIT_BATCHES_TOTAL,
            kind: MetricKind::Counter,
            help: "Rejected-record batches appended to the audit location",
        },
        MetricDoc {
            name: PATIENTS_PER_RUN,
            kind: MetricKind::Histogram,
            help: "Distinct patients in the aggregated output",
        },
    ]
});

/// Pre-register every cataloged metric with the installed recorder.
pub fn register_metrics() {
    for doc in METRIC_CATALOG.iter() {
        match doc.kind {
            MetricKind::Counter => {
                let _ = ::metrics::counter!(doc.name);
            }
            MetricKind::Histogram => {
                let _ = ::metrics::histogram!(doc.name);
            }
        }
    }
    debug!("Registered {} pipeline metrics", METRIC_CATALOG.len());
}
