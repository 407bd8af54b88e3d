use crate::domain::{FlaggedRecord, PatientAggregate};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

/// Append-only destination for rejected records. Prior contents are never
/// touched; coordination between concurrent writers is the sink location's
/// problem, not this component's.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append one batch of rejected records, returning an identifier for the
    /// batch that landed.
    async fn append(&self, rejected: &[FlaggedRecord]) -> Result<String>;
}

/// Overwrite-mode destination for the final labeled aggregates. Each call
/// replaces the table's previous contents entirely.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn overwrite(&self, aggregates: &[PatientAggregate]) -> Result<()>;
}

fn to_json_lines<T: serde::Serialize>(rows: &[T]) -> Result<String> {
    let mut out = String::new();
    for row in rows {
        out.push_str(&serde_json::to_string(row)?);
        out.push('\n');
    }
    Ok(out)
}

/// Audit sink that appends each batch as a uniquely named JSON Lines file in
/// a directory, so re-runs only ever grow the audit trail.
pub struct JsonDirAuditSink {
    dir: PathBuf,
}

impl JsonDirAuditSink {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl AuditSink for JsonDirAuditSink {
    async fn append(&self, rejected: &[FlaggedRecord]) -> Result<String> {
        fs::create_dir_all(&self.dir)?;

        // Timestamp for the humans, batch id for uniqueness
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let batch_id = Uuid::new_v4();
        let filename = format!("rejected_{}_{}.jsonl", timestamp, batch_id.simple());
        let path = self.dir.join(&filename);

        fs::write(&path, to_json_lines(rejected)?)?;
        info!("Appended {} rejected record(s) to {}", rejected.len(), path.display());

        Ok(path.to_string_lossy().to_string())
    }
}

/// Analytics sink that materializes a dotted table identifier as a JSON Lines
/// file under a warehouse root. The full payload is staged first and renamed
/// over the target, so an overwrite either lands whole or not at all.
pub struct FsTableSink {
    warehouse_root: PathBuf,
    table: String,
    staging_dir: PathBuf,
}

impl FsTableSink {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(
        warehouse_root: P,
        table: &str,
        staging_dir: Q,
    ) -> Self {
        Self {
            warehouse_root: warehouse_root.into(),
            table: table.to_string(),
            staging_dir: staging_dir.into(),
        }
    }

    /// "health_data.patients_insights" -> <root>/health_data/patients_insights.jsonl
    fn table_path(&self) -> Result<PathBuf> {
        let segments: Vec<&str> = self.table.split('.').collect();
        if segments.iter().any(|s| {
            s.is_empty() || s.contains(std::path::MAIN_SEPARATOR) || s.contains('/')
        }) {
            return Err(PipelineError::Sink {
                message: format!("invalid table identifier '{}'", self.table),
            });
        }

        let mut path = self.warehouse_root.clone();
        for segment in &segments[..segments.len() - 1] {
            path.push(segment);
        }
        path.push(format!("{}.jsonl", segments[segments.len() - 1]));
        Ok(path)
    }
}

#[async_trait]
impl AnalyticsSink for FsTableSink {
    async fn overwrite(&self, aggregates: &[PatientAggregate]) -> Result<()> {
        let target = self.table_path()?;

        fs::create_dir_all(&self.staging_dir)?;
        let staged = self
            .staging_dir
            .join(format!("{}.jsonl", Uuid::new_v4().simple()));
        fs::write(&staged, to_json_lines(aggregates)?)?;
        debug!("Staged {} aggregate row(s) at {}", aggregates.len(), staged.display());

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&staged, &target)?;
        info!("Overwrote table '{}' at {}", self.table, target.display());

        Ok(())
    }
}

/// In-memory audit sink for tests.
#[derive(Default)]
pub struct InMemoryAuditSink {
    batches: Arc<Mutex<Vec<Vec<FlaggedRecord>>>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<Vec<FlaggedRecord>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn append(&self, rejected: &[FlaggedRecord]) -> Result<String> {
        let mut batches = self.batches.lock().unwrap();
        batches.push(rejected.to_vec());
        Ok(format!("memory:{}", batches.len() - 1))
    }
}

/// In-memory analytics sink for tests.
#[derive(Default)]
pub struct InMemoryAnalyticsSink {
    table: Arc<Mutex<Vec<PatientAggregate>>>,
}

impl InMemoryAnalyticsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<PatientAggregate> {
        self.table.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalyticsSink for InMemoryAnalyticsSink {
    async fn overwrite(&self, aggregates: &[PatientAggregate]) -> Result<()> {
        let mut table = self.table.lock().unwrap();
        table.clear();
        table.extend_from_slice(aggregates);
        Ok(())
    }
}

/// Read a materialized table back for inspection.
pub fn read_table(path: &Path) -> Result<Vec<PatientAggregate>> {
    let content = fs::read_to_string(path)?;
    let mut rows = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        rows.push(serde_json::from_str(line)?);
    }
    Ok(rows)
}
