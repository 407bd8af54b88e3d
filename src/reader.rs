use crate::domain::VitalSignRecord;
use crate::error::Result;
use crate::metrics::CORRUPT_LINES_TOTAL;
use async_trait::async_trait;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Port for anything that can produce a batch of vital-sign records.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn read(&self) -> Result<Vec<VitalSignRecord>>;
}

/// Coerce a raw JSON value into the fixed record schema.
///
/// Fields that are absent or carry the wrong JSON type become `None`. This is
/// schema-coercing, not schema-validating: nothing here ever rejects a record.
/// Note an integer temperature still reads as a double, while a fractional
/// heart rate does not read as an integer.
pub fn coerce_record(value: &Value) -> VitalSignRecord {
    VitalSignRecord {
        patient_id: value
            .get("patient_id")
            .and_then(Value::as_str)
            .map(str::to_owned),
        heart_rate: value.get("heart_rate").and_then(Value::as_i64),
        blood_pressure: value.get("blood_pressure").and_then(Value::as_i64),
        temperature: value.get("temperature").and_then(Value::as_f64),
        timestamp: value
            .get("timestamp")
            .and_then(Value::as_str)
            .map(str::to_owned),
    }
}

fn null_record() -> VitalSignRecord {
    VitalSignRecord {
        patient_id: None,
        heart_rate: None,
        blood_pressure: None,
        temperature: None,
        timestamp: None,
    }
}

/// Reads semi-structured patient records from local JSON files.
///
/// The source path may be a single file or a directory of `.json`/`.jsonl`
/// files; files are consumed in lexicographic order so a re-run over an
/// unchanged source observes the same row sequence. Each file holds either
/// one JSON object per line or a single top-level array. A line that does not
/// parse becomes an all-null row (the corrupt-record convention), counted and
/// logged; only real I/O failures propagate.
pub struct JsonFileSource {
    root: PathBuf,
}

impl JsonFileSource {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn record_files(&self) -> Result<Vec<PathBuf>> {
        if self.root.is_file() {
            return Ok(vec![self.root.clone()]);
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            match path.extension().and_then(|e| e.to_str()) {
                Some("json") | Some("jsonl") => files.push(path),
                _ => {}
            }
        }
        files.sort();
        Ok(files)
    }

    fn read_file(&self, path: &Path, records: &mut Vec<VitalSignRecord>) -> Result<()> {
        let content = fs::read_to_string(path)?;
        let trimmed = content.trim_start();

        // A file is either a top-level array or JSON Lines
        if trimmed.starts_with('[') {
            match serde_json::from_str::<Vec<Value>>(&content) {
                Ok(values) => {
                    records.extend(values.iter().map(coerce_record));
                }
                Err(e) => {
                    warn!(file = %path.display(), "Unparseable record array: {}", e);
                    ::metrics::counter!(CORRUPT_LINES_TOTAL).increment(1);
                    records.push(null_record());
                }
            }
            return Ok(());
        }

        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(line) {
                Ok(value) => records.push(coerce_record(&value)),
                Err(e) => {
                    warn!(file = %path.display(), "Unparseable record line: {}", e);
                    ::metrics::counter!(CORRUPT_LINES_TOTAL).increment(1);
                    records.push(null_record());
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RecordSource for JsonFileSource {
    async fn read(&self) -> Result<Vec<VitalSignRecord>> {
        let files = self.record_files()?;
        debug!("Reading {} record file(s) from {}", files.len(), self.root.display());

        let mut records = Vec::new();
        for path in &files {
            self.read_file(path, &mut records)?;
        }
        Ok(records)
    }
}

/// Fixed in-memory source for tests and demos.
pub struct InMemorySource {
    records: Vec<VitalSignRecord>,
}

impl InMemorySource {
    pub fn new(records: Vec<VitalSignRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl RecordSource for InMemorySource {
    async fn read(&self) -> Result<Vec<VitalSignRecord>> {
        Ok(self.records.clone())
    }
}
