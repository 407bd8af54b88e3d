use anyhow::Result;
use std::fs;
use std::io::Write;
use tempfile::tempdir;

use vitals_insights::domain::RiskCategory;
use vitals_insights::pipeline::Pipeline;
use vitals_insights::reader::JsonFileSource;
use vitals_insights::sinks::{read_table, FsTableSink, JsonDirAuditSink};

const TABLE: &str = "health_data.patients_insights";

fn write_fixture_records(dir: &std::path::Path) -> Result<()> {
    let mut file = fs::File::create(dir.join("readings.jsonl"))?;
    // P1: three plausible readings
    writeln!(
        file,
        r#"{{"patient_id": "P1", "heart_rate": 70, "blood_pressure": 80, "temperature": 36.5, "timestamp": "2024-01-01T08:00:00Z"}}"#
    )?;
    writeln!(
        file,
        r#"{{"patient_id": "P1", "heart_rate": 72, "blood_pressure": 82, "temperature": 36.6, "timestamp": "2024-01-01T12:00:00Z"}}"#
    )?;
    writeln!(
        file,
        r#"{{"patient_id": "P1", "heart_rate": 74, "blood_pressure": 84, "temperature": 36.7, "timestamp": "2024-01-01T16:00:00Z"}}"#
    )?;
    // P1: an implausible spike that must be audited, not averaged
    writeln!(
        file,
        r#"{{"patient_id": "P1", "heart_rate": 250, "blood_pressure": 84, "temperature": 36.7, "timestamp": "2024-01-01T17:00:00Z"}}"#
    )?;
    // P2: sustained high average heart rate
    writeln!(
        file,
        r#"{{"patient_id": "P2", "heart_rate": 110, "blood_pressure": 120, "temperature": 37.0, "timestamp": "2024-01-01T08:00:00Z"}}"#
    )?;
    writeln!(
        file,
        r#"{{"patient_id": "P2", "heart_rate": 115, "blood_pressure": 122, "temperature": 37.1, "timestamp": "2024-01-01T12:00:00Z"}}"#
    )?;
    // missing temperature: invalid regardless of the other vitals
    writeln!(
        file,
        r#"{{"patient_id": "P3", "heart_rate": 72, "blood_pressure": 80, "timestamp": "2024-01-01T08:00:00Z"}}"#
    )?;
    Ok(())
}

#[tokio::test]
async fn full_run_routes_aggregates_and_rejects() -> Result<()> {
    let workspace = tempdir()?;
    let source_dir = workspace.path().join("patients");
    let audit_dir = workspace.path().join("patients/invalid");
    let warehouse = workspace.path().join("warehouse");
    fs::create_dir_all(&source_dir)?;
    write_fixture_records(&source_dir)?;

    let source = JsonFileSource::new(&source_dir);
    let audit = JsonDirAuditSink::new(&audit_dir);
    let analytics = FsTableSink::new(&warehouse, TABLE, warehouse.join(".staging"));

    let summary = Pipeline::run(&source, &audit, &analytics).await?;
    assert_eq!(summary.records_read, 7);
    assert_eq!(summary.valid_records, 5);
    assert_eq!(summary.invalid_records, 2);
    assert_eq!(summary.patients, 2);

    // Analytics table holds one labeled row per patient with valid readings
    let table_path = warehouse.join("health_data").join("patients_insights.jsonl");
    let rows = read_table(&table_path)?;
    assert_eq!(rows.len(), 2);

    let p1 = rows
        .iter()
        .find(|r| r.patient_id.as_deref() == Some("P1"))
        .unwrap();
    assert_eq!(p1.avg_heart_rate, Some(72.0));
    assert_eq!(p1.avg_blood_pressure, Some(82.0));
    assert_eq!(p1.avg_temperature, Some(36.6));
    assert_eq!(p1.stddev_heart_rate, Some(2.0));
    assert_eq!(p1.risk_category, RiskCategory::Low);

    let p2 = rows
        .iter()
        .find(|r| r.patient_id.as_deref() == Some("P2"))
        .unwrap();
    assert_eq!(p2.avg_heart_rate, Some(112.5));
    assert_eq!(p2.risk_category, RiskCategory::High);

    // P3 had no valid readings, so no aggregate row
    assert!(rows.iter().all(|r| r.patient_id.as_deref() != Some("P3")));

    // The audit batch holds exactly the rejected records, flags intact
    let audit_files: Vec<_> = fs::read_dir(&audit_dir)?.collect::<std::io::Result<_>>()?;
    assert_eq!(audit_files.len(), 1);
    let audit_content = fs::read_to_string(audit_files[0].path())?;
    assert_eq!(audit_content.lines().count(), 2);
    assert!(audit_content.contains("\"heart_rate\":250"));
    assert!(audit_content.contains("\"patient_id\":\"P3\""));
    assert!(audit_content.contains("\"is_valid\":false"));

    Ok(())
}

#[tokio::test]
async fn reruns_are_idempotent_for_analytics_but_not_audit() -> Result<()> {
    let workspace = tempdir()?;
    let source_dir = workspace.path().join("patients");
    let audit_dir = workspace.path().join("patients/invalid");
    let warehouse = workspace.path().join("warehouse");
    fs::create_dir_all(&source_dir)?;
    write_fixture_records(&source_dir)?;

    let source = JsonFileSource::new(&source_dir);
    let audit = JsonDirAuditSink::new(&audit_dir);
    let analytics = FsTableSink::new(&warehouse, TABLE, warehouse.join(".staging"));
    let table_path = warehouse.join("health_data").join("patients_insights.jsonl");

    Pipeline::run(&source, &audit, &analytics).await?;
    let first_table_bytes = fs::read(&table_path)?;
    let first_audit_count = fs::read_dir(&audit_dir)?.count();

    Pipeline::run(&source, &audit, &analytics).await?;
    let second_table_bytes = fs::read(&table_path)?;
    let second_audit_count = fs::read_dir(&audit_dir)?.count();

    // Overwrite mode: unchanged source yields a byte-identical table
    assert_eq!(first_table_bytes, second_table_bytes);
    // Append mode: the audit trail grows monotonically across re-runs
    assert_eq!(first_audit_count, 1);
    assert_eq!(second_audit_count, 2);

    Ok(())
}

#[tokio::test]
async fn clean_source_writes_no_audit_batch() -> Result<()> {
    let workspace = tempdir()?;
    let source_dir = workspace.path().join("patients");
    let audit_dir = workspace.path().join("patients/invalid");
    let warehouse = workspace.path().join("warehouse");
    fs::create_dir_all(&source_dir)?;

    let mut file = fs::File::create(source_dir.join("readings.jsonl"))?;
    writeln!(
        file,
        r#"{{"patient_id": "P1", "heart_rate": 72, "blood_pressure": 80, "temperature": 36.6, "timestamp": "2024-01-01T08:00:00Z"}}"#
    )?;

    let source = JsonFileSource::new(&source_dir);
    let audit = JsonDirAuditSink::new(&audit_dir);
    let analytics = FsTableSink::new(&warehouse, TABLE, warehouse.join(".staging"));

    let summary = Pipeline::run(&source, &audit, &analytics).await?;
    assert_eq!(summary.invalid_records, 0);
    assert!(summary.audit_batch.is_none());
    // the audit directory was never even created
    assert!(!audit_dir.exists());

    Ok(())
}

#[tokio::test]
async fn analytics_failure_aborts_after_audit_landed() -> Result<()> {
    let workspace = tempdir()?;
    let source_dir = workspace.path().join("patients");
    let audit_dir = workspace.path().join("patients/invalid");
    fs::create_dir_all(&source_dir)?;
    write_fixture_records(&source_dir)?;

    // A regular file where the warehouse should be makes the staging
    // directory impossible to create
    let blocked = workspace.path().join("blocked");
    fs::write(&blocked, b"not a directory")?;

    let source = JsonFileSource::new(&source_dir);
    let audit = JsonDirAuditSink::new(&audit_dir);
    let analytics = FsTableSink::new(&blocked, TABLE, blocked.join(".staging"));

    let result = Pipeline::run(&source, &audit, &analytics).await;
    assert!(result.is_err());

    // The audit append happened before the failing write and is not rolled
    // back: at-least-once for audit, at-most-once for analytics
    let audit_count = fs::read_dir(&audit_dir)?.count();
    assert_eq!(audit_count, 1);

    Ok(())
}
