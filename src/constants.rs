/// Step names used in pipeline log events, shared between the orchestrator
/// and the CLI so the audit trail reads consistently across a run.

// Pipeline step names (carried on every step log event)
pub const STEP_PIPELINE_START: &str = "Pipeline Start";
pub const STEP_INGESTION: &str = "Data Ingestion";
pub const STEP_VALIDATION: &str = "Data Validation";
pub const STEP_INVALID_DATA: &str = "Invalid Data";
pub const STEP_TRANSFORMATION: &str = "Data Transformation";
pub const STEP_WRITE: &str = "Data Write";
pub const STEP_PIPELINE_END: &str = "Pipeline End";

// Plausibility bounds for vital signs. All bounds are exclusive: a reading
// sitting exactly on a bound is implausible.
pub const HEART_RATE_BOUNDS: (i64, i64) = (40, 200);
pub const BLOOD_PRESSURE_BOUNDS: (i64, i64) = (50, 200);
pub const TEMPERATURE_BOUNDS: (f64, f64) = (35.0, 42.0);

// Default locations, overridable via config.toml and environment
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const DEFAULT_SOURCE_PATH: &str = "data/patients";
pub const DEFAULT_AUDIT_PATH: &str = "data/patients/invalid";
pub const DEFAULT_WAREHOUSE_ROOT: &str = "warehouse";
pub const DEFAULT_TABLE_ID: &str = "health_data.patients_insights";
