use crate::constants;
use crate::error::{PipelineError, Result};
use serde::Deserialize;
use std::env;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub audit: AuditConfig,
    pub analytics: AnalyticsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Directory (or single file) holding the raw patient record files
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Append-only directory for rejected record batches
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    /// Root directory under which tables are materialized
    pub warehouse_root: String,
    /// Dotted table identifier, e.g. "health_data.patients_insights"
    pub table: String,
    /// Staging directory for the write-then-rename overwrite path
    pub staging_path: String,
}

impl Config {
    pub fn load(config_path: &str) -> Result<Self> {
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path, e
            ))
        })?;

        let mut config: Config = toml::from_str(&config_content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment variables win over file values, so deployments can point
    /// the same config at different locations without editing it.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = env::var("VITALS_SOURCE_PATH") {
            self.source.path = path;
        }
        if let Ok(path) = env::var("VITALS_AUDIT_PATH") {
            self.audit.path = path;
        }
        if let Ok(root) = env::var("VITALS_WAREHOUSE_ROOT") {
            self.analytics.warehouse_root = root;
        }
        if let Ok(table) = env::var("VITALS_TABLE") {
            self.analytics.table = table;
        }
        if let Ok(staging) = env::var("VITALS_STAGING_PATH") {
            self.analytics.staging_path = staging;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig {
                path: constants::DEFAULT_SOURCE_PATH.to_string(),
            },
            audit: AuditConfig {
                path: constants::DEFAULT_AUDIT_PATH.to_string(),
            },
            analytics: AnalyticsConfig {
                warehouse_root: constants::DEFAULT_WAREHOUSE_ROOT.to_string(),
                table: constants::DEFAULT_TABLE_ID.to_string(),
                staging_path: format!("{}/.staging", constants::DEFAULT_WAREHOUSE_ROOT),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_full_config_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[source]
path = "fixtures/records"

[audit]
path = "fixtures/records/invalid"

[analytics]
warehouse_root = "fixtures/warehouse"
table = "health_data.patients_insights"
staging_path = "fixtures/warehouse/.staging"
"#
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.source.path, "fixtures/records");
        assert_eq!(config.audit.path, "fixtures/records/invalid");
        assert_eq!(config.analytics.table, "health_data.patients_insights");
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        let err = Config::load("does/not/exist.toml").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
