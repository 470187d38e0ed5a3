use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    DEFAULT_BIGQUERY_ENDPOINT, DEFAULT_DATASET, DEFAULT_OUTPUT_BUCKET, DEFAULT_OUTPUT_PREFIX,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_STORAGE_ENDPOINT, DEFAULT_TABLE,
};
use crate::error::{Result, TransferError};
use crate::types::TableTarget;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub table: TableConfig,
    pub export: ExportConfig,
    pub gcp: GcpConfig,
}

/// Destination of the append-only load
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub project_id: Option<String>,
    pub dataset: String,
    pub table: String,
    pub location: Option<String>,
    /// Let autodetect add new columns to an existing table
    pub allow_field_addition: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            dataset: DEFAULT_DATASET.to_string(),
            table: DEFAULT_TABLE.to_string(),
            location: None,
            allow_field_addition: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub bucket: String,
    pub prefix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_OUTPUT_BUCKET.to_string(),
            prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GcpConfig {
    pub storage_endpoint: String,
    pub bigquery_endpoint: String,
    /// Pre-resolved OAuth bearer token; requests go out unauthenticated without one
    pub access_token: Option<String>,
    pub poll_interval_ms: u64,
}

impl Default for GcpConfig {
    fn default() -> Self {
        Self {
            storage_endpoint: DEFAULT_STORAGE_ENDPOINT.to_string(),
            bigquery_endpoint: DEFAULT_BIGQUERY_ENDPOINT.to_string(),
            access_token: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl GcpConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    /// Loads `.env`, then the optional TOML file, then environment overrides.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let explicit = std::env::var("SCAN_TRANSFER_CONFIG").ok().map(PathBuf::from);
        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            TransferError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| TransferError::Config(e.to_string()))
    }

    /// Applies environment-style overrides through `lookup` so tests can inject values.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(v) = non_empty("SCAN_TRANSFER_DATASET") {
            self.table.dataset = v;
        }
        if let Some(v) = non_empty("SCAN_TRANSFER_TABLE") {
            self.table.table = v;
        }
        if let Some(v) = non_empty("SCAN_TRANSFER_PROJECT_ID").or_else(|| non_empty("GOOGLE_CLOUD_PROJECT")) {
            self.table.project_id = Some(v);
        }
        if let Some(v) = non_empty("SCAN_TRANSFER_LOCATION") {
            self.table.location = Some(v);
        }
        if let Some(v) = non_empty("SCAN_TRANSFER_ALLOW_FIELD_ADDITION") {
            self.table.allow_field_addition = matches!(v.trim(), "1" | "true" | "yes");
        }
        if let Some(v) = non_empty("SCAN_TRANSFER_OUTPUT_BUCKET") {
            self.export.bucket = v;
        }
        // an empty prefix is a legitimate override, so it bypasses the non-empty filter
        if let Some(v) = lookup("SCAN_TRANSFER_OUTPUT_PREFIX") {
            self.export.prefix = v;
        }
        if let Some(v) = non_empty("SCAN_TRANSFER_STORAGE_ENDPOINT") {
            self.gcp.storage_endpoint = v;
        }
        if let Some(v) = non_empty("SCAN_TRANSFER_BIGQUERY_ENDPOINT") {
            self.gcp.bigquery_endpoint = v;
        }
        if let Some(v) = non_empty("GOOGLE_OAUTH_ACCESS_TOKEN") {
            self.gcp.access_token = Some(v);
        }
        if let Some(ms) = non_empty("SCAN_TRANSFER_POLL_INTERVAL_MS").and_then(|v| v.trim().parse().ok()) {
            self.gcp.poll_interval_ms = ms;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.table.dataset.trim().is_empty() {
            return Err(TransferError::Config("dataset name cannot be empty".into()));
        }
        if self.table.table.trim().is_empty() {
            return Err(TransferError::Config("table name cannot be empty".into()));
        }
        if self.export.bucket.trim().is_empty() {
            return Err(TransferError::Config("output bucket cannot be empty".into()));
        }
        if self.gcp.poll_interval_ms == 0 {
            return Err(TransferError::Config("poll interval must be positive".into()));
        }
        Ok(())
    }

    pub fn table_target(&self) -> TableTarget {
        TableTarget {
            dataset: self.table.dataset.clone(),
            table: self.table.table.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_match_deployment_constants() {
        let config = Config::default();
        assert_eq!(config.table.dataset, "security_scans");
        assert_eq!(config.table.table, "issues_data");
        assert_eq!(config.export.bucket, "your-processed-csvs");
        assert_eq!(config.export.prefix, "processed/");
        assert_eq!(config.gcp.poll_interval(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [table]
            dataset = "scans_eu"
            project_id = "acme-sec"

            [export]
            prefix = "csv/"
            "#,
        )
        .unwrap();

        assert_eq!(config.table.dataset, "scans_eu");
        assert_eq!(config.table.table, "issues_data");
        assert_eq!(config.table.project_id.as_deref(), Some("acme-sec"));
        assert_eq!(config.export.bucket, "your-processed-csvs");
        assert_eq!(config.export.prefix, "csv/");
    }

    #[test]
    fn reads_config_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[export]\nbucket = \"scan-csvs\"").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.export.bucket, "scan-csvs");
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let result = Config::from_file(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(TransferError::Config(_))));
    }

    #[test]
    fn environment_overrides_win() {
        let vars: HashMap<&str, &str> = [
            ("SCAN_TRANSFER_DATASET", "other_ds"),
            ("SCAN_TRANSFER_TABLE", "other_table"),
            ("SCAN_TRANSFER_OUTPUT_BUCKET", "other-bucket"),
            ("SCAN_TRANSFER_OUTPUT_PREFIX", ""),
            ("GOOGLE_CLOUD_PROJECT", "fallback-project"),
            ("SCAN_TRANSFER_POLL_INTERVAL_MS", "250"),
            ("SCAN_TRANSFER_ALLOW_FIELD_ADDITION", "true"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.table_target().to_string(), "other_ds.other_table");
        assert_eq!(config.export.bucket, "other-bucket");
        assert_eq!(config.export.prefix, "");
        assert_eq!(config.table.project_id.as_deref(), Some("fallback-project"));
        assert_eq!(config.gcp.poll_interval_ms, 250);
        assert!(config.table.allow_field_addition);
    }

    #[test]
    fn explicit_project_beats_fallback() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "SCAN_TRANSFER_PROJECT_ID" => Some("explicit".to_string()),
            "GOOGLE_CLOUD_PROJECT" => Some("fallback".to_string()),
            _ => None,
        });
        assert_eq!(config.table.project_id.as_deref(), Some("explicit"));
    }

    #[test]
    fn rejects_empty_names_and_zero_interval() {
        let mut config = Config::default();
        config.table.dataset = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.gcp.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }
}
