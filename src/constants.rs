//! Default names and fixed literals shared across the transfer pipeline.
//! Anything deployment specific here can be overridden through `Config`.

// Target table defaults
pub const DEFAULT_DATASET: &str = "security_scans";
pub const DEFAULT_TABLE: &str = "issues_data";

// CSV export defaults
pub const DEFAULT_OUTPUT_BUCKET: &str = "your-processed-csvs";
pub const DEFAULT_OUTPUT_PREFIX: &str = "processed/";

// Backend endpoints
pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";
pub const DEFAULT_BIGQUERY_ENDPOINT: &str = "https://bigquery.googleapis.com";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

// Trigger filter and path derivation
pub const JSON_SUFFIX: &str = ".json";
pub const CSV_SUFFIX: &str = ".csv";

/// Array field in the scan document that holds the issue records
pub const ISSUES_FIELD: &str = "issues";

// Fields injected into every issue record
pub const FILE_UPLOAD_TIME_FIELD: &str = "file_upload_time";
pub const SOURCE_FILE_FIELD: &str = "source_file";

pub const CSV_CONTENT_TYPE: &str = "text/csv";
pub const NDJSON_CONTENT_TYPE: &str = "application/octet-stream";

pub const SERVICE_NAME: &str = "scan-transfer";
