use thiserror::Error;

/// Failures reported by a storage or table backend adapter.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("job {job_id} failed ({reason}): {message}")]
    JobFailed {
        job_id: String,
        reason: String,
        message: String,
    },

    #[error("invalid backend response: {0}")]
    InvalidResponse(String),

    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a scan document could not be fetched or decoded.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] BackendError),

    #[error("object is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document root is not a JSON object")]
    NotAnObject,

    #[error("`issues` is not an array")]
    IssuesNotArray,

    #[error("issue at index {0} is not a JSON object")]
    IssueNotObject(usize),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV buffer flush failed: {0}")]
    Flush(String),

    #[error("upload failed: {0}")]
    Upload(#[from] BackendError),
}

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("ingestion failure for {object}: {source}")]
    Ingestion {
        object: String,
        #[source]
        source: IngestionError,
    },

    #[error("load failure for {table}: {source}")]
    Load {
        table: String,
        #[source]
        source: BackendError,
    },

    #[error("export failure for {path}: {source}")]
    Export {
        path: String,
        #[source]
        source: ExportError,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TransferError {
    /// Pipeline stage label used in logs and metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            TransferError::Ingestion { .. } => "ingestion",
            TransferError::Load { .. } => "load",
            TransferError::Export { .. } => "export",
            TransferError::Config(_) => "config",
        }
    }
}

pub type Result<T> = std::result::Result<T, TransferError>;
