use async_trait::async_trait;

use crate::error::BackendError;
use crate::types::{Issue, TableTarget};

/// Object storage addressed by (bucket, name)
#[async_trait]
pub trait BlobStorePort: Send + Sync {
    /// Full content of an object
    async fn get(&self, bucket: &str, name: &str) -> Result<Vec<u8>, BackendError>;

    /// Create or overwrite an object
    async fn put(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BackendError>;
}

/// Append-only, schema-inferring table storage
#[async_trait]
pub trait TableLoaderPort: Send + Sync {
    /// Appends `records` with schema autodetect and waits for the backend to
    /// finish. Returns the number of rows written.
    async fn append(&self, target: &TableTarget, records: &[Issue]) -> Result<u64, BackendError>;
}
