use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::app::ports::{BlobStorePort, TableLoaderPort};
use crate::error::BackendError;
use crate::types::{Issue, TableTarget};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-memory object store for development and testing.
/// Counts every call so tests can assert that nothing was touched.
#[derive(Default)]
pub struct InMemoryBlobStore {
    objects: Mutex<HashMap<(String, String), StoredObject>>,
    gets: AtomicUsize,
    puts: AtomicUsize,
    deny_writes: AtomicBool,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without counting it as a call
    pub fn insert(&self, bucket: &str, name: &str, bytes: impl Into<Vec<u8>>, content_type: &str) {
        lock(&self.objects).insert(
            (bucket.to_string(), name.to_string()),
            StoredObject {
                bytes: bytes.into(),
                content_type: content_type.to_string(),
            },
        );
    }

    pub fn object(&self, bucket: &str, name: &str) -> Option<StoredObject> {
        lock(&self.objects)
            .get(&(bucket.to_string(), name.to_string()))
            .cloned()
    }

    pub fn object_count(&self) -> usize {
        lock(&self.objects).len()
    }

    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Make every subsequent `put` fail with a permission error
    pub fn deny_writes(&self) {
        self.deny_writes.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStorePort for InMemoryBlobStore {
    async fn get(&self, bucket: &str, name: &str) -> Result<Vec<u8>, BackendError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.object(bucket, name)
            .map(|object| object.bytes)
            .ok_or_else(|| BackendError::NotFound(format!("gs://{}/{}", bucket, name)))
    }

    async fn put(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BackendError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.deny_writes.load(Ordering::SeqCst) {
            return Err(BackendError::PermissionDenied(format!("gs://{}/{}", bucket, path)));
        }
        debug!("Stored {} bytes at gs://{}/{}", bytes.len(), bucket, path);
        self.insert(bucket, path, bytes, content_type);
        Ok(())
    }
}

/// In-memory append-only table backend. Rows accumulate per target, so a
/// re-delivered event shows up as duplicate rows just like the real table.
#[derive(Default)]
pub struct InMemoryTableLoader {
    tables: Mutex<HashMap<String, Vec<Issue>>>,
    appends: AtomicUsize,
    reject_loads: AtomicBool,
}

impl InMemoryTableLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self, target: &TableTarget) -> Vec<Issue> {
        lock(&self.tables)
            .get(&target.to_string())
            .cloned()
            .unwrap_or_default()
    }

    pub fn append_calls(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }

    /// Make every subsequent load fail the way a schema conflict does
    pub fn reject_loads(&self) {
        self.reject_loads.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl TableLoaderPort for InMemoryTableLoader {
    async fn append(&self, target: &TableTarget, records: &[Issue]) -> Result<u64, BackendError> {
        let call = self.appends.fetch_add(1, Ordering::SeqCst);
        if self.reject_loads.load(Ordering::SeqCst) {
            return Err(BackendError::JobFailed {
                job_id: format!("in_memory_{}", call),
                reason: "invalid".to_string(),
                message: "Provided Schema does not match Table".to_string(),
            });
        }
        lock(&self.tables)
            .entry(target.to_string())
            .or_default()
            .extend(records.iter().cloned());
        Ok(records.len() as u64)
    }
}
