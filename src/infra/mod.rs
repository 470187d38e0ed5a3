//! Adapters behind the application ports: Cloud Storage and BigQuery over
//! their REST APIs, plus in-memory doubles.

pub mod bigquery_loader;
pub mod gcs_blob_store;
pub mod http_client;
pub mod in_memory;
#[cfg(test)]
pub(crate) mod mock_server;

pub use bigquery_loader::BigQueryTableLoader;
pub use gcs_blob_store::GcsBlobStore;
pub use http_client::GcpHttpClient;
pub use in_memory::{InMemoryBlobStore, InMemoryTableLoader};
