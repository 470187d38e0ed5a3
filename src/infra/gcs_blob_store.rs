use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use tracing::debug;

use crate::app::ports::BlobStorePort;
use crate::error::BackendError;
use crate::infra::http_client::{endpoint_url, GcpHttpClient};

/// Cloud Storage adapter over the JSON API (`storage/v1`).
/// Works against any compatible emulator when `endpoint` points at it.
pub struct GcsBlobStore {
    http: GcpHttpClient,
    endpoint: String,
}

impl GcsBlobStore {
    pub fn new(http: GcpHttpClient, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    fn object_url(&self, bucket: &str, name: &str) -> Result<Url, BackendError> {
        endpoint_url(&self.endpoint, &["storage", "v1", "b", bucket, "o", name])
    }

    fn upload_url(&self, bucket: &str) -> Result<Url, BackendError> {
        endpoint_url(&self.endpoint, &["upload", "storage", "v1", "b", bucket, "o"])
    }
}

#[async_trait]
impl BlobStorePort for GcsBlobStore {
    async fn get(&self, bucket: &str, name: &str) -> Result<Vec<u8>, BackendError> {
        let url = self.object_url(bucket, name)?;
        let subject = format!("gs://{}/{}", bucket, name);
        debug!("GET {}", subject);

        let request = self.http.client().get(url).query(&[("alt", "media")]);
        let resp = self.http.send(request, &subject).await?;
        Ok(resp.bytes().await?.to_vec())
    }

    async fn put(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BackendError> {
        let url = self.upload_url(bucket)?;
        let subject = format!("gs://{}/{}", bucket, path);
        debug!("PUT {} ({} bytes, {})", subject, bytes.len(), content_type);

        // media uploads replace any existing object with the same name
        let request = self
            .http
            .client()
            .post(url)
            .query(&[("uploadType", "media"), ("name", path)])
            .header(CONTENT_TYPE, content_type)
            .body(bytes);
        self.http.send(request, &subject).await?;
        Ok(())
    }
}
