use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::app::ports::TableLoaderPort;
use crate::config::Config;
use crate::constants::NDJSON_CONTENT_TYPE;
use crate::error::{BackendError, TransferError};
use crate::infra::http_client::{endpoint_url, GcpHttpClient};
use crate::types::{Issue, TableTarget};

/// BigQuery load-job adapter.
///
/// Records are uploaded as newline-delimited JSON in a single multipart request,
/// appended with schema autodetect, and the job is polled until it reports DONE.
pub struct BigQueryTableLoader {
    http: GcpHttpClient,
    endpoint: String,
    project_id: String,
    location: Option<String>,
    allow_field_addition: bool,
    poll_interval: Duration,
}

impl BigQueryTableLoader {
    pub fn new(http: GcpHttpClient, endpoint: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            project_id: project_id.into(),
            location: None,
            allow_field_addition: false,
            poll_interval: Duration::from_secs(1),
        }
    }

    pub fn from_config(http: GcpHttpClient, config: &Config) -> Result<Self, TransferError> {
        let project_id = config.table.project_id.clone().ok_or_else(|| {
            TransferError::Config(
                "BigQuery project id missing (set SCAN_TRANSFER_PROJECT_ID or GOOGLE_CLOUD_PROJECT)".into(),
            )
        })?;

        let mut loader = Self::new(http, config.gcp.bigquery_endpoint.clone(), project_id);
        loader.location = config.table.location.clone();
        loader.allow_field_addition = config.table.allow_field_addition;
        loader.poll_interval = config.gcp.poll_interval();
        Ok(loader)
    }

    /// Job resource submitted with the upload
    pub fn load_job(&self, target: &TableTarget, job_id: &str) -> Value {
        let mut load = json!({
            "destinationTable": {
                "projectId": self.project_id,
                "datasetId": target.dataset,
                "tableId": target.table,
            },
            "sourceFormat": "NEWLINE_DELIMITED_JSON",
            "writeDisposition": "WRITE_APPEND",
            "autodetect": true,
        });
        if self.allow_field_addition {
            load["schemaUpdateOptions"] = json!(["ALLOW_FIELD_ADDITION"]);
        }

        let mut job_reference = json!({
            "projectId": self.project_id,
            "jobId": job_id,
        });
        if let Some(location) = &self.location {
            job_reference["location"] = json!(location);
        }

        json!({
            "jobReference": job_reference,
            "configuration": { "load": load },
        })
    }

    async fn insert_job(&self, job: &Value, ndjson: Vec<u8>) -> Result<JobResource, BackendError> {
        let url = endpoint_url(
            &self.endpoint,
            &["upload", "bigquery", "v2", "projects", self.project_id.as_str(), "jobs"],
        )?;
        let boundary = format!("scan_transfer_{}", Uuid::new_v4().simple());
        let body = multipart_related(&boundary, job, &ndjson)?;

        let request = self
            .http
            .client()
            .post(url)
            .query(&[("uploadType", "multipart")])
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body);
        let resp = self.http.send(request, "bigquery jobs.insert").await?;
        Ok(resp.json().await?)
    }

    async fn get_job(&self, job_id: &str, location: Option<&str>) -> Result<JobResource, BackendError> {
        let url = endpoint_url(
            &self.endpoint,
            &["bigquery", "v2", "projects", self.project_id.as_str(), "jobs", job_id],
        )?;
        let mut request = self.http.client().get(url);
        if let Some(location) = location {
            request = request.query(&[("location", location)]);
        }
        let resp = self.http.send(request, "bigquery jobs.get").await?;
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl TableLoaderPort for BigQueryTableLoader {
    async fn append(&self, target: &TableTarget, records: &[Issue]) -> Result<u64, BackendError> {
        let job_id = format!("scan_transfer_{}", Uuid::new_v4().simple());
        let job = self.load_job(target, &job_id);
        let ndjson = encode_ndjson(records)?;
        info!(
            "Submitting load job {} for {} records ({} bytes) into {}",
            job_id,
            records.len(),
            ndjson.len(),
            target
        );

        let mut resource = self.insert_job(&job, ndjson).await?;
        let location = resource
            .job_reference
            .as_ref()
            .and_then(|reference| reference.location.clone())
            .or_else(|| self.location.clone());

        while !resource.is_done() {
            tokio::time::sleep(self.poll_interval).await;
            resource = self.get_job(&job_id, location.as_deref()).await?;
            debug!("Load job {} state: {}", job_id, resource.state());
        }

        resource.into_output_rows(&job_id)
    }
}

/// One JSON document per line, terminated by `\n`
pub fn encode_ndjson(records: &[Issue]) -> Result<Vec<u8>, BackendError> {
    let mut buffer = Vec::new();
    for record in records {
        serde_json::to_writer(&mut buffer, record)?;
        buffer.push(b'\n');
    }
    Ok(buffer)
}

/// Body for a `multipart/related` upload: job metadata first, then the data.
pub fn multipart_related(boundary: &str, metadata: &Value, data: &[u8]) -> Result<Vec<u8>, BackendError> {
    let mut body = Vec::with_capacity(data.len() + 512);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    serde_json::to_writer(&mut body, metadata)?;
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", NDJSON_CONTENT_TYPE).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    Ok(body)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobResource {
    job_reference: Option<JobReference>,
    status: Option<JobStatus>,
    statistics: Option<JobStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    state: String,
    error_result: Option<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    reason: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobStatistics {
    load: Option<LoadStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadStatistics {
    // int64 values arrive as JSON strings
    output_rows: Option<String>,
}

impl JobResource {
    fn state(&self) -> &str {
        self.status.as_ref().map(|s| s.state.as_str()).unwrap_or("UNKNOWN")
    }

    fn is_done(&self) -> bool {
        self.state() == "DONE"
    }

    fn into_output_rows(self, job_id: &str) -> Result<u64, BackendError> {
        if let Some(error) = self.status.and_then(|status| status.error_result) {
            return Err(BackendError::JobFailed {
                job_id: job_id.to_string(),
                reason: error.reason.unwrap_or_else(|| "unknown".to_string()),
                message: error.message.unwrap_or_default(),
            });
        }

        let rows = self
            .statistics
            .and_then(|statistics| statistics.load)
            .and_then(|load| load.output_rows)
            .ok_or_else(|| {
                BackendError::InvalidResponse(format!("job {} reported no outputRows", job_id))
            })?;
        rows.parse().map_err(|_| {
            BackendError::InvalidResponse(format!("job {} outputRows '{}' is not a number", job_id, rows))
        })
    }
}
