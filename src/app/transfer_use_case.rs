use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, error, info, instrument};

use crate::app::ports::{BlobStorePort, TableLoaderPort};
use crate::config::Config;
use crate::constants::CSV_CONTENT_TYPE;
use crate::error::{ExportError, IngestionError, Result, TransferError};
use crate::metrics;
use crate::pipeline::csv_export::render_csv;
use crate::pipeline::enrich::UploadMetadata;
use crate::pipeline::ingestion::decode_issues;
use crate::pipeline::trigger::{derive_output_path, is_json_object};
use crate::types::{Issue, TableTarget, TransferOutcome, TransferReport, TriggerEvent};

/// Where the enriched issues go
#[derive(Debug, Clone)]
pub struct TransferSettings {
    pub target: TableTarget,
    pub output_bucket: String,
    pub output_prefix: String,
}

impl TransferSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            target: config.table_target(),
            output_bucket: config.export.bucket.clone(),
            output_prefix: config.export.prefix.clone(),
        }
    }
}

/// Moves one scan file from object storage into the issues table and a CSV export.
///
/// Stages run strictly in order (ingest, enrich, append, export) and the first
/// failure aborts the rest. Both sinks receive the same enriched records.
pub struct TransferUseCase {
    blobs: Arc<dyn BlobStorePort>,
    tables: Arc<dyn TableLoaderPort>,
    settings: TransferSettings,
}

impl TransferUseCase {
    pub fn new(
        blobs: Arc<dyn BlobStorePort>,
        tables: Arc<dyn TableLoaderPort>,
        settings: TransferSettings,
    ) -> Self {
        Self {
            blobs,
            tables,
            settings,
        }
    }

    pub fn settings(&self) -> &TransferSettings {
        &self.settings
    }

    /// Handle a single trigger event
    #[instrument(skip(self, event), fields(bucket = %event.bucket, object = %event.name))]
    pub async fn run(&self, event: &TriggerEvent) -> Result<TransferOutcome> {
        if !is_json_object(&event.name) {
            info!("Skipping non-JSON file");
            metrics::invocation::skipped();
            return Ok(TransferOutcome::Skipped {
                object: event.name.clone(),
            });
        }

        match self.transfer(event).await {
            Ok(report) => {
                metrics::invocation::completed();
                Ok(TransferOutcome::Completed(report))
            }
            Err(e) => {
                error!(stage = e.stage(), "Error processing {}: {}", event.name, e);
                metrics::invocation::failed(e.stage());
                Err(e)
            }
        }
    }

    async fn transfer(&self, event: &TriggerEvent) -> Result<TransferReport> {
        let mut issues = self.ingest(event).await?;

        UploadMetadata::from_event(event).apply(&mut issues);
        debug!("Enriched {} issues", issues.len());

        let rows_loaded = self.append(&issues).await?;
        let csv_location = self.export(&event.name, &issues).await?;

        Ok(TransferReport {
            object: event.name.clone(),
            issues: issues.len(),
            rows_loaded,
            csv_location,
            completed_at: Utc::now(),
        })
    }

    async fn ingest(&self, event: &TriggerEvent) -> Result<Vec<Issue>> {
        let ingestion_failure = |source: IngestionError| TransferError::Ingestion {
            object: event.name.clone(),
            source,
        };

        let bytes = self
            .blobs
            .get(&event.bucket, &event.name)
            .await
            .map_err(|e| ingestion_failure(e.into()))?;
        let size = bytes.len();

        let issues = decode_issues(bytes).map_err(ingestion_failure)?;
        metrics::ingest::document_decoded(size, issues.len());
        info!("Fetched {} bytes with {} issues", size, issues.len());
        Ok(issues)
    }

    async fn append(&self, issues: &[Issue]) -> Result<u64> {
        let target = &self.settings.target;
        if issues.is_empty() {
            info!("No issues to load into {}", target);
            metrics::load::skipped_empty();
            return Ok(0);
        }

        let started = Instant::now();
        let rows = self
            .tables
            .append(target, issues)
            .await
            .map_err(|source| TransferError::Load {
                table: target.to_string(),
                source,
            })?;

        metrics::load::rows_loaded(rows, started.elapsed().as_secs_f64());
        info!("Loaded {} rows to {}", rows, target);
        Ok(rows)
    }

    async fn export(&self, name: &str, issues: &[Issue]) -> Result<Option<String>> {
        let path = derive_output_path(&self.settings.output_prefix, name);
        let export_failure = |source: ExportError| TransferError::Export {
            path: path.clone(),
            source,
        };

        // the buffer moves into the upload and is dropped when it returns
        let Some(bytes) = render_csv(issues).map_err(export_failure)? else {
            debug!("No issues, CSV export skipped");
            return Ok(None);
        };
        let size = bytes.len();

        let bucket = &self.settings.output_bucket;
        self.blobs
            .put(bucket, &path, bytes, CSV_CONTENT_TYPE)
            .await
            .map_err(|e| export_failure(e.into()))?;

        metrics::export::csv_written(size);
        let location = format!("gs://{}/{}", bucket, path);
        info!("CSV saved to {}", location);
        Ok(Some(location))
    }
}
