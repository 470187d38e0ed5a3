//! Metrics for the transfer pipeline.
//!
//! Names live in [`MetricName`] so call sites never spell metric strings by hand.
//! Each stage records through its own submodule.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Once;

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    InvocationsTotal,
    ObjectsSkipped,
    IssuesIngested,
    IngestBytes,
    RowsLoaded,
    LoadDuration,
    LoadJobsSkipped,
    CsvExported,
    CsvBytes,
    FailuresTotal,
}

impl MetricName {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricName::InvocationsTotal => "scan_transfer_invocations_total",
            MetricName::ObjectsSkipped => "scan_transfer_objects_skipped_total",
            MetricName::IssuesIngested => "scan_transfer_issues_ingested_total",
            MetricName::IngestBytes => "scan_transfer_ingest_bytes",
            MetricName::RowsLoaded => "scan_transfer_rows_loaded_total",
            MetricName::LoadDuration => "scan_transfer_load_duration_seconds",
            MetricName::LoadJobsSkipped => "scan_transfer_load_jobs_skipped_total",
            MetricName::CsvExported => "scan_transfer_csv_exported_total",
            MetricName::CsvBytes => "scan_transfer_csv_bytes",
            MetricName::FailuresTotal => "scan_transfer_failures_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static INIT: Once = Once::new();

/// Installs the Prometheus exporter when `SCAN_TRANSFER_METRICS_PORT` is set.
/// Idempotent; without a port the `metrics` macros are no-ops.
pub fn init_metrics() {
    let port: Option<u16> = std::env::var("SCAN_TRANSFER_METRICS_PORT")
        .ok()
        .and_then(|value| value.parse().ok());
    let Some(port) = port else {
        return;
    };

    INIT.call_once(|| {
        let addr: SocketAddr = ([0, 0, 0, 0], port).into();
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
        match builder.install() {
            Ok(()) => info!("Prometheus exporter listening on http://{}/metrics", addr),
            Err(e) => warn!("Prometheus exporter install failed: {}", e),
        }
    });
}

pub mod invocation {
    use super::MetricName;

    pub fn skipped() {
        ::metrics::counter!(MetricName::ObjectsSkipped.as_str()).increment(1);
        ::metrics::counter!(MetricName::InvocationsTotal.as_str(), "outcome" => "skipped").increment(1);
    }

    pub fn completed() {
        ::metrics::counter!(MetricName::InvocationsTotal.as_str(), "outcome" => "completed").increment(1);
    }

    /// Record a failed invocation, labelled with the stage that failed
    pub fn failed(stage: &'static str) {
        ::metrics::counter!(MetricName::FailuresTotal.as_str(), "stage" => stage).increment(1);
        ::metrics::counter!(MetricName::InvocationsTotal.as_str(), "outcome" => "failed").increment(1);
    }
}

pub mod ingest {
    use super::MetricName;

    pub fn document_decoded(bytes: usize, issues: usize) {
        ::metrics::histogram!(MetricName::IngestBytes.as_str()).record(bytes as f64);
        ::metrics::counter!(MetricName::IssuesIngested.as_str()).increment(issues as u64);
    }
}

pub mod load {
    use super::MetricName;

    pub fn rows_loaded(rows: u64, duration_secs: f64) {
        ::metrics::counter!(MetricName::RowsLoaded.as_str()).increment(rows);
        ::metrics::histogram!(MetricName::LoadDuration.as_str()).record(duration_secs);
    }

    pub fn skipped_empty() {
        ::metrics::counter!(MetricName::LoadJobsSkipped.as_str()).increment(1);
    }
}

pub mod export {
    use super::MetricName;

    pub fn csv_written(bytes: usize) {
        ::metrics::counter!(MetricName::CsvExported.as_str()).increment(1);
        ::metrics::histogram!(MetricName::CsvBytes.as_str()).record(bytes as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_share_prefix() {
        let all = [
            MetricName::InvocationsTotal,
            MetricName::ObjectsSkipped,
            MetricName::IssuesIngested,
            MetricName::IngestBytes,
            MetricName::RowsLoaded,
            MetricName::LoadDuration,
            MetricName::LoadJobsSkipped,
            MetricName::CsvExported,
            MetricName::CsvBytes,
            MetricName::FailuresTotal,
        ];
        for name in all {
            assert!(name.to_string().starts_with("scan_transfer_"));
        }
    }

    #[test]
    fn recording_without_exporter_is_a_noop() {
        invocation::skipped();
        load::rows_loaded(3, 0.5);
        export::csv_written(128);
    }
}
