use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single scan finding. Keys are not known in advance and keep document order.
pub type Issue = serde_json::Map<String, Value>;

/// Metadata of the newly created object that triggered an invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub bucket: String,
    pub name: String,
    #[serde(rename = "timeCreated")]
    pub time_created: String,
}

impl TriggerEvent {
    pub fn new(
        bucket: impl Into<String>,
        name: impl Into<String>,
        time_created: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            name: name.into(),
            time_created: time_created.into(),
        }
    }

    /// Accepts either a CloudEvents structured-mode envelope (object payload under
    /// `data`) or the bare storage object payload delivered in binary mode.
    pub fn from_payload(payload: Value) -> Result<Self, serde_json::Error> {
        match payload {
            Value::Object(mut envelope)
                if !envelope.contains_key("bucket") && envelope.contains_key("data") =>
            {
                let data = envelope.remove("data").unwrap_or(Value::Null);
                serde_json::from_value(data)
            }
            other => serde_json::from_value(other),
        }
    }
}

/// Fully qualified destination of the table append
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableTarget {
    pub dataset: String,
    pub table: String,
}

impl std::fmt::Display for TableTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.dataset, self.table)
    }
}

/// Result of a pipeline run that did not fail
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransferOutcome {
    /// Object name did not end in `.json`; nothing was touched
    Skipped { object: String },
    Completed(TransferReport),
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferReport {
    pub object: String,
    pub issues: usize,
    pub rows_loaded: u64,
    /// `gs://bucket/path` of the CSV, absent when there were no issues
    pub csv_location: Option<String>,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_bare_storage_payload() {
        let event = TriggerEvent::from_payload(json!({
            "bucket": "scans",
            "name": "scan.json",
            "timeCreated": "2024-05-01T10:00:00.000Z",
            "size": "42"
        }))
        .unwrap();

        assert_eq!(event, TriggerEvent::new("scans", "scan.json", "2024-05-01T10:00:00.000Z"));
    }

    #[test]
    fn parses_structured_cloud_event() {
        let event = TriggerEvent::from_payload(json!({
            "specversion": "1.0",
            "type": "google.cloud.storage.object.v1.finalized",
            "source": "//storage.googleapis.com/projects/_/buckets/scans",
            "id": "1234",
            "data": {
                "bucket": "scans",
                "name": "nested/scan.json",
                "timeCreated": "2024-05-01T10:00:00.000Z"
            }
        }))
        .unwrap();

        assert_eq!(event.bucket, "scans");
        assert_eq!(event.name, "nested/scan.json");
    }

    #[test]
    fn missing_time_created_is_rejected() {
        let result = TriggerEvent::from_payload(json!({"bucket": "scans", "name": "scan.json"}));
        assert!(result.is_err());
    }

    #[test]
    fn skipped_outcome_serializes_with_status_tag() {
        let outcome = TransferOutcome::Skipped { object: "notes.txt".to_string() };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value, json!({"status": "skipped", "object": "notes.txt"}));
    }
}
