use std::sync::Arc;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use scan_transfer::infra::{InMemoryBlobStore, InMemoryTableLoader};
use scan_transfer::server::create_server;
use scan_transfer::types::TableTarget;
use scan_transfer::{TransferSettings, TransferUseCase};

fn app(blobs: Arc<InMemoryBlobStore>, tables: Arc<InMemoryTableLoader>) -> axum::Router {
    let settings = TransferSettings {
        target: TableTarget {
            dataset: "security_scans".to_string(),
            table: "issues_data".to_string(),
        },
        output_bucket: "processed-csvs".to_string(),
        output_prefix: "processed/".to_string(),
    };
    create_server(Arc::new(TransferUseCase::new(blobs, tables, settings)))
}

async fn post(app: axum::Router, payload: Value) -> Result<(StatusCode, Value)> {
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))?;
    let response = app.oneshot(request).await?;
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

#[tokio::test]
async fn structured_cloud_event_is_processed() -> Result<()> {
    let blobs = Arc::new(InMemoryBlobStore::new());
    let tables = Arc::new(InMemoryTableLoader::new());
    blobs.insert("uploads", "scan.json", br#"{"issues":[{"id":1}]}"#.to_vec(), "application/json");

    let (status, body) = post(
        app(blobs.clone(), tables.clone()),
        json!({
            "specversion": "1.0",
            "id": "evt-1",
            "type": "google.cloud.storage.object.v1.finalized",
            "data": {"bucket": "uploads", "name": "scan.json", "timeCreated": "T"}
        }),
    )
    .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["rows_loaded"], 1);
    assert_eq!(body["csv_location"], "gs://processed-csvs/processed/scan.csv");
    assert!(blobs.object("processed-csvs", "processed/scan.csv").is_some());
    Ok(())
}

#[tokio::test]
async fn non_json_object_answers_skipped() -> Result<()> {
    let blobs = Arc::new(InMemoryBlobStore::new());
    let tables = Arc::new(InMemoryTableLoader::new());

    let (status, body) = post(
        app(blobs.clone(), tables.clone()),
        json!({"bucket": "uploads", "name": "notes.txt", "timeCreated": "T"}),
    )
    .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "skipped", "object": "notes.txt"}));
    assert_eq!(blobs.get_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn missing_fields_are_a_bad_request() -> Result<()> {
    let (status, body) = post(
        app(Arc::new(InMemoryBlobStore::new()), Arc::new(InMemoryTableLoader::new())),
        json!({"bucket": "uploads"}),
    )
    .await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap_or_default().contains("invalid event payload"));
    Ok(())
}

#[tokio::test]
async fn stage_failure_is_a_server_error() -> Result<()> {
    let (status, body) = post(
        app(Arc::new(InMemoryBlobStore::new()), Arc::new(InMemoryTableLoader::new())),
        json!({"bucket": "uploads", "name": "missing.json", "timeCreated": "T"}),
    )
    .await?;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["stage"], "ingestion");
    Ok(())
}

#[tokio::test]
async fn health_reports_service() -> Result<()> {
    let app = app(Arc::new(InMemoryBlobStore::new()), Arc::new(InMemoryTableLoader::new()));
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = hyper::body::to_bytes(response.into_body()).await?;
    let body: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["service"], "scan-transfer");
    Ok(())
}
