use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use hyper::Server;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::app::transfer_use_case::TransferUseCase;
use crate::constants::SERVICE_NAME;
use crate::types::TriggerEvent;

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Storage "object finalized" event delivery.
///
/// Stage failures answer 500 so the delivering runtime applies its own retry and
/// dead-letter policy. A skipped object is a normal 200.
async fn handle_event(
    State(use_case): State<Arc<TransferUseCase>>,
    Json(payload): Json<Value>,
) -> Response {
    let event = match TriggerEvent::from_payload(payload) {
        Ok(event) => event,
        Err(e) => {
            warn!("Rejected event payload: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("invalid event payload: {}", e) })),
            )
                .into_response();
        }
    };

    match use_case.run(&event).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string(), "stage": e.stage() })),
        )
            .into_response(),
    }
}

/// Create the HTTP router for event delivery
pub fn create_server(use_case: Arc<TransferUseCase>) -> Router {
    Router::new()
        .route("/", post(handle_event))
        .route("/health", get(health))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(use_case)
}

/// Start the HTTP server on the specified port; returns after Ctrl-C
pub async fn start_server(
    use_case: Arc<TransferUseCase>,
    port: u16,
) -> Result<(), hyper::Error> {
    let app = create_server(use_case);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("Event endpoint listening on http://{}", addr);
    Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
