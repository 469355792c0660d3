//! Health and status endpoints

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tracing::warn;

use crate::connections::StatusSnapshot;
use crate::AppState;

/// Health check response: status, module name, and version
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// Status response: registry summary plus where cue files are saved
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(flatten)]
    pub snapshot: StatusSnapshot,
    pub storage: String,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "synesthesia-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /status
///
/// Answered by the reconciliation loop, so the counts reflect every event queued before it.
pub async fn status(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, (StatusCode, String)> {
    let snapshot = state.orchestrator.snapshot().await.map_err(|e| {
        warn!("Status unavailable: {}", e);
        (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
    })?;
    Ok(Json(StatusResponse {
        snapshot,
        storage: state.storage_location.to_string(),
    }))
}

/// Build health and status routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status))
}
