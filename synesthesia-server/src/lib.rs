//! synesthesia-server library
//!
//! Reconciles playback state reported by producers (playback controllers) with editors
//! (cue file composers) and downstream subscribers. The engine lives in [`state`]; the
//! participants reach it through the handles in [`connections`]; [`api`] exposes those
//! handles over WebSocket and SSE.

use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod connections;
pub mod error;
pub mod state;
pub mod storage;

pub use connections::OrchestratorHandle;
pub use error::{Error, Result};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Entry point into the reconciliation loop
    pub orchestrator: OrchestratorHandle,
    /// Where saved cue files go, for display only
    pub storage_location: Arc<str>,
}

impl AppState {
    /// Create new application state
    pub fn new(orchestrator: OrchestratorHandle, storage_location: impl Into<Arc<str>>) -> Self {
        Self {
            orchestrator,
            storage_location: storage_location.into(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/control", get(api::control::control_socket))
        .route("/composer", get(api::composer::composer_socket))
        .route("/broadcast", get(api::broadcast::broadcast_stream))
        .merge(api::health_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
