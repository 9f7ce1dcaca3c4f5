use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Which gallery store is in use (`memory` or `postgres`).
    pub gallery_backend: &'static str,
    /// Whether the gallery store is reachable.
    pub gallery_healthy: bool,
}

/// GET /health -- returns service and gallery health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let gallery_healthy = state.gallery.list().await.is_ok();

    let status = if gallery_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        gallery_backend: state.gallery.backend_name(),
        gallery_healthy,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
