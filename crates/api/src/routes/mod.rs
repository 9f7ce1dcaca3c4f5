pub mod gallery;
pub mod generation;
pub mod health;
pub mod proxy;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /generations                 start a session (POST)
/// /generations/{id}            snapshot (GET), abandon (DELETE)
///
/// /gallery                     finished generations, newest first (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/generations", generation::router())
        .nest("/gallery", gallery::router())
}
