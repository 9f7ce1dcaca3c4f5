//! Route definitions for generation sessions.
//!
//! Mounted at `/generations`.
//!
//! ```text
//! POST   /          create_generation
//! GET    /{id}      get_generation
//! DELETE /{id}      abandon_generation
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::generation;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(generation::create_generation))
        .route(
            "/{id}",
            get(generation::get_generation).delete(generation::abandon_generation),
        )
}
