//! Route definitions for the gallery. Mounted at `/gallery`.

use axum::routing::get;
use axum::Router;

use crate::handlers::gallery;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(gallery::list_gallery))
}
