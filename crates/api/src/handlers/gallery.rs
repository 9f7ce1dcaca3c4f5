//! Handlers for the `/gallery` resource.

use axum::extract::State;
use axum::Json;
use rigforge_core::gallery::GalleryEntry;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/gallery
pub async fn list_gallery(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<GalleryEntry>>>> {
    let entries = state.gallery.list().await?;
    Ok(Json(DataResponse { data: entries }))
}
