//! Handlers for the `/generations` resource.
//!
//! Creating a generation validates the request, registers the session
//! with the tracker, and runs it on a background task. Clients then poll
//! the snapshot endpoint.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rigforge_core::error::CoreError;
use rigforge_core::generation::{validate_generation_request, GenerationRequest};
use rigforge_core::types::EntityId;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;
use crate::tracker::SessionSnapshot;

#[derive(Debug, Serialize)]
pub struct CreatedSession {
    pub session_id: EntityId,
}

fn not_found(id: EntityId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "GenerationSession",
        id: id.to_string(),
    })
}

/// POST /api/v1/generations
pub async fn create_generation(
    State(state): State<AppState>,
    Json(input): Json<GenerationRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<CreatedSession>>)> {
    let params = validate_generation_request(&input)?;

    let session = state.orchestrator.new_session(params);
    let session_id = session.id;
    let abandon = state.sessions.register(&session).await;
    state.orchestrator.spawn(session, abandon);

    tracing::info!(%session_id, "Generation session created");

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: CreatedSession { session_id },
        }),
    ))
}

/// GET /api/v1/generations/{id}
pub async fn get_generation(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<Json<DataResponse<SessionSnapshot>>> {
    let snapshot = state.sessions.get(id).await.ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: snapshot }))
}

/// DELETE /api/v1/generations/{id}
///
/// Jobs already running are left to finish; their results are discarded.
pub async fn abandon_generation(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<StatusCode> {
    if state.sessions.abandon(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}
