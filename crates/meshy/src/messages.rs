//! Task payload types returned by the generation service.
//!
//! Every task endpoint returns an object of the shape
//! `{"id": ..., "status": "...", "progress": N, ...}` with stage-specific
//! artifact fields. This module decodes the fields the pipeline relies on
//! and maps them onto a [`TaskStatus`], keeping the raw payload attached.

use rigforge_core::stage::{Stage, TaskState, TaskStatus};
use serde::Deserialize;

/// Response to every submission endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    /// Server-assigned task identifier.
    pub result: String,
}

/// Fields common to every task payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskPayload {
    #[serde(default)]
    pub id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub progress: Option<f64>,
    /// Mesh and retexture artifacts.
    #[serde(default)]
    pub model_urls: Option<ModelUrls>,
    /// Rigging and animation artifacts.
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub task_error: Option<TaskError>,
}

/// Download URLs for a textured or untextured mesh.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelUrls {
    #[serde(default)]
    pub glb: Option<String>,
    #[serde(default)]
    pub fbx: Option<String>,
    #[serde(default)]
    pub usdz: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskError {
    #[serde(default)]
    pub message: Option<String>,
}

/// The `result` object of a rigging task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RiggingResult {
    #[serde(default)]
    pub rigged_character_glb_url: Option<String>,
    #[serde(default)]
    pub rigged_character_fbx_url: Option<String>,
    #[serde(default)]
    pub basic_animations: Option<BasicAnimations>,
}

/// Locomotion clips the rigging stage may attach on its own.
///
/// The `*_armature_*` variants carry only the skeleton and the clip and are
/// preferred over the fully baked models.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BasicAnimations {
    #[serde(default)]
    pub running_armature_glb_url: Option<String>,
    #[serde(default)]
    pub running_glb_url: Option<String>,
    #[serde(default)]
    pub walking_armature_glb_url: Option<String>,
    #[serde(default)]
    pub walking_glb_url: Option<String>,
}

/// The `result` object of an animation task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnimationResult {
    #[serde(default)]
    pub animation_glb_url: Option<String>,
    #[serde(default)]
    pub animation_fbx_url: Option<String>,
}

/// Decode a raw task payload into a [`TaskStatus`] for the given stage.
pub fn decode_task_status(
    stage: Stage,
    payload: serde_json::Value,
) -> Result<TaskStatus, serde_json::Error> {
    let task: TaskPayload = serde_json::from_value(payload.clone())?;

    let mut status = TaskStatus::new(TaskState::parse(&task.status)).with_payload(payload);

    if let Some(progress) = task.progress {
        status = status.with_progress(progress.clamp(0.0, 100.0) as u8);
    }

    if let Some(message) = task
        .task_error
        .and_then(|e| e.message)
        .filter(|m| !m.trim().is_empty())
    {
        status = status.with_error(message);
    }

    if let Some(url) = artifact_url(stage, &task.model_urls, task.result.as_ref()) {
        status = status.with_result_url(url);
    }

    Ok(status)
}

/// Pick the artifact URL the next stage (or the viewer) consumes.
fn artifact_url(
    stage: Stage,
    model_urls: &Option<ModelUrls>,
    result: Option<&serde_json::Value>,
) -> Option<String> {
    match stage {
        Stage::MeshGeneration | Stage::Retexture => {
            model_urls.as_ref().and_then(|urls| urls.glb.clone())
        }
        Stage::Rigging => result
            .and_then(|r| RiggingResult::deserialize(r).ok())
            .and_then(|r| r.rigged_character_glb_url),
        Stage::Animation => result
            .and_then(|r| AnimationResult::deserialize(r).ok())
            .and_then(|r| r.animation_glb_url),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
