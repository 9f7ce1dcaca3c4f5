//! Generation request parameters and validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Upper bound on prompt length accepted by the mesh endpoint.
pub const MAX_PROMPT_CHARS: usize = 600;
/// `MAX_PROMPT_CHARS` as `u64`, the type the `validator` length attribute expects.
const MAX_PROMPT_CHARS_U64: u64 = MAX_PROMPT_CHARS as u64;
/// Model version sent when the caller does not pick one.
pub const DEFAULT_MODEL_VERSION: &str = "latest";
/// Target character height passed to the rigging stage.
pub const DEFAULT_RIG_HEIGHT_METERS: f64 = 1.7;

// ---------------------------------------------------------------------------
// Pose mode
// ---------------------------------------------------------------------------

/// Rest pose the mesh is generated in. Rigging works best from either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoseMode {
    #[serde(rename = "a-pose")]
    APose,
    #[serde(rename = "t-pose")]
    TPose,
}

impl PoseMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PoseMode::APose => "a-pose",
            PoseMode::TPose => "t-pose",
        }
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A generation request as submitted by a client.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerationRequest {
    #[validate(length(min = 1, max = MAX_PROMPT_CHARS_U64))]
    pub prompt: String,
    pub pose_mode: Option<PoseMode>,
    pub model_version: Option<String>,
}

/// Parameters of a validated request. The prompt is trimmed and doubles
/// as the texture style prompt for the retexture stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub prompt: String,
    pub pose_mode: PoseMode,
    pub model_version: String,
}

/// Validate a request: the prompt must be non-blank and a pose mode must
/// be selected.
pub fn validate_generation_request(req: &GenerationRequest) -> Result<GenerationParams, CoreError> {
    req.validate()
        .map_err(|e| CoreError::Validation(format!("Invalid generation request: {e}")))?;

    let prompt = req.prompt.trim();
    if prompt.is_empty() {
        return Err(CoreError::Validation("prompt must not be blank".to_string()));
    }

    let pose_mode = req
        .pose_mode
        .ok_or_else(|| CoreError::Validation("pose_mode must be selected".to_string()))?;

    let model_version = req
        .model_version
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_MODEL_VERSION)
        .to_string();

    Ok(GenerationParams {
        prompt: prompt.to_string(),
        pose_mode,
        model_version,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
