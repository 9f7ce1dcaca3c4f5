//! Inputs for submitting a job to each stage of the chain.

use serde::{Deserialize, Serialize};

use crate::generation::PoseMode;
use crate::stage::Stage;

/// Everything the remote service needs to start one stage.
///
/// Later stages reference their predecessor by remote task id rather than
/// by artifact URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageInput {
    MeshGeneration {
        prompt: String,
        pose_mode: PoseMode,
        model_version: String,
    },
    Retexture {
        input_task_id: String,
        style_prompt: String,
    },
    Rigging {
        input_task_id: String,
        height_meters: f64,
    },
    Animation {
        rig_task_id: String,
        action_id: u32,
    },
}

impl StageInput {
    pub fn stage(&self) -> Stage {
        match self {
            StageInput::MeshGeneration { .. } => Stage::MeshGeneration,
            StageInput::Retexture { .. } => Stage::Retexture,
            StageInput::Rigging { .. } => Stage::Rigging,
            StageInput::Animation { .. } => Stage::Animation,
        }
    }
}
