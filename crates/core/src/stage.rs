//! Stage and task-status vocabulary for the remote generation chain.
//!
//! A character is produced by four remote job types run in order:
//! mesh generation, retexturing, rigging, and animation. Each job is
//! opaque and polled until it reaches a terminal [`TaskState`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// One discrete remote job type in the mesh -> texture -> rig -> animate chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    MeshGeneration,
    Retexture,
    Rigging,
    Animation,
}

impl Stage {
    /// All stages in chain order.
    pub const CHAIN: [Stage; 4] = [
        Stage::MeshGeneration,
        Stage::Retexture,
        Stage::Rigging,
        Stage::Animation,
    ];

    /// Advisory average duration of a job of this type, used only for the
    /// estimated-time-remaining figure reported while polling.
    pub fn expected_duration_secs(self) -> u64 {
        match self {
            Stage::MeshGeneration => 60,
            Stage::Retexture => 90,
            Stage::Rigging => 60,
            Stage::Animation => 45,
        }
    }

    /// Human-readable name used in user-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            Stage::MeshGeneration => "mesh generation",
            Stage::Retexture => "retexture",
            Stage::Rigging => "rigging",
            Stage::Animation => "animation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Lifecycle of one generation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    MeshPending,
    TexturePending,
    RigPending,
    AnimationPending,
    Done,
    Failed,
}

impl SessionState {
    /// The stage currently running, if any.
    pub fn active_stage(self) -> Option<Stage> {
        match self {
            SessionState::MeshPending => Some(Stage::MeshGeneration),
            SessionState::TexturePending => Some(Stage::Retexture),
            SessionState::RigPending => Some(Stage::Rigging),
            SessionState::AnimationPending => Some(Stage::Animation),
            SessionState::Idle | SessionState::Done | SessionState::Failed => None,
        }
    }

    /// `Done` or `Failed`; no further events change the session.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Done | SessionState::Failed)
    }
}

// ---------------------------------------------------------------------------
// Task state
// ---------------------------------------------------------------------------

/// Status of a remote job as reported by a single poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    InProgress,
    Succeeded,
    Failed,
    Canceled,
    /// A status string this client does not recognise. Treated as
    /// non-terminal so that vocabulary additions upstream keep polling.
    Unknown(String),
}

impl TaskState {
    /// Parse an upstream status string (case-insensitive).
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" | "QUEUED" => TaskState::Pending,
            "IN_PROGRESS" | "RUNNING" => TaskState::InProgress,
            "SUCCEEDED" | "SUCCESS" => TaskState::Succeeded,
            "FAILED" | "ERROR" => TaskState::Failed,
            "CANCELED" | "CANCELLED" => TaskState::Canceled,
            _ => TaskState::Unknown(raw.to_string()),
        }
    }

    /// `true` for `Failed` and `Canceled`.
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskState::Failed | TaskState::Canceled)
    }
}

// ---------------------------------------------------------------------------
// Task status / handle
// ---------------------------------------------------------------------------

/// Snapshot produced by one status check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    /// Completion percentage (0-100) when the upstream reports one.
    pub progress_percent: Option<u8>,
    /// Stage-specific artifact URL, if the upstream attached one.
    pub result_url: Option<String>,
    pub error_message: Option<String>,
    /// The raw upstream payload. The animation resolver scans this for
    /// clip URLs after rigging.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl TaskStatus {
    /// Build a status with no payload, progress, or error.
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            progress_percent: None,
            result_url: None,
            error_message: None,
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_result_url(mut self, url: impl Into<String>) -> Self {
        self.result_url = Some(url.into());
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_progress(mut self, percent: u8) -> Self {
        self.progress_percent = Some(percent.min(100));
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// The artifact URL if present and non-blank.
    pub fn usable_result_url(&self) -> Option<&str> {
        self.result_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// Identity of a submitted remote job. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHandle {
    pub stage: Stage,
    pub remote_task_id: String,
    pub submitted_at: Timestamp,
}

impl TaskHandle {
    pub fn new(stage: Stage, remote_task_id: impl Into<String>) -> Self {
        Self {
            stage,
            remote_task_id: remote_task_id.into(),
            submitted_at: chrono::Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
