//! Shared test fixtures for pipeline integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use rigforge_core::generation::{GenerationParams, PoseMode};
use rigforge_core::stage::{TaskHandle, TaskState, TaskStatus};
use rigforge_core::submission::StageInput;
use rigforge_meshy::{GenerationService, MeshyApiError};
use serde_json::Value;
use tokio::time::Instant;

/// One scripted answer to a status check.
#[derive(Debug, Clone)]
pub enum Step {
    Status(TaskStatus),
    TransportError,
}

pub fn in_progress() -> Step {
    Step::Status(TaskStatus::new(TaskState::InProgress).with_progress(40))
}

pub fn succeeded(url: &str) -> Step {
    Step::Status(TaskStatus::new(TaskState::Succeeded).with_result_url(url))
}

pub fn succeeded_with_payload(url: &str, payload: Value) -> Step {
    Step::Status(
        TaskStatus::new(TaskState::Succeeded)
            .with_result_url(url)
            .with_payload(payload),
    )
}

pub fn succeeded_without_url() -> Step {
    Step::Status(TaskStatus::new(TaskState::Succeeded))
}

pub fn failed(message: &str) -> Step {
    Step::Status(TaskStatus::new(TaskState::Failed).with_error(message))
}

pub fn unknown(raw: &str) -> Step {
    Step::Status(TaskStatus::new(TaskState::Unknown(raw.to_string())))
}

/// Key used to script submissions: the stage name, or
/// `animation:<action_id>` for animation jobs.
pub fn submission_key(input: &StageInput) -> String {
    match input {
        StageInput::MeshGeneration { .. } => "mesh".to_string(),
        StageInput::Retexture { .. } => "retexture".to_string(),
        StageInput::Rigging { .. } => "rigging".to_string(),
        StageInput::Animation { action_id, .. } => format!("animation:{action_id}"),
    }
}

#[derive(Default)]
struct Inner {
    submissions: Vec<StageInput>,
    rejected: HashMap<String, u16>,
    task_ids: HashMap<String, String>,
    scripts: HashMap<String, VecDeque<Step>>,
    checks: Vec<(String, Instant)>,
}

/// In-memory [`GenerationService`] driven by per-task scripts.
///
/// Submissions return the task id registered with [`Self::on_submit`] (or
/// `<key>-task` by default). Status checks pop the next scripted step for
/// the task; the last step repeats forever. Unscripted tasks stay pending.
#[derive(Default)]
pub struct ScriptedService {
    inner: Mutex<Inner>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_submit(&self, key: &str, task_id: &str) -> &Self {
        self.inner
            .lock()
            .unwrap()
            .task_ids
            .insert(key.to_string(), task_id.to_string());
        self
    }

    pub fn reject_submit(&self, key: &str, status: u16) -> &Self {
        self.inner
            .lock()
            .unwrap()
            .rejected
            .insert(key.to_string(), status);
        self
    }

    pub fn script(&self, task_id: &str, steps: Vec<Step>) -> &Self {
        self.inner
            .lock()
            .unwrap()
            .scripts
            .insert(task_id.to_string(), steps.into());
        self
    }

    pub fn submissions(&self) -> Vec<StageInput> {
        self.inner.lock().unwrap().submissions.clone()
    }

    pub fn submission_keys(&self) -> Vec<String> {
        self.submissions().iter().map(submission_key).collect()
    }

    /// Number of status checks made for `task_id`.
    pub fn check_count(&self, task_id: &str) -> usize {
        self.check_times(task_id).len()
    }

    /// When each status check for `task_id` happened.
    pub fn check_times(&self, task_id: &str) -> Vec<Instant> {
        self.inner
            .lock()
            .unwrap()
            .checks
            .iter()
            .filter(|(id, _)| id == task_id)
            .map(|(_, at)| *at)
            .collect()
    }
}

#[async_trait::async_trait]
impl GenerationService for ScriptedService {
    async fn submit(&self, input: &StageInput) -> Result<TaskHandle, MeshyApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.submissions.push(input.clone());

        let key = submission_key(input);
        if let Some(status) = inner.rejected.get(&key) {
            return Err(MeshyApiError::ApiError {
                status: *status,
                body: format!("{key} rejected"),
            });
        }

        let task_id = inner
            .task_ids
            .get(&key)
            .cloned()
            .unwrap_or_else(|| format!("{key}-task"));
        Ok(TaskHandle::new(input.stage(), task_id))
    }

    async fn check_status(&self, handle: &TaskHandle) -> Result<TaskStatus, MeshyApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .checks
            .push((handle.remote_task_id.clone(), Instant::now()));

        let step = match inner.scripts.get_mut(&handle.remote_task_id) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        match step {
            Some(Step::Status(status)) => Ok(status),
            Some(Step::TransportError) => Err(MeshyApiError::ApiError {
                status: 503,
                body: "service unavailable".to_string(),
            }),
            None => Ok(TaskStatus::new(TaskState::Pending)),
        }
    }
}

pub fn params(prompt: &str) -> GenerationParams {
    GenerationParams {
        prompt: prompt.to_string(),
        pose_mode: PoseMode::TPose,
        model_version: "latest".to_string(),
    }
}
