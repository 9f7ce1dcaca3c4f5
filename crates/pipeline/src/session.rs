//! Per-session state machine for the mesh -> texture -> rig -> animate chain.
//!
//! [`GenerationSession::advance`] is the single transition function. It
//! takes one [`SessionEvent`] (a submission result, a polling outcome, or
//! the animation set) and returns a [`Directive`] telling the driver what
//! to do next. It performs no I/O, so a session can be serialized at any
//! point and replayed event-by-event.

use chrono::Utc;
use rigforge_core::artifact::AnimationUrls;
use rigforge_core::generation::GenerationParams;
use rigforge_core::stage::{SessionState, Stage};
use rigforge_core::submission::StageInput;
use rigforge_core::types::{EntityId, Timestamp};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("Event '{event}' is not valid in state {state:?}")]
    InvalidTransition {
        state: SessionState,
        event: &'static str,
    },

    #[error("No remote task recorded for the {0} stage")]
    MissingTask(Stage),
}

// ---------------------------------------------------------------------------
// Events and directives
// ---------------------------------------------------------------------------

/// Input to [`GenerationSession::advance`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The validated request was accepted; begin the chain.
    Start,
    /// The remote service accepted a job for `stage`.
    Submitted { stage: Stage, task_id: String },
    /// The remote service rejected the job for `stage`.
    SubmissionFailed { stage: Stage, message: String },
    /// Polling for `stage` ended with a usable artifact.
    StageSucceeded {
        stage: Stage,
        artifact_url: String,
        /// Raw status payload, kept for animation discovery after rigging.
        #[serde(default)]
        payload: serde_json::Value,
    },
    /// Polling for `stage` ended in failure, cancellation, or timeout.
    StageFailed { stage: Stage, reason: String },
    /// The animation set for the rigged model has been resolved.
    AnimationsResolved(AnimationUrls),
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Start => "start",
            SessionEvent::Submitted { .. } => "submitted",
            SessionEvent::SubmissionFailed { .. } => "submission_failed",
            SessionEvent::StageSucceeded { .. } => "stage_succeeded",
            SessionEvent::StageFailed { .. } => "stage_failed",
            SessionEvent::AnimationsResolved(_) => "animations_resolved",
        }
    }
}

/// What the driver must do after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Submit a job for the described stage.
    Submit(StageInput),
    /// Poll the job most recently submitted for this stage.
    Poll(Stage),
    /// Discover or create animations for the rigged model.
    ResolveAnimations {
        rig_task_id: String,
        payload: serde_json::Value,
    },
    /// Terminal with a final model.
    Finish,
    /// Terminal with nothing to show.
    Abort,
}

/// Result of one call to [`GenerationSession::advance`].
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub directive: Directive,
    /// Set when the transition produced a newly viewable model.
    pub interim_artifact: Option<(Stage, String)>,
}

impl Transition {
    fn new(directive: Directive) -> Self {
        Self {
            directive,
            interim_artifact: None,
        }
    }

    fn with_interim(mut self, stage: Stage, url: &str) -> Self {
        self.interim_artifact = Some((stage, url.to_string()));
        self
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// What a stage produced, recorded as soon as its job is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub task_id: String,
    pub artifact_url: Option<String>,
}

/// A stage that could not complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub reason: String,
}

/// One user-initiated generation request and everything it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSession {
    pub id: EntityId,
    pub params: GenerationParams,
    pub rig_height_meters: f64,
    pub state: SessionState,
    pub stage_results: Vec<StageRecord>,
    #[serde(default)]
    pub animation_urls: AnimationUrls,
    pub final_model_url: Option<String>,
    #[serde(default)]
    pub failures: Vec<StageFailure>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl GenerationSession {
    pub fn new(params: GenerationParams, rig_height_meters: f64) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new_v4(),
            params,
            rig_height_meters,
            state: SessionState::Idle,
            stage_results: Vec::new(),
            animation_urls: AnimationUrls::default(),
            final_model_url: None,
            failures: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply one event and return the next directive.
    ///
    /// On error the session is left unchanged.
    pub fn advance(&mut self, event: SessionEvent) -> Result<Transition, SessionError> {
        let invalid = SessionError::InvalidTransition {
            state: self.state,
            event: event.name(),
        };

        let transition = match (self.state, event) {
            (SessionState::Idle, SessionEvent::Start) => {
                self.state = SessionState::MeshPending;
                Transition::new(Directive::Submit(StageInput::MeshGeneration {
                    prompt: self.params.prompt.clone(),
                    pose_mode: self.params.pose_mode,
                    model_version: self.params.model_version.clone(),
                }))
            }

            (state, SessionEvent::Submitted { stage, task_id })
                if state.active_stage() == Some(stage) =>
            {
                self.stage_results.push(StageRecord {
                    stage,
                    task_id,
                    artifact_url: None,
                });
                Transition::new(Directive::Poll(stage))
            }

            (state, SessionEvent::SubmissionFailed { stage, message })
                if state.active_stage() == Some(stage) =>
            {
                self.stage_ended_without_artifact(stage, message)
            }

            (state, SessionEvent::StageFailed { stage, reason })
                if state.active_stage() == Some(stage) && stage != Stage::Animation =>
            {
                self.stage_ended_without_artifact(stage, reason)
            }

            (
                state,
                SessionEvent::StageSucceeded {
                    stage,
                    artifact_url,
                    payload,
                },
            ) if state.active_stage() == Some(stage) => {
                self.stage_succeeded(stage, artifact_url, payload)?
            }

            (SessionState::AnimationPending, SessionEvent::AnimationsResolved(urls)) => {
                let rig_url = self
                    .artifact_for(Stage::Rigging)
                    .ok_or(SessionError::MissingTask(Stage::Rigging))?
                    .to_string();
                self.animation_urls = urls;
                self.final_model_url = Some(rig_url);
                self.state = SessionState::Done;
                Transition::new(Directive::Finish)
            }

            _ => return Err(invalid),
        };

        self.updated_at = Utc::now();
        Ok(transition)
    }

    fn stage_succeeded(
        &mut self,
        stage: Stage,
        artifact_url: String,
        payload: serde_json::Value,
    ) -> Result<Transition, SessionError> {
        if stage == Stage::Animation {
            return Err(SessionError::InvalidTransition {
                state: self.state,
                event: "stage_succeeded",
            });
        }
        let task_id = self
            .task_id_for(stage)
            .ok_or(SessionError::MissingTask(stage))?
            .to_string();
        if let Some(record) = self.record_mut(stage) {
            record.artifact_url = Some(artifact_url.clone());
        }

        let directive = match stage {
            Stage::MeshGeneration => {
                self.state = SessionState::TexturePending;
                Directive::Submit(StageInput::Retexture {
                    input_task_id: task_id,
                    style_prompt: self.params.prompt.clone(),
                })
            }
            Stage::Retexture => {
                self.state = SessionState::RigPending;
                Directive::Submit(StageInput::Rigging {
                    input_task_id: task_id,
                    height_meters: self.rig_height_meters,
                })
            }
            Stage::Rigging | Stage::Animation => {
                self.state = SessionState::AnimationPending;
                Directive::ResolveAnimations {
                    rig_task_id: task_id,
                    payload,
                }
            }
        };

        Ok(Transition::new(directive).with_interim(stage, &artifact_url))
    }

    /// Failure policy shared by rejected submissions and failed polls.
    fn stage_ended_without_artifact(&mut self, stage: Stage, reason: String) -> Transition {
        self.failures.push(StageFailure { stage, reason });

        match stage {
            Stage::MeshGeneration => {
                self.state = SessionState::Failed;
                Transition::new(Directive::Abort)
            }
            // A polled retexture failure falls back to rigging the raw mesh.
            Stage::Retexture if self.task_id_for(Stage::Retexture).is_some() => {
                match self.task_id_for(Stage::MeshGeneration) {
                    Some(mesh_task_id) => {
                        let input_task_id = mesh_task_id.to_string();
                        self.state = SessionState::RigPending;
                        Transition::new(Directive::Submit(StageInput::Rigging {
                            input_task_id,
                            height_meters: self.rig_height_meters,
                        }))
                    }
                    None => self.finish_with_last_good(),
                }
            }
            _ => self.finish_with_last_good(),
        }
    }

    fn finish_with_last_good(&mut self) -> Transition {
        match self.last_good_artifact() {
            Some((_, url)) => {
                self.final_model_url = Some(url.to_string());
                self.state = SessionState::Done;
                Transition::new(Directive::Finish)
            }
            None => {
                self.state = SessionState::Failed;
                Transition::new(Directive::Abort)
            }
        }
    }

    fn record_mut(&mut self, stage: Stage) -> Option<&mut StageRecord> {
        self.stage_results.iter_mut().rev().find(|r| r.stage == stage)
    }

    /// Remote task id of the most recent job for `stage`.
    pub fn task_id_for(&self, stage: Stage) -> Option<&str> {
        self.stage_results
            .iter()
            .rev()
            .find(|r| r.stage == stage)
            .map(|r| r.task_id.as_str())
    }

    /// Artifact URL produced by `stage`, if it succeeded.
    pub fn artifact_for(&self, stage: Stage) -> Option<&str> {
        self.stage_results
            .iter()
            .rev()
            .find(|r| r.stage == stage)
            .and_then(|r| r.artifact_url.as_deref())
    }

    /// The most advanced stage artifact obtained so far.
    pub fn last_good_artifact(&self) -> Option<(Stage, &str)> {
        Stage::CHAIN
            .iter()
            .rev()
            .find_map(|&stage| self.artifact_for(stage).map(|url| (stage, url)))
    }

    /// Whether the session finished on a fallback path.
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Terminal message for the user: names the failed stage and the last
    /// artifact obtained, if any.
    pub fn status_message(&self) -> String {
        match self.state {
            SessionState::Done if self.failures.is_empty() => {
                let count = [&self.animation_urls.running, &self.animation_urls.walking]
                    .iter()
                    .filter(|u| u.is_some())
                    .count();
                match count {
                    0 => "Rigged model ready (no animations available)".to_string(),
                    1 => "Rigged model ready with 1 animation".to_string(),
                    n => format!("Rigged model ready with {n} animations"),
                }
            }
            SessionState::Done | SessionState::Failed => {
                let failures = self
                    .failures
                    .iter()
                    .map(|f| format!("{} failed: {}", f.stage, f.reason))
                    .collect::<Vec<_>>()
                    .join("; ");
                match self.last_good_artifact() {
                    Some((stage, _)) => format!("{failures}. Showing the {stage} result."),
                    None => format!("{failures}. No model was produced."),
                }
            }
            state => match state.active_stage() {
                Some(stage) => format!("Waiting for {stage}"),
                None => "Not started".to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
