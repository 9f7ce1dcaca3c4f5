//! Drives a [`GenerationSession`] through the remote chain.
//!
//! The orchestrator owns all I/O: it performs each [`Directive`] returned
//! by the session (submit, poll, resolve animations), feeds the result
//! back in as the next [`SessionEvent`], and publishes progress on the
//! [`EventBus`]. Stages run strictly one after another; the only
//! concurrency is inside [`AnimationResolver`].

use std::sync::Arc;

use rigforge_core::gallery::{
    record_gallery_entry, GalleryEntry, GalleryStore, DEFAULT_GALLERY_CAPACITY,
};
use rigforge_core::generation::{GenerationParams, DEFAULT_RIG_HEIGHT_METERS};
use rigforge_core::stage::TaskHandle;
use rigforge_events::{EventBus, GenerationEventKind};
use rigforge_meshy::GenerationService;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::animation::{AnimationJobConfig, AnimationResolver};
use crate::observer::{BusObserver, StageObserver};
use crate::polling::{poll_task, PollConfig, PollOutcome};
use crate::session::{Directive, GenerationSession, SessionError, SessionEvent};

/// Tunables shared by every session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrchestratorConfig {
    pub poll: PollConfig,
    pub rig_height_meters: f64,
    pub animation: AnimationJobConfig,
    pub gallery_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll: PollConfig::default(),
            rig_height_meters: DEFAULT_RIG_HEIGHT_METERS,
            animation: AnimationJobConfig::default(),
            gallery_capacity: DEFAULT_GALLERY_CAPACITY,
        }
    }
}

pub struct Orchestrator {
    service: Arc<dyn GenerationService>,
    gallery: Arc<dyn GalleryStore>,
    bus: Arc<EventBus>,
    resolver: AnimationResolver,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        service: Arc<dyn GenerationService>,
        gallery: Arc<dyn GalleryStore>,
        bus: Arc<EventBus>,
        config: OrchestratorConfig,
    ) -> Self {
        let resolver = AnimationResolver::new(Arc::clone(&service), config.animation);
        Self {
            service,
            gallery,
            bus,
            resolver,
            config,
        }
    }

    /// A fresh idle session using this orchestrator's rig height.
    pub fn new_session(&self, params: GenerationParams) -> GenerationSession {
        GenerationSession::new(params, self.config.rig_height_meters)
    }

    /// Run `session` on a background task, logging any transition error.
    pub fn spawn(
        self: &Arc<Self>,
        session: GenerationSession,
        abandon: CancellationToken,
    ) -> JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            let session_id = session.id;
            if let Err(e) = orchestrator.run(session, abandon).await {
                tracing::error!(%session_id, error = %e, "Generation session stopped");
            }
        })
    }

    /// Run `session` from its current state until it is terminal or
    /// abandoned, and return it.
    ///
    /// `abandon` is only consulted before a new job would be started. A
    /// poll that is already running is allowed to finish, and its outcome
    /// is then dropped.
    pub async fn run(
        &self,
        mut session: GenerationSession,
        abandon: CancellationToken,
    ) -> Result<GenerationSession, SessionError> {
        let observer = BusObserver::new(Arc::clone(&self.bus), session.id);
        let mut pending: Option<TaskHandle> = None;
        let mut event = SessionEvent::Start;

        tracing::info!(session_id = %session.id, prompt = %session.params.prompt, "Generation started");

        loop {
            let previous = session.state;
            let transition = session.advance(event)?;

            if let Some((stage, model_url)) = transition.interim_artifact {
                self.bus.emit(
                    session.id,
                    GenerationEventKind::InterimArtifact { stage, model_url },
                );
            }
            if session.state != previous {
                self.bus.emit(
                    session.id,
                    GenerationEventKind::StateChanged {
                        state: session.state,
                    },
                );
            }

            event = match transition.directive {
                Directive::Submit(input) => {
                    if abandon.is_cancelled() {
                        tracing::info!(session_id = %session.id, "Session abandoned before submission");
                        return Ok(session);
                    }

                    let stage = input.stage();
                    match self.service.submit(&input).await {
                        Ok(handle) => {
                            tracing::info!(
                                session_id = %session.id,
                                %stage,
                                task_id = %handle.remote_task_id,
                                "Stage submitted",
                            );
                            observer.submitted(&handle);
                            let task_id = handle.remote_task_id.clone();
                            pending = Some(handle);
                            SessionEvent::Submitted { stage, task_id }
                        }
                        Err(e) => {
                            tracing::warn!(
                                session_id = %session.id,
                                %stage,
                                error = %e,
                                "Stage submission rejected",
                            );
                            let message = e.to_string();
                            self.bus.emit(
                                session.id,
                                GenerationEventKind::StageFailed {
                                    stage,
                                    reason: message.clone(),
                                },
                            );
                            SessionEvent::SubmissionFailed { stage, message }
                        }
                    }
                }

                Directive::Poll(stage) => {
                    let handle = pending
                        .take()
                        .filter(|h| h.stage == stage)
                        .ok_or(SessionError::MissingTask(stage))?;

                    match poll_task(self.service.as_ref(), &handle, &self.config.poll, &observer)
                        .await
                    {
                        PollOutcome::Succeeded { result_url, status } => {
                            SessionEvent::StageSucceeded {
                                stage,
                                artifact_url: result_url,
                                payload: status.payload,
                            }
                        }
                        outcome => {
                            let reason = outcome.failure_reason().unwrap_or_default();
                            tracing::warn!(
                                session_id = %session.id,
                                %stage,
                                task_id = %handle.remote_task_id,
                                %reason,
                                "Stage did not complete",
                            );
                            self.bus.emit(
                                session.id,
                                GenerationEventKind::StageFailed {
                                    stage,
                                    reason: reason.clone(),
                                },
                            );
                            SessionEvent::StageFailed { stage, reason }
                        }
                    }
                }

                Directive::ResolveAnimations {
                    rig_task_id,
                    payload,
                } => {
                    if abandon.is_cancelled() {
                        tracing::info!(session_id = %session.id, "Session abandoned before animation");
                        return Ok(session);
                    }
                    let urls = self.resolver.resolve(&rig_task_id, &payload, &observer).await;
                    SessionEvent::AnimationsResolved(urls)
                }

                Directive::Finish => {
                    if abandon.is_cancelled() {
                        tracing::info!(session_id = %session.id, "Session abandoned, result discarded");
                        return Ok(session);
                    }
                    self.finish(&session).await;
                    return Ok(session);
                }

                Directive::Abort => {
                    let message = session.status_message();
                    tracing::warn!(session_id = %session.id, %message, "Generation failed");
                    self.bus
                        .emit(session.id, GenerationEventKind::Failed { message });
                    return Ok(session);
                }
            };
        }
    }

    /// Publish the final result and record it in the gallery.
    async fn finish(&self, session: &GenerationSession) {
        let Some(model_url) = session.final_model_url.clone() else {
            return;
        };
        let message = session.status_message();

        tracing::info!(
            session_id = %session.id,
            %model_url,
            degraded = session.is_degraded(),
            "Generation completed",
        );
        self.bus.emit(
            session.id,
            GenerationEventKind::Completed {
                model_url: model_url.clone(),
                animation_urls: session.animation_urls.clone(),
                degraded: session.is_degraded(),
                message,
            },
        );

        let entry = GalleryEntry::new(
            session.params.prompt.clone(),
            model_url,
            session.animation_urls.clone(),
        );
        match record_gallery_entry(self.gallery.as_ref(), entry, self.config.gallery_capacity).await
        {
            Ok(removed) => {
                tracing::debug!(session_id = %session.id, removed, "Gallery entry recorded");
            }
            Err(e) => {
                tracing::error!(session_id = %session.id, error = %e, "Failed to record gallery entry");
            }
        }
    }
}
