//! In-process view of running and finished generation sessions.
//!
//! [`SessionTracker`] follows the event bus and keeps one
//! [`SessionSnapshot`] per session so clients can poll progress over
//! HTTP. Abandoning a session forgets it and signals the orchestrator to
//! stop scheduling new jobs; events that arrive afterwards for the
//! forgotten id are ignored. Finished sessions are evicted once they have
//! been done or failed for longer than the retention window.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rigforge_core::artifact::AnimationUrls;
use rigforge_core::stage::{SessionState, Stage};
use rigforge_core::types::{EntityId, Timestamp};
use rigforge_events::{GenerationEvent, GenerationEventKind};
use rigforge_pipeline::GenerationSession;
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Progress of the job currently being polled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageProgressView {
    pub stage: Stage,
    pub task_id: String,
    pub attempt: u32,
    pub max_attempts: u32,
    pub progress_percent: Option<u8>,
    pub estimated_remaining_secs: u64,
}

/// What a client sees when it asks about a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub id: EntityId,
    pub prompt: String,
    pub state: SessionState,
    /// Most recent viewable model, upgraded stage by stage.
    pub model_url: Option<String>,
    pub model_stage: Option<Stage>,
    pub progress: Option<StageProgressView>,
    pub animation_urls: AnimationUrls,
    pub degraded: bool,
    /// Terminal message, or the most recent stage failure.
    pub message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SessionSnapshot {
    fn new(session: &GenerationSession) -> Self {
        Self {
            id: session.id,
            prompt: session.params.prompt.clone(),
            state: session.state,
            model_url: None,
            model_stage: None,
            progress: None,
            animation_urls: AnimationUrls::default(),
            degraded: false,
            message: None,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }

    fn apply(&mut self, event: &GenerationEvent) {
        self.updated_at = event.timestamp;
        match &event.kind {
            GenerationEventKind::StateChanged { state } => {
                self.state = *state;
                self.progress = None;
            }
            GenerationEventKind::StageSubmitted { .. } => {}
            GenerationEventKind::StageProgress {
                stage,
                task_id,
                attempt,
                max_attempts,
                progress_percent,
                estimated_remaining_secs,
            } => {
                self.progress = Some(StageProgressView {
                    stage: *stage,
                    task_id: task_id.clone(),
                    attempt: *attempt,
                    max_attempts: *max_attempts,
                    progress_percent: *progress_percent,
                    estimated_remaining_secs: *estimated_remaining_secs,
                });
            }
            GenerationEventKind::InterimArtifact { stage, model_url } => {
                self.model_url = Some(model_url.clone());
                self.model_stage = Some(*stage);
            }
            GenerationEventKind::StageFailed { stage, reason } => {
                self.degraded = true;
                self.message = Some(format!("{stage} failed: {reason}"));
            }
            GenerationEventKind::Completed {
                model_url,
                animation_urls,
                degraded,
                message,
            } => {
                self.state = SessionState::Done;
                self.model_url = Some(model_url.clone());
                self.animation_urls = animation_urls.clone();
                self.degraded = *degraded;
                self.message = Some(message.clone());
                self.progress = None;
            }
            GenerationEventKind::Failed { message } => {
                self.state = SessionState::Failed;
                self.message = Some(message.clone());
                self.progress = None;
            }
        }
    }
}

/// Finished sessions stay queryable this long unless configured otherwise.
pub const DEFAULT_SESSION_RETENTION: Duration = Duration::from_secs(3600);

/// Shortest period between eviction sweeps in [`SessionTracker::run`].
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

struct TrackedSession {
    snapshot: SessionSnapshot,
    abandon: CancellationToken,
    /// Set when the snapshot first reaches `Done` or `Failed`.
    finished_at: Option<Instant>,
}

/// Session snapshots keyed by id.
pub struct SessionTracker {
    sessions: RwLock<HashMap<EntityId, TrackedSession>>,
    retention: Duration,
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_RETENTION)
    }
}

impl SessionTracker {
    pub fn new(retention: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            retention,
        }
    }

    /// Start tracking `session`. The returned token is cancelled when the
    /// session is abandoned.
    pub async fn register(&self, session: &GenerationSession) -> CancellationToken {
        self.evict_finished().await;

        let abandon = CancellationToken::new();
        self.sessions.write().await.insert(
            session.id,
            TrackedSession {
                snapshot: SessionSnapshot::new(session),
                abandon: abandon.clone(),
                finished_at: None,
            },
        );
        abandon
    }

    pub async fn get(&self, id: EntityId) -> Option<SessionSnapshot> {
        self.sessions
            .read()
            .await
            .get(&id)
            .map(|tracked| tracked.snapshot.clone())
    }

    /// Forget a session and stop it from starting new jobs.
    ///
    /// Returns `false` if the session is unknown.
    pub async fn abandon(&self, id: EntityId) -> bool {
        match self.sessions.write().await.remove(&id) {
            Some(tracked) => {
                tracked.abandon.cancel();
                tracing::info!(session_id = %id, "Session abandoned");
                true
            }
            None => false,
        }
    }

    /// Abandon every tracked session. Used at shutdown.
    pub async fn abandon_all(&self) {
        let mut sessions = self.sessions.write().await;
        for tracked in sessions.values() {
            tracked.abandon.cancel();
        }
        sessions.clear();
    }

    /// Fold one event into its session's snapshot. Events for unknown or
    /// abandoned sessions are ignored.
    pub async fn apply(&self, event: &GenerationEvent) {
        if let Some(tracked) = self.sessions.write().await.get_mut(&event.session_id) {
            tracked.snapshot.apply(event);
            if tracked.finished_at.is_none() && tracked.snapshot.state.is_terminal() {
                tracked.finished_at = Some(Instant::now());
            }
        }
    }

    /// Drop sessions that finished more than the retention window ago.
    /// Running sessions are never evicted.
    ///
    /// Returns the number of sessions removed.
    pub async fn evict_finished(&self) -> usize {
        let retention = self.retention;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, tracked| {
            tracked
                .finished_at
                .map_or(true, |finished| finished.elapsed() < retention)
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = sessions.len(), "Evicted finished sessions");
        }
        evicted
    }

    /// Follow the event bus until it closes, sweeping out expired
    /// sessions along the way.
    pub async fn run(self: Arc<Self>, mut receiver: broadcast::Receiver<GenerationEvent>) {
        let mut sweep = tokio::time::interval(self.retention.max(MIN_SWEEP_INTERVAL));
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                received = receiver.recv() => match received {
                    Ok(event) => self.apply(&event).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            skipped = n,
                            "Session tracker lagged, some progress updates were dropped"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, session tracker shutting down");
                        break;
                    }
                },
                _ = sweep.tick() => {
                    self.evict_finished().await;
                }
            }
        }
    }
}
