//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the central publish/subscribe hub for
//! [`GenerationEvent`]s. It is designed to be shared via `Arc<EventBus>`
//! across the application.

use chrono::{DateTime, Utc};
use rigforge_core::artifact::AnimationUrls;
use rigforge_core::stage::{SessionState, Stage};
use rigforge_core::types::EntityId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// GenerationEvent
// ---------------------------------------------------------------------------

/// Something that happened to a generation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationEvent {
    pub session_id: EntityId,
    pub kind: GenerationEventKind,
    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl GenerationEvent {
    pub fn new(session_id: EntityId, kind: GenerationEventKind) -> Self {
        Self {
            session_id,
            kind,
            timestamp: Utc::now(),
        }
    }
}

/// Event payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEventKind {
    /// The session moved to a new lifecycle state.
    StateChanged { state: SessionState },

    /// A remote job was accepted by the service.
    StageSubmitted { stage: Stage, task_id: String },

    /// One status check completed (or failed in transport).
    StageProgress {
        stage: Stage,
        task_id: String,
        attempt: u32,
        max_attempts: u32,
        progress_percent: Option<u8>,
        estimated_remaining_secs: u64,
    },

    /// A stage produced a viewable model. The viewer should render it
    /// while later stages continue.
    InterimArtifact { stage: Stage, model_url: String },

    /// A stage could not complete; the session may continue degraded.
    StageFailed { stage: Stage, reason: String },

    /// Terminal: a final model is available.
    Completed {
        model_url: String,
        animation_urls: AnimationUrls,
        degraded: bool,
        message: String,
    },

    /// Terminal: nothing could be produced.
    Failed { message: String },
}

impl GenerationEventKind {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GenerationEventKind::Completed { .. } | GenerationEventKind::Failed { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`GenerationEvent`].
pub struct EventBus {
    sender: broadcast::Sender<GenerationEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: GenerationEvent) {
        // A send error only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Shorthand for publishing `kind` for `session_id`.
    pub fn emit(&self, session_id: EntityId, kind: GenerationEventKind) {
        self.publish(GenerationEvent::new(session_id, kind));
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<GenerationEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
