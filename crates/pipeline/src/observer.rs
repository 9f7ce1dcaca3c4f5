//! Hooks for reporting job submissions and poll progress.

use std::sync::Arc;

use rigforge_core::stage::TaskHandle;
use rigforge_core::types::EntityId;
use rigforge_events::{EventBus, GenerationEventKind};

use crate::polling::PollProgress;

/// Receives submission and progress notifications from running jobs.
pub trait StageObserver: Send + Sync {
    fn submitted(&self, _handle: &TaskHandle) {}

    fn progress(&self, _handle: &TaskHandle, _progress: &PollProgress) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl StageObserver for NoopObserver {}

/// Observer that republishes notifications on the event bus for one session.
pub struct BusObserver {
    bus: Arc<EventBus>,
    session_id: EntityId,
}

impl BusObserver {
    pub fn new(bus: Arc<EventBus>, session_id: EntityId) -> Self {
        Self { bus, session_id }
    }
}

impl StageObserver for BusObserver {
    fn submitted(&self, handle: &TaskHandle) {
        self.bus.emit(
            self.session_id,
            GenerationEventKind::StageSubmitted {
                stage: handle.stage,
                task_id: handle.remote_task_id.clone(),
            },
        );
    }

    fn progress(&self, handle: &TaskHandle, progress: &PollProgress) {
        self.bus.emit(
            self.session_id,
            GenerationEventKind::StageProgress {
                stage: handle.stage,
                task_id: handle.remote_task_id.clone(),
                attempt: progress.attempt,
                max_attempts: progress.max_attempts,
                progress_percent: progress.status.as_ref().and_then(|s| s.progress_percent),
                estimated_remaining_secs: progress.estimated_remaining_secs,
            },
        );
    }
}
