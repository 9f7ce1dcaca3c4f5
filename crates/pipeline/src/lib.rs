//! Multi-stage generation pipeline.
//!
//! - [`polling`] repeatedly checks one remote job until it is terminal.
//! - [`session`] is the per-request state machine: a single
//!   [`GenerationSession::advance`](session::GenerationSession::advance)
//!   transition function decides what happens after every stage outcome.
//! - [`animation`] finds or creates running/walking clips after rigging.
//! - [`orchestrator`] drives a session against a
//!   [`GenerationService`](rigforge_meshy::GenerationService), publishing
//!   interim artifacts and recording the finished model in the gallery.

pub mod animation;
pub mod observer;
pub mod orchestrator;
pub mod polling;
pub mod session;

pub use animation::{AnimationJobConfig, AnimationResolver};
pub use observer::{NoopObserver, StageObserver};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use polling::{poll_task, PollConfig, PollOutcome, PollProgress};
pub use session::{Directive, GenerationSession, SessionError, SessionEvent, Transition};
