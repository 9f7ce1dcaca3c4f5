//! Generation event bus.
//!
//! - [`EventBus`] is the in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`GenerationEvent`] is the envelope for everything a session reports
//!   while it runs: submissions, poll progress, interim artifacts the viewer
//!   can render, and terminal outcomes.

pub mod bus;

pub use bus::{EventBus, GenerationEvent, GenerationEventKind};
