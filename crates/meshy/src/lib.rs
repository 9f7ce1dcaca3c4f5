//! REST client for the remote 3-D generation service.
//!
//! Provides typed task payload decoding, per-stage submission and status
//! endpoints, and the [`GenerationService`] trait through which the
//! pipeline talks to the service.

pub mod api;
pub mod messages;
pub mod service;

pub use api::{MeshyApi, MeshyApiError, MeshyConfig};
pub use service::GenerationService;
