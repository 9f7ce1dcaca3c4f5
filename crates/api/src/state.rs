use std::sync::Arc;

use rigforge_core::gallery::GalleryStore;
use rigforge_events::EventBus;
use rigforge_pipeline::Orchestrator;

use crate::config::ServerConfig;
use crate::tracker::SessionTracker;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration, initialized once at startup.
    pub config: Arc<ServerConfig>,
    /// Runs generation sessions against the remote service.
    pub orchestrator: Arc<Orchestrator>,
    /// Latest known state of every session started by this process.
    pub sessions: Arc<SessionTracker>,
    /// Finished generations, newest first.
    pub gallery: Arc<dyn GalleryStore>,
    /// HTTP client used by the asset proxy.
    pub proxy_client: reqwest::Client,
    /// Event bus carrying session progress.
    pub event_bus: Arc<EventBus>,
}
