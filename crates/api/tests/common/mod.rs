//! Shared fixtures for API integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use rigforge_core::gallery::{GalleryStore, MemoryGalleryStore};
use rigforge_core::stage::{TaskHandle, TaskState, TaskStatus};
use rigforge_core::submission::StageInput;
use rigforge_events::EventBus;
use rigforge_meshy::{GenerationService, MeshyApiError, MeshyConfig};
use rigforge_pipeline::{Orchestrator, OrchestratorConfig, PollConfig};
use tower::ServiceExt;

use rigforge_api::config::{ProxyConfig, ServerConfig};
use rigforge_api::router::build_app_router;
use rigforge_api::state::AppState;
use rigforge_api::tracker::SessionTracker;

/// Generation service that accepts every job and reports either
/// `Pending` forever or immediate success.
pub struct FakeService {
    completes: bool,
    next_id: AtomicU32,
}

impl FakeService {
    /// Jobs never leave `Pending`.
    pub fn stalled() -> Self {
        Self {
            completes: false,
            next_id: AtomicU32::new(1),
        }
    }

    /// Every job succeeds on its first status check.
    pub fn instant() -> Self {
        Self {
            completes: true,
            next_id: AtomicU32::new(1),
        }
    }
}

#[async_trait::async_trait]
impl GenerationService for FakeService {
    async fn submit(&self, input: &StageInput) -> Result<TaskHandle, MeshyApiError> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(TaskHandle::new(input.stage(), format!("task-{n}")))
    }

    async fn check_status(&self, handle: &TaskHandle) -> Result<TaskStatus, MeshyApiError> {
        if self.completes {
            Ok(TaskStatus::new(TaskState::Succeeded).with_result_url(format!(
                "https://assets.example.com/{}.glb",
                handle.remote_task_id
            )))
        } else {
            Ok(TaskStatus::new(TaskState::Pending))
        }
    }
}

/// Build a test `ServerConfig` with safe defaults and near-instant polling.
pub fn test_config() -> ServerConfig {
    let poll = PollConfig {
        initial_delay: Duration::from_millis(1),
        interval: Duration::from_millis(1),
        max_attempts: 5,
    };
    let mut pipeline = OrchestratorConfig {
        poll,
        ..OrchestratorConfig::default()
    };
    pipeline.animation.poll = poll;

    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        session_retention_secs: 3600,
        meshy: MeshyConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: None,
        },
        pipeline,
        proxy: ProxyConfig::default(),
        database_url: None,
    }
}

/// Everything a test may want to inspect besides the router.
pub struct TestApp {
    pub router: Router,
    pub gallery: Arc<MemoryGalleryStore>,
    pub sessions: Arc<SessionTracker>,
}

/// Build the full application router with the production middleware
/// stack, an in-memory gallery, and `service` as the generation backend.
pub fn build_test_app_with(config: ServerConfig, service: FakeService) -> TestApp {
    let gallery = Arc::new(MemoryGalleryStore::new());
    let event_bus = Arc::new(EventBus::default());
    let sessions = Arc::new(SessionTracker::new(config.session_retention()));
    tokio::spawn(Arc::clone(&sessions).run(event_bus.subscribe()));

    let gallery_store: Arc<dyn GalleryStore> = gallery.clone();
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(service),
        Arc::clone(&gallery_store),
        Arc::clone(&event_bus),
        config.pipeline,
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        orchestrator,
        sessions: Arc::clone(&sessions),
        gallery: gallery_store,
        proxy_client: config.proxy.client_builder().no_proxy().build().unwrap(),
        event_bus,
    };

    TestApp {
        router: build_app_router(state, &config),
        gallery,
        sessions,
    }
}

/// Router with default test config and a stalled generation service.
pub fn build_test_app() -> Router {
    build_test_app_with(test_config(), FakeService::stalled()).router
}

/// Send a GET request to the given URI.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, Body::empty()).await
}

/// Send a DELETE request to the given URI.
pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Body::empty()).await
}

/// Send a POST request with a JSON body.
pub async fn post_json(app: Router, uri: &str, json: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

async fn send(app: Router, method: Method, uri: &str, body: Body) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(body)
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Collect a response body as raw bytes.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}
