//! REST API client for the generation service HTTP endpoints.
//!
//! Wraps stage submission and task status retrieval using [`reqwest`].
//! Each stage has its own endpoint family; a task id is only known to the
//! family that created it.

use rigforge_core::stage::{Stage, TaskHandle, TaskStatus};
use rigforge_core::submission::StageInput;
use serde_json::json;

use crate::messages::{decode_task_status, SubmitResponse};

/// Default base URL of the hosted service.
pub const DEFAULT_BASE_URL: &str = "https://api.meshy.ai";

/// Connection settings for the generation service.
#[derive(Debug, Clone)]
pub struct MeshyConfig {
    /// Base HTTP URL, e.g. `https://api.meshy.ai`.
    pub base_url: String,
    /// Bearer token. Requests are sent unauthenticated when absent.
    pub api_key: Option<String>,
}

impl MeshyConfig {
    /// Load from `MESHY_BASE_URL` and `MESHY_API_KEY`.
    pub fn from_env() -> Self {
        let base_url = std::env::var("MESHY_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.into())
            .trim_end_matches('/')
            .to_string();
        let api_key = std::env::var("MESHY_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        Self { base_url, api_key }
    }
}

/// HTTP client for the generation service.
pub struct MeshyApi {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

/// Errors from the generation service REST layer.
#[derive(Debug, thiserror::Error)]
pub enum MeshyApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Generation service error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// No endpoint family knows the task id.
    #[error("Task {0} not found on any endpoint")]
    TaskNotFound(String),

    /// The response body did not have the expected shape.
    #[error("Unexpected response payload: {0}")]
    Decode(String),
}

impl MeshyApiError {
    /// `true` for failures that a later retry may not see (network errors
    /// and 5xx responses).
    pub fn is_transient(&self) -> bool {
        match self {
            MeshyApiError::Request(_) => true,
            MeshyApiError::ApiError { status, .. } => *status >= 500,
            MeshyApiError::TaskNotFound(_) | MeshyApiError::Decode(_) => false,
        }
    }
}

/// Path of the endpoint family serving `stage`.
pub fn endpoint_path(stage: Stage) -> &'static str {
    match stage {
        Stage::MeshGeneration => "/openapi/v2/text-to-3d",
        Stage::Retexture => "/openapi/v1/retexture",
        Stage::Rigging => "/openapi/v1/rigging",
        Stage::Animation => "/openapi/v1/animations",
    }
}

/// Order in which endpoint families are tried for a status check: the
/// handle's own family first, then the rest in chain order.
pub fn status_lookup_order(first: Stage) -> Vec<Stage> {
    std::iter::once(first)
        .chain(Stage::CHAIN.into_iter().filter(move |s| *s != first))
        .collect()
}

/// JSON body for a submission.
pub fn submission_body(input: &StageInput) -> serde_json::Value {
    match input {
        StageInput::MeshGeneration {
            prompt,
            pose_mode,
            model_version,
        } => json!({
            "mode": "preview",
            "prompt": prompt,
            "pose_mode": pose_mode.as_str(),
            "ai_model": model_version,
            "should_remesh": true,
        }),
        StageInput::Retexture {
            input_task_id,
            style_prompt,
        } => json!({
            "input_task_id": input_task_id,
            "text_style_prompt": style_prompt,
            "enable_original_uv": true,
        }),
        StageInput::Rigging {
            input_task_id,
            height_meters,
        } => json!({
            "input_task_id": input_task_id,
            "height_meters": height_meters,
        }),
        StageInput::Animation {
            rig_task_id,
            action_id,
        } => json!({
            "rig_task_id": rig_task_id,
            "action_id": action_id,
        }),
    }
}

impl MeshyApi {
    /// Create a new API client.
    pub fn new(config: &MeshyConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: &MeshyConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    /// Submit a job for one stage and return its handle.
    pub async fn submit_stage(&self, input: &StageInput) -> Result<TaskHandle, MeshyApiError> {
        let stage = input.stage();
        let url = format!("{}{}", self.base_url, endpoint_path(stage));

        let response = self
            .authorized(self.client.post(url))
            .json(&submission_body(input))
            .send()
            .await?;

        let submitted: SubmitResponse = Self::parse_response(response).await?;
        if submitted.result.trim().is_empty() {
            return Err(MeshyApiError::Decode(
                "submission returned an empty task id".to_string(),
            ));
        }

        tracing::info!(
            stage = %stage,
            task_id = %submitted.result,
            "Stage submitted to generation service",
        );

        Ok(TaskHandle::new(stage, submitted.result))
    }

    /// Fetch a task from one endpoint family.
    pub async fn get_task(&self, stage: Stage, task_id: &str) -> Result<TaskStatus, MeshyApiError> {
        let url = format!("{}{}/{}", self.base_url, endpoint_path(stage), task_id);

        let response = self.authorized(self.client.get(url)).send().await?;
        let payload: serde_json::Value = Self::parse_response(response).await?;

        decode_task_status(stage, payload).map_err(|e| MeshyApiError::Decode(e.to_string()))
    }

    /// Fetch a task, falling back across endpoint families on 404.
    pub async fn get_task_any(&self, handle: &TaskHandle) -> Result<TaskStatus, MeshyApiError> {
        for stage in status_lookup_order(handle.stage) {
            match self.get_task(stage, &handle.remote_task_id).await {
                Err(MeshyApiError::ApiError { status: 404, .. }) => {
                    tracing::debug!(
                        task_id = %handle.remote_task_id,
                        endpoint = endpoint_path(stage),
                        "Task not found on endpoint, trying next family",
                    );
                }
                other => return other,
            }
        }
        Err(MeshyApiError::TaskNotFound(handle.remote_task_id.clone()))
    }

    // ---- private helpers ----

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`MeshyApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, MeshyApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(MeshyApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, MeshyApiError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| MeshyApiError::Decode(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
