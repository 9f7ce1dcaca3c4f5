//! The seam between the pipeline and the remote generation service.

use rigforge_core::stage::{TaskHandle, TaskStatus};
use rigforge_core::submission::StageInput;

use crate::api::{MeshyApi, MeshyApiError};

/// Submission and status operations the pipeline needs from the remote
/// service.
#[async_trait::async_trait]
pub trait GenerationService: Send + Sync {
    /// Start a job for the stage described by `input`.
    async fn submit(&self, input: &StageInput) -> Result<TaskHandle, MeshyApiError>;

    /// Check the current status of a submitted job.
    async fn check_status(&self, handle: &TaskHandle) -> Result<TaskStatus, MeshyApiError>;
}

#[async_trait::async_trait]
impl GenerationService for MeshyApi {
    async fn submit(&self, input: &StageInput) -> Result<TaskHandle, MeshyApiError> {
        self.submit_stage(input).await
    }

    async fn check_status(&self, handle: &TaskHandle) -> Result<TaskStatus, MeshyApiError> {
        self.get_task_any(handle).await
    }
}
