//! Fixed-cadence polling of a single remote job.
//!
//! [`poll_task`] checks a job's status on a fixed interval until it reaches
//! a terminal state or the attempt budget runs out. There is no
//! cancellation: a caller that no longer cares simply drops the outcome.

use std::time::Duration;

use rigforge_core::stage::{TaskHandle, TaskState, TaskStatus};
use rigforge_meshy::GenerationService;

use crate::observer::StageObserver;

/// Tunable parameters for one polling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay before the first check. A job submitted a moment ago cannot
    /// be done yet.
    pub initial_delay: Duration,
    /// Delay between consecutive checks.
    pub interval: Duration,
    /// Maximum number of status checks before giving up.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            interval: Duration::from_secs(5),
            max_attempts: 120,
        }
    }
}

/// Terminal result of a polling run.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The job succeeded and carries a usable artifact URL.
    Succeeded { result_url: String, status: TaskStatus },
    /// The service reported `Failed`.
    Failed { message: Option<String> },
    /// The service reported `Canceled`.
    Canceled { message: Option<String> },
    /// The attempt budget ran out before a terminal state was seen.
    TimedOut { attempts: u32 },
}

impl PollOutcome {
    /// Short reason suitable for a user-facing failure message.
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            PollOutcome::Succeeded { .. } => None,
            PollOutcome::Failed { message } => Some(
                message
                    .clone()
                    .unwrap_or_else(|| "the job failed".to_string()),
            ),
            PollOutcome::Canceled { message } => Some(
                message
                    .clone()
                    .unwrap_or_else(|| "the job was canceled".to_string()),
            ),
            PollOutcome::TimedOut { attempts } => {
                Some(format!("no result after {attempts} status checks"))
            }
        }
    }
}

/// Reported after every status check.
#[derive(Debug, Clone, PartialEq)]
pub struct PollProgress {
    /// 1-based number of the check just made.
    pub attempt: u32,
    pub max_attempts: u32,
    /// Advisory only; never gates completion.
    pub estimated_remaining_secs: u64,
    /// `None` when the check failed in transport.
    pub status: Option<TaskStatus>,
}

/// `max(0, expected - attempts * interval)` in whole seconds.
pub fn estimate_remaining_secs(expected_secs: u64, attempts: u32, interval: Duration) -> u64 {
    expected_secs.saturating_sub(u64::from(attempts).saturating_mul(interval.as_secs()))
}

/// Poll `handle` until it is terminal or `config.max_attempts` checks
/// have been made.
///
/// - A `Succeeded` status without an artifact URL is not terminal.
/// - Unrecognised status strings are not terminal.
/// - A transport error on one check is logged and polling continues; the
///   check still counts as one attempt.
pub async fn poll_task<S>(
    service: &S,
    handle: &TaskHandle,
    config: &PollConfig,
    observer: &dyn StageObserver,
) -> PollOutcome
where
    S: GenerationService + ?Sized,
{
    let expected = handle.stage.expected_duration_secs();

    tokio::time::sleep(config.initial_delay).await;

    for attempt in 1..=config.max_attempts {
        if attempt > 1 {
            tokio::time::sleep(config.interval).await;
        }

        let checked = service.check_status(handle).await;
        let estimated_remaining_secs = estimate_remaining_secs(expected, attempt, config.interval);

        let status = match checked {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(
                    stage = %handle.stage,
                    task_id = %handle.remote_task_id,
                    attempt,
                    transient = e.is_transient(),
                    error = %e,
                    "Status check failed, will retry on next tick",
                );
                observer.progress(
                    handle,
                    &PollProgress {
                        attempt,
                        max_attempts: config.max_attempts,
                        estimated_remaining_secs,
                        status: None,
                    },
                );
                continue;
            }
        };

        observer.progress(
            handle,
            &PollProgress {
                attempt,
                max_attempts: config.max_attempts,
                estimated_remaining_secs,
                status: Some(status.clone()),
            },
        );

        match &status.state {
            TaskState::Succeeded => {
                if let Some(url) = status.usable_result_url() {
                    tracing::info!(
                        stage = %handle.stage,
                        task_id = %handle.remote_task_id,
                        attempt,
                        "Stage succeeded",
                    );
                    return PollOutcome::Succeeded {
                        result_url: url.to_string(),
                        status,
                    };
                }
                tracing::debug!(
                    stage = %handle.stage,
                    task_id = %handle.remote_task_id,
                    attempt,
                    "Success reported without artifact URL, still polling",
                );
            }
            TaskState::Failed => {
                return PollOutcome::Failed {
                    message: status.error_message,
                };
            }
            TaskState::Canceled => {
                return PollOutcome::Canceled {
                    message: status.error_message,
                };
            }
            TaskState::Unknown(raw) => {
                tracing::debug!(
                    stage = %handle.stage,
                    task_id = %handle.remote_task_id,
                    status = %raw,
                    "Unrecognised task status, still polling",
                );
            }
            TaskState::Pending | TaskState::InProgress => {}
        }
    }

    tracing::warn!(
        stage = %handle.stage,
        task_id = %handle.remote_task_id,
        attempts = config.max_attempts,
        "Polling budget exhausted",
    );
    PollOutcome::TimedOut {
        attempts: config.max_attempts,
    }
}
