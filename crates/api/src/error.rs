use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rigforge_core::error::CoreError;
use rigforge_core::gallery::GalleryError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `rigforge_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The gallery backend failed.
    #[error(transparent)]
    Gallery(#[from] GalleryError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The request is well-formed but not permitted.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The proxy could not reach the upstream host.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            AppError::Gallery(err) => {
                tracing::error!(error = %err, "Gallery error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "GALLERY_ERROR",
                    "The gallery is unavailable".to_string(),
                )
            }

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            AppError::UpstreamUnavailable(msg) => {
                tracing::warn!(error = %msg, "Upstream unavailable");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "UPSTREAM_UNAVAILABLE",
                    msg.clone(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
