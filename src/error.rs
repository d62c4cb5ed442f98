//! Failure taxonomy at the request handler boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Request is missing required content; nothing was rendered or uploaded.
    #[error("{0}")]
    Validation(String),

    /// Request body exceeded the configured cap.
    #[error("{0}")]
    TooLarge(String),

    #[error("Failed to render PDF: {0:#}")]
    Render(anyhow::Error),

    #[error("Failed to upload PDF: {0:#}")]
    Upload(anyhow::Error),

    #[error("Failed to merge PDF parts: {0}")]
    Merge(String),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServiceError::Render(_) | ServiceError::Upload(_) | ServiceError::Merge(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %message, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %message, "Request rejected");
        }

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
