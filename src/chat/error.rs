use axum::http::StatusCode;
use axum::{response::IntoResponse, Json};
use log::error;

use crate::core::store::StoreError;
use crate::security::WebhookError;

pub const CREATE_FAILED: &str = "Failed to create chat message";

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Message is required")]
    MessageRequired,
    #[error("Task ID is required")]
    TaskIdRequired,
    #[error("Task not found")]
    TaskNotFound,
    #[error("User not found")]
    UserNotFound,
    #[error("Access denied")]
    AccessDenied,
    #[error("{0}")]
    Validation(String),
    /// Anything that goes wrong while creating a user message after the
    /// preconditions, reported with one fixed message.
    #[error("{CREATE_FAILED}: {0}")]
    CreateFailed(String),
    #[error(transparent)]
    Webhook(#[from] WebhookError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for ChatError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            Self::MessageRequired | Self::TaskIdRequired => (StatusCode::BAD_REQUEST, self.to_string()),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::TaskNotFound | Self::UserNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            Self::AccessDenied => (StatusCode::FORBIDDEN, self.to_string()),
            Self::Webhook(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::CreateFailed(detail) => {
                error!("Chat message creation failed: {detail}");
                (StatusCode::INTERNAL_SERVER_ERROR, CREATE_FAILED.to_string())
            }
            Self::Store(e) => {
                error!("Chat store failure: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
