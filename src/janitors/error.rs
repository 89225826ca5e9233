use axum::http::StatusCode;
use axum::{response::IntoResponse, Json};
use log::error;

use crate::core::store::StoreError;
use crate::security::WebhookError;
use crate::workspaces::WorkspaceError;

#[derive(Debug, thiserror::Error)]
pub enum JanitorError {
    #[error("Invalid janitor type: {0}")]
    InvalidType(String),
    #[error("{0} janitor is not enabled")]
    NotEnabled(&'static str),
    #[error("{0}")]
    RunInProgress(String),
    #[error("Janitor run not found")]
    RunNotFound,
    #[error("Recommendation not found")]
    RecommendationNotFound,
    #[error("Recommendation is not pending")]
    NotPending,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Webhook(#[from] WebhookError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for JanitorError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            Self::Workspace(e) => return e.into_response(),
            Self::Webhook(e) => return e.into_response(),
            Self::InvalidType(_) | Self::NotEnabled(_) | Self::NotPending | Self::Validation(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            Self::RunInProgress(msg) => (StatusCode::CONFLICT, msg),
            Self::RunNotFound | Self::RecommendationNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            Self::Store(e) => {
                error!("Janitor store failure: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
