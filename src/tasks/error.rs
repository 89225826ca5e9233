use axum::http::StatusCode;
use axum::{response::IntoResponse, Json};
use log::error;

use crate::core::store::StoreError;
use crate::workspaces::WorkspaceError;

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("{0}")]
    Validation(&'static str),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for TaskError {
    fn into_response(self) -> axum::response::Response {
        match self {
            Self::Validation(msg) => {
                (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": msg }))).into_response()
            }
            Self::Workspace(e) => e.into_response(),
            Self::Store(e) => {
                error!("Task store failure: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
