pub mod error;
pub mod handlers;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;

pub use error::TaskError;
pub use types::CreateTaskRequest;

pub fn configure_task_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(ApiUrls::TASKS, post(handlers::handle_task_create))
        .route(ApiUrls::WORKSPACE_TASKS, get(handlers::handle_task_list))
}

#[cfg(test)]
mod tests {
    use crate::core::shared::enums::WorkspaceRole;
    use crate::core::shared::test_utils::TestApp;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_and_list_tasks() {
        let app = TestApp::new();
        let owner = app.user("owner").await;
        app.workspace(&owner, "acme").await;
        let token = app.token(owner.id);

        let (status, body) = app
            .post(
                "/api/tasks",
                Some(&token),
                json!({"workspaceSlug": "acme", "title": "  Ship it ", "priority": "high"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["title"], "Ship it");
        assert_eq!(body["priority"], "HIGH");
        assert_eq!(body["status"], "TODO");
        assert_eq!(body["sourceType"], "USER");

        let (status, body) = app.get("/api/workspaces/acme/tasks", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_viewer_cannot_create_tasks() {
        let app = TestApp::new();
        let owner = app.user("owner").await;
        let viewer = app.user("viewer").await;
        let workspace = app.workspace(&owner, "acme").await;
        app.member(&workspace, &viewer, WorkspaceRole::Viewer).await;

        let (status, body) = app
            .post(
                "/api/tasks",
                Some(&app.token(viewer.id)),
                json!({"workspaceSlug": "acme", "title": "Nope"}),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Access denied");

        let (status, _) = app
            .get("/api/workspaces/acme/tasks", Some(&app.token(viewer.id)))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_task_validation() {
        let app = TestApp::new();
        let owner = app.user("owner").await;
        let stranger = app.user("stranger").await;
        app.workspace(&owner, "acme").await;
        let token = app.token(owner.id);

        let (status, body) = app
            .post("/api/tasks", Some(&token), json!({"workspaceSlug": "acme", "title": " "}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Title is required");

        let (status, _) = app
            .post(
                "/api/tasks",
                Some(&token),
                json!({"workspaceSlug": "acme", "title": "t", "priority": "urgent"}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .post(
                "/api/tasks",
                Some(&token),
                json!({"workspaceSlug": "acme", "title": "t", "assigneeId": stranger.id}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Assignee is not a member of this workspace");
    }
}
