//! Workspaces, membership and the access resolver shared by every
//! workspace-scoped route.

pub mod access;
pub mod error;
pub mod handlers;
pub mod service;
pub mod slug;
pub mod types;

use axum::{
    routing::{get, patch},
    Router,
};
use std::sync::Arc;

use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;

pub use access::{
    derive_permissions, require_access, resolve_workspace_access, resolve_workspace_access_by_id,
    Capability, Permissions, WorkspaceAccess,
};
pub use error::WorkspaceError;
pub use service::WorkspaceService;
pub use slug::{validate_workspace_slug, SlugError, SlugValidation};

pub fn configure_workspaces_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            ApiUrls::WORKSPACES,
            get(handlers::handle_list_workspaces).post(handlers::handle_create_workspace),
        )
        .route(
            ApiUrls::WORKSPACE_SLUG_AVAILABILITY,
            get(handlers::handle_slug_availability),
        )
        .route(
            ApiUrls::WORKSPACE_BY_SLUG,
            get(handlers::handle_get_workspace)
                .put(handlers::handle_update_workspace)
                .delete(handlers::handle_delete_workspace),
        )
        .route(
            ApiUrls::WORKSPACE_MEMBERS,
            get(handlers::handle_list_members).post(handlers::handle_add_member),
        )
        .route(
            ApiUrls::WORKSPACE_MEMBER,
            patch(handlers::handle_update_member_role).delete(handlers::handle_remove_member),
        )
}

#[cfg(test)]
mod tests {
    use crate::core::shared::test_utils::TestApp;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_and_fetch_workspace() {
        let app = TestApp::new();
        let owner = app.user("octocat").await;
        let token = app.token(owner.id);

        let (status, body) = app
            .post(
                "/api/workspaces",
                Some(&token),
                json!({"name": "Acme", "slug": "acme", "description": "Rockets"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["slug"], "acme");
        assert_eq!(body["userRole"], "OWNER");

        let (status, body) = app.get("/api/workspaces/acme", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["permissions"]["canAdmin"], true);

        let (status, body) = app
            .post("/api/workspaces", Some(&token), json!({"name": "Dup", "slug": "acme"}))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "A workspace with this slug already exists");
    }

    #[tokio::test]
    async fn test_invalid_slug_messages() {
        let app = TestApp::new();
        let owner = app.user("octocat").await;
        let token = app.token(owner.id);

        let cases = [
            ("a", "Workspace slug must be at least 2 characters"),
            ("Bad_Slug", "Invalid workspace slug format"),
            ("admin", "This workspace slug is reserved. Please choose a different one."),
        ];
        for (slug, message) in cases {
            let (status, body) = app
                .post("/api/workspaces", Some(&token), json!({"name": "X", "slug": slug}))
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{slug}");
            assert_eq!(body["error"], message);
        }
    }

    #[tokio::test]
    async fn test_outsider_gets_not_found() {
        let app = TestApp::new();
        let owner = app.user("octocat").await;
        let stranger = app.user("stranger").await;
        app.workspace(&owner, "acme").await;

        let (status, body) = app.get("/api/workspaces/acme", Some(&app.token(stranger.id))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Workspace not found or access denied");

        let (status, _) = app.get("/api/workspaces/acme", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_member_routes() {
        let app = TestApp::new();
        let owner = app.user("octocat").await;
        let dev = app.user("devdev").await;
        app.workspace(&owner, "acme").await;
        let token = app.token(owner.id);

        let (status, body) = app
            .post(
                "/api/workspaces/acme/members",
                Some(&token),
                json!({"githubUsername": "devdev", "role": "DEVELOPER"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["role"], "DEVELOPER");

        let (status, body) = app
            .post(
                "/api/workspaces/acme/members",
                Some(&token),
                json!({"githubUsername": "nobody", "role": "DEVELOPER"}),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "User not found. They must sign up first.");

        let uri = format!("/api/workspaces/acme/members/{}", dev.id);
        let (status, body) = app.patch(&uri, Some(&token), json!({"role": "DEVELOPER"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Member already has this role");

        let (status, _) = app.patch(&uri, Some(&token), json!({"role": "ADMIN"})).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app.get("/api/workspaces/acme/members", Some(&app.token(dev.id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["members"][0]["role"], "ADMIN");

        let (status, _) = app.delete(&uri, Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.get("/api/workspaces/acme", Some(&app.token(dev.id))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_slug_availability_route() {
        let app = TestApp::new();
        let owner = app.user("octocat").await;
        app.workspace(&owner, "acme").await;
        let token = app.token(owner.id);

        let (status, body) = app
            .get("/api/workspaces/slug-availability?slug=acme", Some(&token))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isAvailable"], false);

        let (_, body) = app
            .get("/api/workspaces/slug-availability?slug=fresh-one", Some(&token))
            .await;
        assert_eq!(body["isAvailable"], true);
        assert!(body.get("error").is_none());
    }
}
