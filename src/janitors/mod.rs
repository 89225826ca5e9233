//! Janitors: automated repository reviews that run on the workflow engine and
//! come back as recommendations a member can turn into tasks.

pub mod error;
pub mod handlers;
pub mod service;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;

pub use error::JanitorError;
pub use service::{parse_janitor_type, JanitorService, WebhookEffect};

pub fn configure_janitors_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            ApiUrls::JANITOR_CONFIG,
            get(handlers::handle_get_config).put(handlers::handle_update_config),
        )
        .route(ApiUrls::JANITOR_RUN, post(handlers::handle_trigger_run))
        .route(ApiUrls::JANITOR_RUNS, get(handlers::handle_list_runs))
        .route(
            ApiUrls::JANITOR_RECOMMENDATIONS,
            get(handlers::handle_list_recommendations),
        )
        .route(
            ApiUrls::RECOMMENDATION_ACCEPT,
            post(handlers::handle_accept_recommendation),
        )
        .route(
            ApiUrls::RECOMMENDATION_DISMISS,
            post(handlers::handle_dismiss_recommendation),
        )
        .route(ApiUrls::JANITOR_WEBHOOK, post(handlers::handle_janitor_webhook))
}

#[cfg(test)]
mod tests {
    use crate::core::shared::enums::{JanitorStatus, WorkspaceRole};
    use crate::core::shared::test_utils::{test_config, TestApp};
    use crate::security::webhook::sign_payload;
    use crate::security::SIGNATURE_HEADER;
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    async fn enable(app: &TestApp, token: &str, flag: &str) {
        let (status, body) = app
            .put("/api/workspaces/acme/janitors/config", Some(token), json!({ flag: true }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["config"][flag], true);
    }

    #[tokio::test]
    async fn test_config_roles() {
        let app = TestApp::new();
        let owner = app.user("owner").await;
        let dev = app.user("dev").await;
        let workspace = app.workspace(&owner, "acme").await;
        app.member(&workspace, &dev, WorkspaceRole::Developer).await;

        let (status, body) = app
            .get("/api/workspaces/acme/janitors/config", Some(&app.token(dev.id)))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["config"]["unitTestsEnabled"], false);

        let (status, _) = app
            .put(
                "/api/workspaces/acme/janitors/config",
                Some(&app.token(dev.id)),
                json!({"unitTestsEnabled": true}),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        enable(&app, &app.token(owner.id), "unitTestsEnabled").await;
    }

    #[tokio::test]
    async fn test_trigger_run_flow() {
        let app = TestApp::new();
        let owner = app.user("owner").await;
        app.workspace(&owner, "acme").await;
        let token = app.token(owner.id);

        let (status, body) = app
            .post("/api/workspaces/acme/janitors/unit-tests/run", Some(&token), json!({}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unit Tests janitor is not enabled");

        let (status, body) = app
            .post("/api/workspaces/acme/janitors/linting/run", Some(&token), json!({}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid janitor type: linting");

        enable(&app, &token, "unitTestsEnabled").await;
        let (status, body) = app
            .post("/api/workspaces/acme/janitors/unit-tests/run", Some(&token), json!({}))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["run"]["status"], "PENDING");
        assert_eq!(body["run"]["janitorType"], "UNIT_TESTS");

        let (status, body) = app
            .post("/api/workspaces/acme/janitors/UNIT_TESTS/run", Some(&token), json!({}))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "A Unit Tests janitor run is already in progress");

        let (status, body) = app
            .get("/api/workspaces/acme/janitors/runs?type=unit-tests&limit=500", Some(&token))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["runs"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_dispatched_run_and_webhook_round() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/projects")
            .match_body(mockito::Matcher::PartialJson(json!({"workflow_id": 555})))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true,"data":{"project_id":9001}}"#)
            .create_async()
            .await;

        let app = TestApp::with_config(test_config(&[
            ("STAKWORK_API_KEY", "sk-test"),
            ("STAKWORK_BASE_URL", server.url().as_str()),
            ("STAKWORK_WORKFLOW_ID", "1,2,3"),
            ("STAKWORK_JANITOR_WORKFLOW_ID", "555"),
            ("WEBHOOK_SECRET", "hook-secret"),
        ]));
        let owner = app.user("owner").await;
        app.workspace(&owner, "acme").await;
        let token = app.token(owner.id);
        enable(&app, &token, "securityReviewEnabled").await;

        let (status, body) = app
            .post("/api/workspaces/acme/janitors/security-review/run", Some(&token), json!({}))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["run"]["status"], "RUNNING");
        assert_eq!(body["run"]["stakworkProjectId"], 9001);
        mock.assert_async().await;

        let payload = json!({
            "projectId": 9001,
            "status": "completed",
            "results": {"recommendations": [
                {"title": "Rotate keys", "description": "Keys are old", "priority": "CRITICAL"},
                {"title": "Pin deps", "description": "Unpinned crates"},
            ]},
        })
        .to_string()
        .into_bytes();

        let (status, _) = app
            .request_raw(Method::POST, "/api/janitors/webhook", None, &[], payload.clone())
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let signature = sign_payload(&payload, "hook-secret").expect("sign");
        let (status, body) = app
            .request_raw(
                Method::POST,
                "/api/janitors/webhook",
                None,
                &[(SIGNATURE_HEADER, signature.as_str())],
                payload,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "COMPLETED");

        let (status, body) = app
            .get("/api/workspaces/acme/janitors/recommendations?status=pending", Some(&token))
            .await;
        assert_eq!(status, StatusCode::OK);
        let recommendations = body["recommendations"].as_array().cloned().unwrap_or_default();
        assert_eq!(recommendations.len(), 2);
        assert_eq!(recommendations[0]["priority"], "CRITICAL");
        assert_eq!(recommendations[1]["priority"], "MEDIUM");

        let first = recommendations[0]["id"].as_str().unwrap_or_default().to_string();
        let (status, body) = app
            .post(&format!("/api/janitors/recommendations/{first}/accept"), Some(&token), json!({}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recommendation"]["status"], "ACCEPTED");
        assert_eq!(body["task"]["sourceType"], "JANITOR");
        assert_eq!(body["task"]["title"], "Rotate keys");

        let (status, body) = app
            .post(&format!("/api/janitors/recommendations/{first}/dismiss"), Some(&token), json!({}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Recommendation is not pending");

        let second = recommendations[1]["id"].as_str().unwrap_or_default().to_string();
        let (status, body) = app
            .post(
                &format!("/api/janitors/recommendations/{second}/dismiss"),
                Some(&token),
                json!({"reason": "Handled upstream"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recommendation"]["metadata"]["dismissalReason"], "Handled upstream");
    }

    #[tokio::test]
    async fn test_failed_dispatch_marks_run_failed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/projects")
            .with_status(503)
            .create_async()
            .await;

        let app = TestApp::with_config(test_config(&[
            ("STAKWORK_API_KEY", "sk-test"),
            ("STAKWORK_BASE_URL", server.url().as_str()),
            ("STAKWORK_WORKFLOW_ID", "1"),
            ("STAKWORK_JANITOR_WORKFLOW_ID", "555"),
        ]));
        let owner = app.user("owner").await;
        app.workspace(&owner, "acme").await;
        let token = app.token(owner.id);
        enable(&app, &token, "e2eTestsEnabled").await;

        let (status, body) = app
            .post("/api/workspaces/acme/janitors/e2e-tests/run", Some(&token), json!({}))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["run"]["status"], "FAILED");
        assert!(body["run"]["error"].as_str().is_some_and(|e| e.contains("503")));

        let run_id = body["run"]["id"].as_str().unwrap_or_default();
        let run = app
            .store
            .get_janitor_run(run_id.parse().expect("uuid"))
            .await
            .expect("run");
        assert_eq!(run.status, JanitorStatus::Failed);
    }

    #[tokio::test]
    async fn test_dispatch_without_project_id_does_not_block_the_type() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/projects")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true,"data":{}}"#)
            .expect(2)
            .create_async()
            .await;

        let app = TestApp::with_config(test_config(&[
            ("STAKWORK_API_KEY", "sk-test"),
            ("STAKWORK_BASE_URL", server.url().as_str()),
            ("STAKWORK_WORKFLOW_ID", "1"),
            ("STAKWORK_JANITOR_WORKFLOW_ID", "555"),
        ]));
        let owner = app.user("owner").await;
        app.workspace(&owner, "acme").await;
        let token = app.token(owner.id);
        enable(&app, &token, "unitTestsEnabled").await;

        let (status, body) = app
            .post("/api/workspaces/acme/janitors/unit-tests/run", Some(&token), json!({}))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["run"]["status"], "FAILED");
        assert_eq!(body["run"]["error"], "No project id returned");
        assert_eq!(body["run"]["stakworkProjectId"], Value::Null);

        let (status, _) = app
            .post("/api/workspaces/acme/janitors/unit-tests/run", Some(&token), json!({}))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_malformed_recommendation_id_is_not_found() {
        let app = TestApp::new();
        let owner = app.user("owner").await;
        app.workspace(&owner, "acme").await;
        let token = app.token(owner.id);

        for action in ["accept", "dismiss"] {
            let (status, body) = app
                .post(
                    &format!("/api/janitors/recommendations/not-a-uuid/{action}"),
                    Some(&token),
                    json!({}),
                )
                .await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{action}");
            assert_eq!(body["error"], "Recommendation not found");
        }
    }

    #[tokio::test]
    async fn test_webhook_for_unknown_project() {
        let app = TestApp::new();
        let (status, body) = app
            .post("/api/janitors/webhook", None, json!({"projectId": 1234, "status": "running"}))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Janitor run not found");
    }

    #[tokio::test]
    async fn test_viewer_reads_recommendations() {
        let app = TestApp::new();
        let owner = app.user("owner").await;
        let viewer = app.user("viewer").await;
        let workspace = app.workspace(&owner, "acme").await;
        app.member(&workspace, &viewer, WorkspaceRole::Viewer).await;

        let (status, body) = app
            .get("/api/workspaces/acme/janitors/recommendations", Some(&app.token(viewer.id)))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recommendations"], Value::Array(Vec::new()));

        let (status, _) = app
            .post(
                &format!("/api/janitors/recommendations/{}/accept", uuid::Uuid::new_v4()),
                Some(&app.token(viewer.id)),
                json!({}),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
