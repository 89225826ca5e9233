use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use crate::core::config::AppConfig;
use crate::core::middleware::issue_session_token;
use crate::core::shared::enums::WorkspaceRole;
use crate::core::shared::models::{Swarm, Task, User, Workspace, WorkspaceMember};
use crate::core::shared::state::AppState;
use crate::core::store::{MemoryStore, Store};
use crate::drive::{FileStorage, StorageError};
use crate::main_module::build_router;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";

/// Presigns by appending a fake signature to a fixed host.
#[derive(Debug, Default, Clone)]
pub struct StubStorage;

#[async_trait]
impl FileStorage for StubStorage {
    async fn presigned_download_url(&self, path: &str) -> Result<String, StorageError> {
        Ok(format!("https://files.test/{}?X-Amz-Signature=stub", path.trim_start_matches('/')))
    }
}

pub fn test_config(overrides: &[(&str, &str)]) -> AppConfig {
    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert("JWT_SECRET".to_string(), TEST_JWT_SECRET.to_string());
    vars.insert("APP_BASE_URL".to_string(), "http://hive.test".to_string());
    for (k, v) in overrides {
        vars.insert(k.to_string(), v.to_string());
    }
    match AppConfig::from_vars(|key| vars.get(key).cloned()) {
        Ok(config) => config,
        Err(e) => panic!("invalid test config: {e}"),
    }
}

pub struct TestApp {
    pub store: MemoryStore,
    pub state: Arc<AppState>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config(&[]))
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::with_parts(config, Arc::new(StubStorage))
    }

    pub fn with_parts(config: AppConfig, storage: Arc<dyn FileStorage>) -> Self {
        let store = MemoryStore::new();
        let state = Arc::new(AppState::new(
            config,
            Arc::new(store.clone()),
            storage,
            reqwest::Client::new(),
        ));
        let router = build_router(state.clone());
        Self { store, state, router }
    }

    pub fn token(&self, user_id: Uuid) -> String {
        match issue_session_token(TEST_JWT_SECRET, user_id, chrono::Duration::hours(1)) {
            Ok(token) => token,
            Err(e) => panic!("failed to sign token: {e}"),
        }
    }

    pub async fn user(&self, login: &str) -> User {
        self.store
            .insert_user(User {
                id: Uuid::new_v4(),
                name: Some(login.to_string()),
                email: Some(format!("{login}@example.com")),
                github_username: Some(login.to_string()),
                github_token: Some(format!("gho_{login}")),
                created_at: Utc::now(),
            })
            .await
            .expect("insert user")
    }

    pub async fn workspace(&self, owner: &User, slug: &str) -> Workspace {
        let now = Utc::now();
        self.store
            .insert_workspace(Workspace {
                id: Uuid::new_v4(),
                name: slug.to_string(),
                description: None,
                slug: slug.to_string(),
                owner_id: owner.id,
                deleted: false,
                deleted_at: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("insert workspace")
    }

    pub async fn member(&self, workspace: &Workspace, user: &User, role: WorkspaceRole) -> WorkspaceMember {
        self.store
            .insert_member(WorkspaceMember {
                id: Uuid::new_v4(),
                workspace_id: workspace.id,
                user_id: user.id,
                role,
                joined_at: Utc::now(),
                left_at: None,
            })
            .await
            .expect("insert member")
    }

    pub async fn swarm(&self, workspace: &Workspace, url: &str) -> Swarm {
        self.store
            .insert_swarm(Swarm {
                id: Uuid::new_v4(),
                workspace_id: workspace.id,
                swarm_url: Some(url.to_string()),
                swarm_secret_alias: Some("{{SWARM_API_KEY}}".to_string()),
                pool_name: Some("pool-1".to_string()),
            })
            .await
    }

    pub async fn task(&self, workspace: &Workspace, creator: &User) -> Task {
        self.store
            .insert_task(Task::new(workspace.id, "Fix the build".to_string(), creator.id))
            .await
            .expect("insert task")
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        headers: &[(&str, &str)],
        body: Vec<u8>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::from(body)).expect("request")).await
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let bytes = body.map(|b| b.to_string().into_bytes()).unwrap_or_default();
        self.request_raw(method, uri, token, &[], bytes).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
