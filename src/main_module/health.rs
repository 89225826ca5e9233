//! Health check handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use log::warn;
use std::sync::Arc;

use crate::core::shared::state::AppState;

const SERVICE_NAME: &str = "hive-server";

pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let store_ok = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Health check could not reach the store: {e}");
            false
        }
    };

    let status = if store_ok { "healthy" } else { "degraded" };
    let code = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(serde_json::json!({
            "status": status,
            "service": SERVICE_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "database": store_ok
        })),
    )
}

pub async fn health_check_simple() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "service": SERVICE_NAME,
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

#[cfg(test)]
mod tests {
    use crate::core::shared::test_utils::TestApp;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = TestApp::new();

        let (status, body) = app.get("/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "hive-server");

        let (status, body) = app.get("/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], true);
    }
}
