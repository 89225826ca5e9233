//! HTTP server initialization and routing

use axum::{routing::get, Router};
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;
use crate::security::create_cors_layer;

use super::{health_check, health_check_simple, shutdown_signal};

/// Every API route with state applied, wrapped in CORS and request tracing.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route(ApiUrls::HEALTH, get(health_check_simple))
        .route(ApiUrls::API_HEALTH, get(health_check))
        .merge(crate::workspaces::configure_workspaces_routes())
        .merge(crate::tasks::configure_task_routes())
        .merge(crate::chat::configure_chat_routes())
        .merge(crate::janitors::configure_janitors_routes());

    api_router
        .with_state(app_state)
        .layer(create_cors_layer())
        .layer(TraceLayer::new_for_http())
}

pub async fn run_axum_server(app_state: Arc<AppState>) -> std::io::Result<()> {
    let server = &app_state.config.server;
    let addr: SocketAddr = format!("{}:{}", server.host, server.port)
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("Invalid bind address: {e}")))?;

    let app = build_router(app_state.clone());

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to {addr}: {e} - is another instance running?");
            return Err(e);
        }
    };
    info!("HTTP server listening on {addr}");
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(std::io::Error::other)
}
