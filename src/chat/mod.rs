//! Task chat: user messages, their hand-off to the workflow engine and the
//! callbacks the engine makes afterwards.

pub mod dispatch;
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

pub use error::ChatError;
pub use types::SendMessageRequest;

pub fn configure_chat_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(ApiUrls::CHAT_MESSAGE, post(handlers::handle_send_message))
        .route(ApiUrls::CHAT_RESPONSE, post(handlers::handle_assistant_response))
        .route(ApiUrls::MOCK, post(handlers::handle_mock))
        .route(ApiUrls::STAKWORK_WEBHOOK, post(handlers::handle_stakwork_webhook))
        .route(ApiUrls::TASK_MESSAGES, get(handlers::handle_list_messages))
}
