use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::dispatch::dispatch_message;
use super::error::ChatError;
use super::types::{
    new_message, AssistantResponseRequest, MessageCreated, MockRequest, SendMessageRequest,
    SendMessageResponse, WebhookQuery, WorkflowStatusUpdate,
};
use crate::core::middleware::SessionUser;
use crate::core::shared::enums::ChatRole;
use crate::core::shared::models::{ChatMessage, Task, WorkflowUpdate};
use crate::core::shared::state::AppState;
use crate::core::store::{Store, StoreError};
use crate::security::verify_webhook;
use crate::stakwork::{map_workflow_status, DispatchOutcome};
use crate::workspaces::resolve_workspace_access_by_id;

/// Soft-deleted tasks read as absent.
async fn find_live_task(store: &dyn Store, id: Uuid) -> Result<Option<Task>, StoreError> {
    Ok(store.get_task(id).await?.filter(|t| !t.deleted))
}

/// Unparseable ids read as absent.
async fn find_live_task_str(store: &dyn Store, raw_id: &str) -> Result<Option<Task>, StoreError> {
    match Uuid::parse_str(raw_id.trim()) {
        Ok(id) => find_live_task(store, id).await,
        Err(_) => Ok(None),
    }
}

fn parse_webhook_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ChatError> {
    serde_json::from_slice(body).map_err(|e| ChatError::Validation(format!("Invalid JSON payload: {e}")))
}

pub async fn handle_send_message(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SendMessageResponse>), ChatError> {
    let Json(req) = body.map_err(|e| ChatError::CreateFailed(e.body_text()))?;
    let store = state.store.as_ref();

    let text = req
        .message
        .clone()
        .filter(|m| !m.trim().is_empty())
        .ok_or(ChatError::MessageRequired)?;
    let raw_task_id = req
        .task_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or(ChatError::TaskIdRequired)?;

    let task = find_live_task_str(store, raw_task_id)
        .await
        .map_err(|e| ChatError::CreateFailed(e.to_string()))?
        .ok_or(ChatError::TaskNotFound)?;
    let user = store
        .get_user(session.user_id)
        .await
        .map_err(|e| ChatError::CreateFailed(e.to_string()))?
        .ok_or(ChatError::UserNotFound)?;
    resolve_workspace_access_by_id(store, task.workspace_id, user.id)
        .await
        .map_err(|e| ChatError::CreateFailed(e.to_string()))?
        .ok_or(ChatError::AccessDenied)?;

    let mut message = new_message(
        task.id,
        text,
        ChatRole::User,
        Some(user.id),
        req.context_tags,
        req.artifacts,
        req.attachments,
    );
    message.reply_id = req.reply_id;
    message.source_websocket_id = req.source_websocket_id;

    let message = store
        .insert_chat_message(message)
        .await
        .map_err(|e| ChatError::CreateFailed(e.to_string()))?;
    info!("Stored chat message {} on task {}", message.id, task.id);

    let workflow = dispatch_message(&state, &task, &user, &message, req.mode.as_deref()).await;
    if let DispatchOutcome::Failure { error } = &workflow {
        warn!("Dispatch for message {} failed: {error}", message.id);
    }

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            success: true,
            message,
            workflow,
        }),
    ))
}

pub async fn handle_list_messages(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(task_id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, ChatError> {
    let store = state.store.as_ref();
    let task = find_live_task_str(store, &task_id).await?.ok_or(ChatError::TaskNotFound)?;
    resolve_workspace_access_by_id(store, task.workspace_id, session.user_id)
        .await?
        .ok_or(ChatError::AccessDenied)?;
    Ok(Json(store.list_chat_messages(task.id).await?))
}

/// Assistant output posted back by the workflow engine.
pub async fn handle_assistant_response(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<MessageCreated>), ChatError> {
    verify_webhook(&headers, &body, state.config.webhook_secret.as_deref())?;
    let req: AssistantResponseRequest = parse_webhook_body(&body)?;

    let store = state.store.as_ref();
    let task = find_live_task(store, req.task_id)
        .await?
        .ok_or(ChatError::TaskNotFound)?;

    let message = new_message(
        task.id,
        req.message,
        ChatRole::Assistant,
        None,
        req.context_tags,
        req.artifacts,
        Vec::new(),
    );
    let message = store.insert_chat_message(message).await?;
    info!("Stored assistant response {} on task {}", message.id, task.id);
    Ok((StatusCode::CREATED, Json(MessageCreated { success: true, message })))
}

/// Local stand-in for the workflow engine; answers by echoing the message.
pub async fn handle_mock(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MockRequest>,
) -> Result<Json<MessageCreated>, ChatError> {
    let store = state.store.as_ref();
    let task = find_live_task(store, req.task_id)
        .await?
        .ok_or(ChatError::TaskNotFound)?;

    let message = new_message(
        task.id,
        format!("Mock response: {}", req.message),
        ChatRole::Assistant,
        None,
        Vec::new(),
        Vec::new(),
        Vec::new(),
    );
    let message = store.insert_chat_message(message).await?;
    Ok(Json(MessageCreated { success: true, message }))
}

/// Workflow status callback, `POST /api/stakwork/webhook?task_id=<id>`.
pub async fn handle_stakwork_webhook(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WebhookQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ChatError> {
    verify_webhook(&headers, &body, state.config.webhook_secret.as_deref())?;

    let raw_task_id = query
        .task_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ChatError::Validation("task_id is required".to_string()))?;
    let update: WorkflowStatusUpdate = parse_webhook_body(&body)?;
    let raw_status = update
        .raw_status()
        .ok_or_else(|| ChatError::Validation("Status is required".to_string()))?;
    let status = map_workflow_status(raw_status)
        .ok_or_else(|| ChatError::Validation(format!("Unknown workflow status: {raw_status}")))?;

    let store = state.store.as_ref();
    let task = find_live_task_str(store, &raw_task_id)
        .await?
        .ok_or(ChatError::TaskNotFound)?;

    let change = WorkflowUpdate {
        workflow_status: Some(status),
        workflow_completed_at: status.is_terminal().then(Utc::now),
        ..Default::default()
    };
    let task = store
        .update_task_workflow(task.id, change)
        .await?
        .ok_or(ChatError::TaskNotFound)?;
    info!("Task {} workflow status set to {status}", task.id);

    Ok(Json(json!({
        "success": true,
        "data": {
            "taskId": task.id,
            "workflowStatus": task.workflow_status,
        }
    })))
}
