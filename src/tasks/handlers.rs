use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use log::info;
use std::sync::Arc;

use super::error::TaskError;
use super::types::CreateTaskRequest;
use crate::core::middleware::SessionUser;
use crate::core::shared::enums::Priority;
use crate::core::shared::models::Task;
use crate::core::shared::state::AppState;
use crate::workspaces::{require_access, resolve_workspace_access_by_id, Capability};

pub async fn handle_task_create(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), TaskError> {
    let store = state.store.as_ref();
    let access = require_access(store, &req.workspace_slug, session.user_id, Capability::Write).await?;

    let title = req
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(TaskError::Validation("Title is required"))?;
    let priority = match req.priority.as_deref() {
        Some(raw) => raw
            .parse::<Priority>()
            .map_err(|_| TaskError::Validation("Invalid priority"))?,
        None => Priority::Medium,
    };
    if let Some(assignee_id) = req.assignee_id {
        if resolve_workspace_access_by_id(store, access.workspace.id, assignee_id)
            .await?
            .is_none()
        {
            return Err(TaskError::Validation("Assignee is not a member of this workspace"));
        }
    }

    let mut task = Task::new(access.workspace.id, title.to_string(), session.user_id);
    task.description = req
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    task.priority = priority;
    task.assignee_id = req.assignee_id;

    let task = store.insert_task(task).await?;
    info!("Created task {} in workspace {}", task.id, access.workspace.slug);
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn handle_task_list(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(slug): Path<String>,
) -> Result<Json<Vec<Task>>, TaskError> {
    let store = state.store.as_ref();
    let access = require_access(store, &slug, session.user_id, Capability::Read).await?;
    Ok(Json(store.list_tasks(access.workspace.id).await?))
}
