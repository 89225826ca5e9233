//! Hands a freshly stored user message to the workflow engine, or to the mock
//! responder when the engine is not configured, and records the result on the
//! task.

use chrono::Utc;
use log::{info, warn};

use crate::core::shared::enums::WorkflowStatus;
use crate::core::shared::models::{ChatMessage, Task, User, WorkflowUpdate};
use crate::core::shared::state::AppState;
use crate::stakwork::{build_chat_payload, call_mock, select_workflow_id, ChatDispatch, DispatchOutcome, StakworkClient};

pub async fn dispatch_message(
    state: &AppState,
    task: &Task,
    user: &User,
    message: &ChatMessage,
    mode: Option<&str>,
) -> DispatchOutcome {
    if !state.config.stakwork.is_configured() {
        return call_mock(
            &state.http,
            &state.config.server.base_url,
            &message.message,
            user.id,
            task.id,
            &message.artifacts,
        )
        .await;
    }

    let outcome = send_to_stakwork(state, task, user, message, mode).await;
    record_outcome(state, task, &outcome).await;
    outcome
}

async fn send_to_stakwork(
    state: &AppState,
    task: &Task,
    user: &User,
    message: &ChatMessage,
    mode: Option<&str>,
) -> DispatchOutcome {
    let ids = state.config.stakwork.workflow_ids.as_deref().unwrap_or_default();
    let Some(workflow_id) = select_workflow_id(ids, mode) else {
        return DispatchOutcome::failure("No workflow id configured for mode");
    };

    let swarm = match state.store.find_swarm(task.workspace_id).await {
        Ok(swarm) => swarm,
        Err(e) => {
            warn!("Could not load swarm for workspace {}: {e}", task.workspace_id);
            None
        }
    };

    let mut attachment_urls = Vec::with_capacity(message.attachments.len());
    for attachment in &message.attachments {
        match state.storage.presigned_download_url(&attachment.path).await {
            Ok(url) => attachment_urls.push(url),
            Err(e) => {
                warn!("Attachment presign failed for task {}: {e}", task.id);
                return DispatchOutcome::failure(e.to_string());
            }
        }
    }

    let dispatch = ChatDispatch {
        task_id: task.id,
        message: &message.message,
        context_tags: &message.context_tags,
        user,
        swarm: swarm.as_ref(),
        attachment_urls,
        mode,
    };
    let payload = build_chat_payload(&dispatch, workflow_id, &state.config.server.base_url);
    StakworkClient::new(&state.http, &state.config.stakwork)
        .create_project(&payload)
        .await
}

async fn record_outcome(state: &AppState, task: &Task, outcome: &DispatchOutcome) {
    let update = if outcome.is_success() {
        WorkflowUpdate {
            workflow_status: Some(WorkflowStatus::InProgress),
            stakwork_project_id: outcome.project_id(),
            workflow_started_at: Some(Utc::now()),
            workflow_completed_at: None,
        }
    } else {
        WorkflowUpdate {
            workflow_status: Some(WorkflowStatus::Failed),
            ..Default::default()
        }
    };

    match state.store.update_task_workflow(task.id, update).await {
        Ok(Some(updated)) => info!(
            "Task {} workflow is now {:?}",
            updated.id, updated.workflow_status
        ),
        Ok(None) => warn!("Task {} vanished before its workflow status was recorded", task.id),
        Err(e) => warn!("Failed to record workflow status for task {}: {e}", task.id),
    }
}
