use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::core::shared::enums::{ArtifactType, ChatRole, ChatStatus};
use crate::core::shared::models::{Artifact, Attachment, ChatMessage, ContextTag};
use crate::stakwork::DispatchOutcome;

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactInput {
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    #[serde(default)]
    pub content: Value,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInput {
    pub path: String,
    pub filename: String,
    pub mime_type: String,
    #[serde(default)]
    pub size: i64,
}

/// Body of `POST /api/chat/message`. Everything is optional at the wire level
/// so that missing fields produce the handler's own messages.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub task_id: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub context_tags: Vec<ContextTag>,
    #[serde(rename = "sourceWebsocketID")]
    pub source_websocket_id: Option<String>,
    #[serde(default)]
    pub artifacts: Vec<ArtifactInput>,
    #[serde(default)]
    pub attachments: Vec<AttachmentInput>,
    pub reply_id: Option<Uuid>,
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub success: bool,
    pub message: ChatMessage,
    pub workflow: DispatchOutcome,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantResponseRequest {
    pub task_id: Uuid,
    pub message: String,
    #[serde(default)]
    pub context_tags: Vec<ContextTag>,
    #[serde(default)]
    pub artifacts: Vec<ArtifactInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockRequest {
    pub message: String,
    pub task_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookQuery {
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowStatusUpdate {
    pub project_status: Option<String>,
    pub workflow_status: Option<String>,
}

impl WorkflowStatusUpdate {
    pub fn raw_status(&self) -> Option<&str> {
        self.project_status
            .as_deref()
            .or(self.workflow_status.as_deref())
    }
}

#[derive(Debug, Serialize)]
pub struct MessageCreated {
    pub success: bool,
    pub message: ChatMessage,
}

/// Builds a message with fresh ids on every child row.
pub fn new_message(
    task_id: Uuid,
    text: String,
    role: ChatRole,
    user_id: Option<Uuid>,
    context_tags: Vec<ContextTag>,
    artifacts: Vec<ArtifactInput>,
    attachments: Vec<AttachmentInput>,
) -> ChatMessage {
    let now = Utc::now();
    let id = Uuid::new_v4();
    ChatMessage {
        id,
        task_id,
        message: text,
        role,
        status: ChatStatus::Sent,
        context_tags,
        reply_id: None,
        source_websocket_id: None,
        user_id,
        timestamp: now,
        created_at: now,
        artifacts: artifacts
            .into_iter()
            .map(|a| Artifact {
                id: Uuid::new_v4(),
                message_id: id,
                artifact_type: a.artifact_type,
                content: a.content,
                icon: a.icon,
                created_at: now,
            })
            .collect(),
        attachments: attachments
            .into_iter()
            .map(|a| Attachment {
                id: Uuid::new_v4(),
                message_id: id,
                path: a.path,
                filename: a.filename,
                mime_type: a.mime_type,
                size: a.size,
                created_at: now,
            })
            .collect(),
    }
}
