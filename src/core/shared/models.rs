use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{
    ArtifactType, ChatRole, ChatStatus, JanitorStatus, JanitorTrigger, JanitorType, Priority,
    RecommendationStatus, TaskSourceType, TaskStatus, WorkflowStatus, WorkspaceRole,
};
use super::schema::{
    artifacts, attachments, janitor_configs, janitor_recommendations, janitor_runs, swarms,
    tasks, users, workspace_members, workspaces,
};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub github_username: Option<String>,
    #[serde(skip_serializing, default)]
    pub github_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = workspaces)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub slug: String,
    pub owner_id: Uuid,
    pub deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Membership row. Active iff `left_at` is `None`; removal sets `left_at`
/// and re-adding the same user reactivates this row.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = workspace_members)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMember {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: WorkspaceRole,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}

impl WorkspaceMember {
    pub fn is_active(&self) -> bool {
        self.left_at.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = swarms)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Swarm {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub swarm_url: Option<String>,
    pub swarm_secret_alias: Option<String>,
    pub pool_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub workflow_status: Option<WorkflowStatus>,
    pub source_type: TaskSourceType,
    pub stakwork_project_id: Option<i64>,
    pub assignee_id: Option<Uuid>,
    pub created_by_id: Uuid,
    pub workflow_started_at: Option<DateTime<Utc>>,
    pub workflow_completed_at: Option<DateTime<Utc>>,
    pub deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(workspace_id: Uuid, title: String, created_by_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            title,
            description: None,
            status: TaskStatus::Todo,
            priority: Priority::Medium,
            workflow_status: None,
            source_type: TaskSourceType::User,
            stakwork_project_id: None,
            assignee_id: None,
            created_by_id,
            workflow_started_at: None,
            workflow_completed_at: None,
            deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Changes applied to a task's workflow columns after a dispatch or a status callback.
#[derive(Debug, Clone, Default)]
pub struct WorkflowUpdate {
    pub workflow_status: Option<WorkflowStatus>,
    pub stakwork_project_id: Option<i64>,
    pub workflow_started_at: Option<DateTime<Utc>>,
    pub workflow_completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextTag {
    #[serde(rename = "type")]
    pub tag_type: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = artifacts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: Uuid,
    pub message_id: Uuid,
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    pub content: serde_json::Value,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = attachments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: Uuid,
    pub message_id: Uuid,
    pub path: String,
    pub filename: String,
    pub mime_type: String,
    pub size: i64,
    pub created_at: DateTime<Utc>,
}

/// A chat message with its owned artifacts and attachments. Context tags are
/// kept parsed here; the database column holds their JSON text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub task_id: Uuid,
    pub message: String,
    pub role: ChatRole,
    pub status: ChatStatus,
    pub context_tags: Vec<ContextTag>,
    pub reply_id: Option<Uuid>,
    #[serde(rename = "sourceWebsocketID")]
    pub source_websocket_id: Option<String>,
    pub user_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub artifacts: Vec<Artifact>,
    pub attachments: Vec<Attachment>,
}

pub fn serialize_context_tags(tags: &[ContextTag]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

/// Unreadable stored tags degrade to an empty list rather than failing the read.
pub fn parse_context_tags(raw: &str) -> Vec<ContextTag> {
    serde_json::from_str(raw).unwrap_or_default()
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = janitor_configs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct JanitorConfig {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub unit_tests_enabled: bool,
    pub integration_tests_enabled: bool,
    pub e2e_tests_enabled: bool,
    pub security_review_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JanitorConfig {
    pub fn new(workspace_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            unit_tests_enabled: false,
            integration_tests_enabled: false,
            e2e_tests_enabled: false,
            security_review_enabled: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_enabled(&self, janitor_type: JanitorType) -> bool {
        match janitor_type {
            JanitorType::UnitTests => self.unit_tests_enabled,
            JanitorType::IntegrationTests => self.integration_tests_enabled,
            JanitorType::E2eTests => self.e2e_tests_enabled,
            JanitorType::SecurityReview => self.security_review_enabled,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = janitor_runs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct JanitorRun {
    pub id: Uuid,
    pub janitor_config_id: Uuid,
    pub janitor_type: JanitorType,
    pub triggered_by: JanitorTrigger,
    pub status: JanitorStatus,
    pub stakwork_project_id: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JanitorRun {
    pub fn new(janitor_config_id: Uuid, janitor_type: JanitorType, triggered_by: JanitorTrigger) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            janitor_config_id,
            janitor_type,
            triggered_by,
            status: JanitorStatus::Pending,
            stakwork_project_id: None,
            started_at: None,
            completed_at: None,
            error: None,
            metadata: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = janitor_recommendations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct JanitorRecommendation {
    pub id: Uuid,
    pub janitor_run_id: Uuid,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub impact: Option<String>,
    pub status: RecommendationStatus,
    pub accepted_at: Option<DateTime<Utc>>,
    pub accepted_by_id: Option<Uuid>,
    pub dismissed_at: Option<DateTime<Utc>>,
    pub dismissed_by_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_tags_survive_storage_form() {
        let tags = vec![
            ContextTag {
                tag_type: "PRODUCT_BRIEF".to_string(),
                id: "brief-1".to_string(),
            },
            ContextTag {
                tag_type: "SCHEMATIC".to_string(),
                id: "s-9".to_string(),
            },
        ];
        let raw = serialize_context_tags(&tags);
        assert!(raw.contains("\"type\":\"PRODUCT_BRIEF\""));
        assert_eq!(parse_context_tags(&raw), tags);
    }

    #[test]
    fn test_garbage_context_tags_parse_to_empty() {
        assert!(parse_context_tags("not json").is_empty());
        assert!(parse_context_tags("").is_empty());
    }

    #[test]
    fn test_user_token_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            name: Some("Ada".to_string()),
            email: None,
            github_username: Some("ada".to_string()),
            github_token: Some("gho_secret".to_string()),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).expect("serialize");
        assert!(!json.contains("gho_secret"));
        assert!(json.contains("githubUsername"));
    }

    #[test]
    fn test_janitor_config_flags() {
        let mut config = JanitorConfig::new(Uuid::new_v4());
        assert!(!config.is_enabled(JanitorType::UnitTests));
        config.unit_tests_enabled = true;
        assert!(config.is_enabled(JanitorType::UnitTests));
        assert!(!config.is_enabled(JanitorType::IntegrationTests));
    }
}
