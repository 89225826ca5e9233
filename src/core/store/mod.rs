//! Persistence boundary.
//!
//! Handlers and services only talk to [`Store`]. `PgStore` is the diesel
//! implementation used in production; `MemoryStore` keeps everything in
//! process and enforces the same uniqueness rules, which is what the tests and
//! `--memory` mode run against.
//!
//! Operations that must be atomic (message with children, recommendation
//! accept plus task creation, run completion plus recommendations, janitor run
//! admission) are single trait methods so each implementation can make them so.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::shared::enums::{JanitorStatus, JanitorType, Priority, RecommendationStatus, WorkspaceRole};
use crate::core::shared::models::{
    ChatMessage, JanitorConfig, JanitorRecommendation, JanitorRun, Swarm, Task, User, Workspace,
    WorkspaceMember, WorkflowUpdate,
};

pub use memory::MemoryStore;
pub use pg::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(String),
}

impl From<diesel::result::Error> for StoreError {
    fn from(e: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error};
        match e {
            Error::NotFound => Self::NotFound("record".to_string()),
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                let info: &dyn DatabaseErrorInformation = info.as_ref();
                Self::UniqueViolation(
                    info.constraint_name()
                        .map(str::to_string)
                        .unwrap_or_else(|| info.message().to_string()),
                )
            }
            other => Self::Database(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    pub janitor_type: Option<JanitorType>,
    pub status: Option<JanitorStatus>,
    pub limit: i64,
}

#[derive(Debug, Clone, Default)]
pub struct RecommendationFilter {
    pub status: Option<RecommendationStatus>,
    pub priority: Option<Priority>,
    pub limit: i64,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_user_by_github_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn insert_user(&self, user: User) -> Result<User, StoreError>;

    /// Live (non-deleted) workspaces only.
    async fn find_workspace_by_slug(&self, slug: &str) -> Result<Option<Workspace>, StoreError>;
    /// Live (non-deleted) workspaces only.
    async fn get_workspace(&self, id: Uuid) -> Result<Option<Workspace>, StoreError>;
    /// Fails with `UniqueViolation` when a live workspace already uses the slug.
    async fn insert_workspace(&self, workspace: Workspace) -> Result<Workspace, StoreError>;
    async fn update_workspace(&self, workspace: Workspace) -> Result<Workspace, StoreError>;
    /// Owned workspaces plus those with an active membership, with the caller's role.
    async fn list_workspaces_for_user(&self, user_id: Uuid) -> Result<Vec<(Workspace, WorkspaceRole)>, StoreError>;

    /// Any membership row for the pair, active or left.
    async fn find_membership(&self, workspace_id: Uuid, user_id: Uuid) -> Result<Option<WorkspaceMember>, StoreError>;
    async fn insert_member(&self, member: WorkspaceMember) -> Result<WorkspaceMember, StoreError>;
    async fn update_member(&self, member: WorkspaceMember) -> Result<WorkspaceMember, StoreError>;
    async fn list_active_members(&self, workspace_id: Uuid) -> Result<Vec<(WorkspaceMember, User)>, StoreError>;

    async fn find_swarm(&self, workspace_id: Uuid) -> Result<Option<Swarm>, StoreError>;

    /// Includes soft-deleted tasks; callers decide what deletion means for them.
    async fn get_task(&self, id: Uuid) -> Result<Option<Task>, StoreError>;
    async fn insert_task(&self, task: Task) -> Result<Task, StoreError>;
    async fn update_task_workflow(&self, id: Uuid, update: WorkflowUpdate) -> Result<Option<Task>, StoreError>;
    async fn list_tasks(&self, workspace_id: Uuid) -> Result<Vec<Task>, StoreError>;

    /// Writes the message, its artifacts and its attachments in one unit.
    async fn insert_chat_message(&self, message: ChatMessage) -> Result<ChatMessage, StoreError>;
    async fn list_chat_messages(&self, task_id: Uuid) -> Result<Vec<ChatMessage>, StoreError>;

    async fn get_janitor_config(&self, workspace_id: Uuid) -> Result<Option<JanitorConfig>, StoreError>;
    /// Returns the workspace's config, creating the all-disabled default if missing.
    async fn ensure_janitor_config(&self, workspace_id: Uuid) -> Result<JanitorConfig, StoreError>;
    async fn update_janitor_config(&self, config: JanitorConfig) -> Result<JanitorConfig, StoreError>;

    /// Inserts `run` unless a PENDING or RUNNING run of the same type exists for
    /// the same config, in which case it fails with `Conflict`. Check and insert
    /// happen atomically.
    async fn create_janitor_run_if_idle(&self, run: JanitorRun) -> Result<JanitorRun, StoreError>;
    async fn update_janitor_run(&self, run: JanitorRun) -> Result<JanitorRun, StoreError>;
    async fn find_janitor_run_by_project_id(&self, project_id: i64) -> Result<Option<JanitorRun>, StoreError>;
    async fn list_janitor_runs(&self, janitor_config_id: Uuid, filter: RunFilter) -> Result<Vec<JanitorRun>, StoreError>;
    /// The lifecycle transitions below re-check that the run is still PENDING or
    /// RUNNING inside the same unit of work and fail with `Conflict` otherwise.
    async fn start_janitor_run(&self, run_id: Uuid) -> Result<JanitorRun, StoreError>;
    /// Inserts the recommendations and marks the run COMPLETED in one unit.
    async fn complete_janitor_run(
        &self,
        run_id: Uuid,
        recommendations: Vec<JanitorRecommendation>,
    ) -> Result<JanitorRun, StoreError>;
    async fn fail_janitor_run(&self, run_id: Uuid, error: Option<String>) -> Result<JanitorRun, StoreError>;

    /// The recommendation together with the id of the workspace it belongs to.
    async fn find_recommendation(&self, id: Uuid) -> Result<Option<(JanitorRecommendation, Uuid)>, StoreError>;
    async fn list_recommendations(
        &self,
        workspace_id: Uuid,
        filter: RecommendationFilter,
    ) -> Result<Vec<JanitorRecommendation>, StoreError>;
    /// PENDING -> ACCEPTED plus insertion of `task`, atomically. `Conflict` when
    /// the recommendation is no longer pending.
    async fn accept_recommendation(
        &self,
        id: Uuid,
        accepted_by: Uuid,
        task: Task,
    ) -> Result<(JanitorRecommendation, Task), StoreError>;
    /// PENDING -> DISMISSED, storing `reason` under `metadata.dismissalReason`.
    async fn dismiss_recommendation(
        &self,
        id: Uuid,
        dismissed_by: Uuid,
        reason: Option<String>,
    ) -> Result<JanitorRecommendation, StoreError>;
}

pub(crate) const NOT_PENDING: &str = "Recommendation is not pending";
pub(crate) const RUN_FINISHED: &str = "Janitor run already finished";

pub(crate) fn in_flight_conflict(janitor_type: JanitorType) -> StoreError {
    StoreError::Conflict(format!(
        "A {} janitor run is already in progress",
        janitor_type.label()
    ))
}

pub(crate) fn dismissal_metadata(
    existing: Option<serde_json::Value>,
    reason: Option<String>,
) -> Option<serde_json::Value> {
    let mut map = match existing {
        Some(serde_json::Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };
    if let Some(reason) = reason {
        map.insert("dismissalReason".to_string(), serde_json::Value::String(reason));
    }
    Some(serde_json::Value::Object(map))
}
