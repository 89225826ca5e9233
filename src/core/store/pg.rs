use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::Integer;
use std::collections::HashMap;
use uuid::Uuid;

use super::{
    dismissal_metadata, in_flight_conflict, RecommendationFilter, RunFilter, Store, StoreError,
    NOT_PENDING, RUN_FINISHED,
};
use crate::core::shared::enums::{
    ChatRole, ChatStatus, JanitorStatus, RecommendationStatus, WorkflowStatus, WorkspaceRole,
};
use crate::core::shared::models::{
    parse_context_tags, serialize_context_tags, Artifact, Attachment, ChatMessage, JanitorConfig,
    JanitorRecommendation, JanitorRun, Swarm, Task, User, Workspace, WorkspaceMember,
    WorkflowUpdate,
};
use crate::core::shared::schema::{
    artifacts, attachments, chat_messages, janitor_configs, janitor_recommendations, janitor_runs,
    swarms, tasks, users, workspace_members, workspaces,
};
use crate::core::shared::utils::DbPool;

const PRIORITY_RANK_SQL: &str = "CASE janitor_recommendations.priority \
     WHEN 'CRITICAL' THEN 3 WHEN 'HIGH' THEN 2 WHEN 'MEDIUM' THEN 1 ELSE 0 END";

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = chat_messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct DbChatMessage {
    id: Uuid,
    task_id: Uuid,
    message: String,
    role: ChatRole,
    status: ChatStatus,
    context_tags: String,
    reply_id: Option<Uuid>,
    source_websocket_id: Option<String>,
    user_id: Option<Uuid>,
    timestamp: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

fn message_to_db(message: &ChatMessage) -> DbChatMessage {
    DbChatMessage {
        id: message.id,
        task_id: message.task_id,
        message: message.message.clone(),
        role: message.role,
        status: message.status,
        context_tags: serialize_context_tags(&message.context_tags),
        reply_id: message.reply_id,
        source_websocket_id: message.source_websocket_id.clone(),
        user_id: message.user_id,
        timestamp: message.timestamp,
        created_at: message.created_at,
    }
}

fn db_to_message(db: DbChatMessage, artifacts: Vec<Artifact>, attachments: Vec<Attachment>) -> ChatMessage {
    ChatMessage {
        id: db.id,
        task_id: db.task_id,
        message: db.message,
        role: db.role,
        status: db.status,
        context_tags: parse_context_tags(&db.context_tags),
        reply_id: db.reply_id,
        source_websocket_id: db.source_websocket_id,
        user_id: db.user_id,
        timestamp: db.timestamp,
        created_at: db.created_at,
        artifacts,
        attachments,
    }
}

/// `None` fields are left untouched.
#[derive(AsChangeset)]
#[diesel(table_name = tasks)]
struct TaskWorkflowChanges {
    workflow_status: Option<WorkflowStatus>,
    stakwork_project_id: Option<i64>,
    workflow_started_at: Option<DateTime<Utc>>,
    workflow_completed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

/// Postgres-backed [`Store`]. Every call checks a connection out of the r2d2
/// pool on the blocking thread pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut PgConnection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| StoreError::Database(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e: tokio::task::JoinError| StoreError::Database(e.to_string()))?
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.run(|conn| {
            diesel::sql_query("SELECT 1").execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.run(move |conn| {
            Ok(users::table
                .find(id)
                .select(User::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    async fn find_user_by_github_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let username = username.to_string();
        self.run(move |conn| {
            Ok(users::table
                .filter(users::github_username.eq(username))
                .select(User::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        self.run(move |conn| {
            Ok(diesel::insert_into(users::table)
                .values(&user)
                .returning(User::as_returning())
                .get_result(conn)?)
        })
        .await
    }

    async fn find_workspace_by_slug(&self, slug: &str) -> Result<Option<Workspace>, StoreError> {
        let slug = slug.to_string();
        self.run(move |conn| {
            Ok(workspaces::table
                .filter(workspaces::slug.eq(slug))
                .filter(workspaces::deleted.eq(false))
                .select(Workspace::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    async fn get_workspace(&self, id: Uuid) -> Result<Option<Workspace>, StoreError> {
        self.run(move |conn| {
            Ok(workspaces::table
                .find(id)
                .filter(workspaces::deleted.eq(false))
                .select(Workspace::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    async fn insert_workspace(&self, workspace: Workspace) -> Result<Workspace, StoreError> {
        self.run(move |conn| {
            Ok(diesel::insert_into(workspaces::table)
                .values(&workspace)
                .returning(Workspace::as_returning())
                .get_result(conn)?)
        })
        .await
    }

    async fn update_workspace(&self, workspace: Workspace) -> Result<Workspace, StoreError> {
        self.run(move |conn| {
            Ok(diesel::update(workspaces::table.find(workspace.id))
                .set(&workspace)
                .returning(Workspace::as_returning())
                .get_result(conn)?)
        })
        .await
    }

    async fn list_workspaces_for_user(&self, user_id: Uuid) -> Result<Vec<(Workspace, WorkspaceRole)>, StoreError> {
        self.run(move |conn| {
            let owned: Vec<Workspace> = workspaces::table
                .filter(workspaces::owner_id.eq(user_id))
                .filter(workspaces::deleted.eq(false))
                .select(Workspace::as_select())
                .load(conn)?;

            let joined: Vec<(Workspace, WorkspaceRole)> = workspace_members::table
                .inner_join(workspaces::table)
                .filter(workspace_members::user_id.eq(user_id))
                .filter(workspace_members::left_at.is_null())
                .filter(workspaces::deleted.eq(false))
                .filter(workspaces::owner_id.ne(user_id))
                .select((Workspace::as_select(), workspace_members::role))
                .load(conn)?;

            let mut result: Vec<(Workspace, WorkspaceRole)> = owned
                .into_iter()
                .map(|w| (w, WorkspaceRole::Owner))
                .chain(joined)
                .collect();
            result.sort_by(|a, b| a.0.name.cmp(&b.0.name));
            Ok(result)
        })
        .await
    }

    async fn find_membership(&self, workspace_id: Uuid, user_id: Uuid) -> Result<Option<WorkspaceMember>, StoreError> {
        self.run(move |conn| {
            Ok(workspace_members::table
                .filter(workspace_members::workspace_id.eq(workspace_id))
                .filter(workspace_members::user_id.eq(user_id))
                .select(WorkspaceMember::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    async fn insert_member(&self, member: WorkspaceMember) -> Result<WorkspaceMember, StoreError> {
        self.run(move |conn| {
            Ok(diesel::insert_into(workspace_members::table)
                .values(&member)
                .returning(WorkspaceMember::as_returning())
                .get_result(conn)?)
        })
        .await
    }

    async fn update_member(&self, member: WorkspaceMember) -> Result<WorkspaceMember, StoreError> {
        self.run(move |conn| {
            Ok(diesel::update(workspace_members::table.find(member.id))
                .set(&member)
                .returning(WorkspaceMember::as_returning())
                .get_result(conn)?)
        })
        .await
    }

    async fn list_active_members(&self, workspace_id: Uuid) -> Result<Vec<(WorkspaceMember, User)>, StoreError> {
        self.run(move |conn| {
            Ok(workspace_members::table
                .inner_join(users::table)
                .filter(workspace_members::workspace_id.eq(workspace_id))
                .filter(workspace_members::left_at.is_null())
                .order(workspace_members::joined_at.asc())
                .select((WorkspaceMember::as_select(), User::as_select()))
                .load(conn)?)
        })
        .await
    }

    async fn find_swarm(&self, workspace_id: Uuid) -> Result<Option<Swarm>, StoreError> {
        self.run(move |conn| {
            Ok(swarms::table
                .filter(swarms::workspace_id.eq(workspace_id))
                .select(Swarm::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        self.run(move |conn| {
            Ok(tasks::table
                .find(id)
                .select(Task::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    async fn insert_task(&self, task: Task) -> Result<Task, StoreError> {
        self.run(move |conn| {
            Ok(diesel::insert_into(tasks::table)
                .values(&task)
                .returning(Task::as_returning())
                .get_result(conn)?)
        })
        .await
    }

    async fn update_task_workflow(&self, id: Uuid, update: WorkflowUpdate) -> Result<Option<Task>, StoreError> {
        self.run(move |conn| {
            let changes = TaskWorkflowChanges {
                workflow_status: update.workflow_status,
                stakwork_project_id: update.stakwork_project_id,
                workflow_started_at: update.workflow_started_at,
                workflow_completed_at: update.workflow_completed_at,
                updated_at: Utc::now(),
            };
            Ok(diesel::update(tasks::table.find(id))
                .set(&changes)
                .returning(Task::as_returning())
                .get_result(conn)
                .optional()?)
        })
        .await
    }

    async fn list_tasks(&self, workspace_id: Uuid) -> Result<Vec<Task>, StoreError> {
        self.run(move |conn| {
            Ok(tasks::table
                .filter(tasks::workspace_id.eq(workspace_id))
                .filter(tasks::deleted.eq(false))
                .order(tasks::created_at.desc())
                .select(Task::as_select())
                .load(conn)?)
        })
        .await
    }

    async fn insert_chat_message(&self, message: ChatMessage) -> Result<ChatMessage, StoreError> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                diesel::insert_into(chat_messages::table)
                    .values(&message_to_db(&message))
                    .execute(conn)?;
                if !message.artifacts.is_empty() {
                    diesel::insert_into(artifacts::table)
                        .values(&message.artifacts)
                        .execute(conn)?;
                }
                if !message.attachments.is_empty() {
                    diesel::insert_into(attachments::table)
                        .values(&message.attachments)
                        .execute(conn)?;
                }
                Ok(())
            })?;
            Ok(message)
        })
        .await
    }

    async fn list_chat_messages(&self, task_id: Uuid) -> Result<Vec<ChatMessage>, StoreError> {
        self.run(move |conn| {
            let rows: Vec<DbChatMessage> = chat_messages::table
                .filter(chat_messages::task_id.eq(task_id))
                .order(chat_messages::timestamp.asc())
                .select(DbChatMessage::as_select())
                .load(conn)?;
            let ids: Vec<Uuid> = rows.iter().map(|m| m.id).collect();

            let mut artifacts_by_message: HashMap<Uuid, Vec<Artifact>> = HashMap::new();
            for artifact in artifacts::table
                .filter(artifacts::message_id.eq_any(&ids))
                .order(artifacts::created_at.asc())
                .select(Artifact::as_select())
                .load(conn)?
            {
                artifacts_by_message
                    .entry(artifact.message_id)
                    .or_default()
                    .push(artifact);
            }

            let mut attachments_by_message: HashMap<Uuid, Vec<Attachment>> = HashMap::new();
            for attachment in attachments::table
                .filter(attachments::message_id.eq_any(&ids))
                .order(attachments::created_at.asc())
                .select(Attachment::as_select())
                .load(conn)?
            {
                attachments_by_message
                    .entry(attachment.message_id)
                    .or_default()
                    .push(attachment);
            }

            Ok(rows
                .into_iter()
                .map(|row| {
                    let artifacts = artifacts_by_message.remove(&row.id).unwrap_or_default();
                    let attachments = attachments_by_message.remove(&row.id).unwrap_or_default();
                    db_to_message(row, artifacts, attachments)
                })
                .collect())
        })
        .await
    }

    async fn get_janitor_config(&self, workspace_id: Uuid) -> Result<Option<JanitorConfig>, StoreError> {
        self.run(move |conn| {
            Ok(janitor_configs::table
                .filter(janitor_configs::workspace_id.eq(workspace_id))
                .select(JanitorConfig::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    async fn ensure_janitor_config(&self, workspace_id: Uuid) -> Result<JanitorConfig, StoreError> {
        self.run(move |conn| {
            diesel::insert_into(janitor_configs::table)
                .values(&JanitorConfig::new(workspace_id))
                .on_conflict(janitor_configs::workspace_id)
                .do_nothing()
                .execute(conn)?;
            Ok(janitor_configs::table
                .filter(janitor_configs::workspace_id.eq(workspace_id))
                .select(JanitorConfig::as_select())
                .first(conn)?)
        })
        .await
    }

    async fn update_janitor_config(&self, config: JanitorConfig) -> Result<JanitorConfig, StoreError> {
        self.run(move |conn| {
            Ok(diesel::update(janitor_configs::table.find(config.id))
                .set(&config)
                .returning(JanitorConfig::as_returning())
                .get_result(conn)?)
        })
        .await
    }

    async fn create_janitor_run_if_idle(&self, run: JanitorRun) -> Result<JanitorRun, StoreError> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                // Serializes admissions for the same config.
                janitor_configs::table
                    .find(run.janitor_config_id)
                    .select(janitor_configs::id)
                    .for_update()
                    .first::<Uuid>(conn)?;

                let in_flight: i64 = janitor_runs::table
                    .filter(janitor_runs::janitor_config_id.eq(run.janitor_config_id))
                    .filter(janitor_runs::janitor_type.eq(run.janitor_type))
                    .filter(janitor_runs::status.eq_any(vec![JanitorStatus::Pending, JanitorStatus::Running]))
                    .count()
                    .get_result(conn)?;
                if in_flight > 0 {
                    return Err(in_flight_conflict(run.janitor_type));
                }

                Ok(diesel::insert_into(janitor_runs::table)
                    .values(&run)
                    .returning(JanitorRun::as_returning())
                    .get_result(conn)?)
            })
        })
        .await
    }

    async fn update_janitor_run(&self, run: JanitorRun) -> Result<JanitorRun, StoreError> {
        self.run(move |conn| {
            Ok(diesel::update(janitor_runs::table.find(run.id))
                .set(&run)
                .returning(JanitorRun::as_returning())
                .get_result(conn)?)
        })
        .await
    }

    async fn find_janitor_run_by_project_id(&self, project_id: i64) -> Result<Option<JanitorRun>, StoreError> {
        self.run(move |conn| {
            Ok(janitor_runs::table
                .filter(janitor_runs::stakwork_project_id.eq(project_id))
                .select(JanitorRun::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    async fn list_janitor_runs(&self, janitor_config_id: Uuid, filter: RunFilter) -> Result<Vec<JanitorRun>, StoreError> {
        self.run(move |conn| {
            let mut query = janitor_runs::table
                .filter(janitor_runs::janitor_config_id.eq(janitor_config_id))
                .into_boxed();
            if let Some(janitor_type) = filter.janitor_type {
                query = query.filter(janitor_runs::janitor_type.eq(janitor_type));
            }
            if let Some(status) = filter.status {
                query = query.filter(janitor_runs::status.eq(status));
            }
            Ok(query
                .order(janitor_runs::created_at.desc())
                .limit(filter.limit)
                .select(JanitorRun::as_select())
                .load(conn)?)
        })
        .await
    }

    async fn start_janitor_run(&self, run_id: Uuid) -> Result<JanitorRun, StoreError> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                let current = lock_in_flight_run(conn, run_id)?;
                let now = Utc::now();
                Ok(diesel::update(janitor_runs::table.find(run_id))
                    .set((
                        janitor_runs::status.eq(JanitorStatus::Running),
                        janitor_runs::started_at.eq(current.started_at.or(Some(now))),
                        janitor_runs::updated_at.eq(now),
                    ))
                    .returning(JanitorRun::as_returning())
                    .get_result(conn)?)
            })
        })
        .await
    }

    async fn complete_janitor_run(
        &self,
        run_id: Uuid,
        recommendations: Vec<JanitorRecommendation>,
    ) -> Result<JanitorRun, StoreError> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                lock_in_flight_run(conn, run_id)?;
                if !recommendations.is_empty() {
                    diesel::insert_into(janitor_recommendations::table)
                        .values(&recommendations)
                        .execute(conn)?;
                }
                let now = Utc::now();
                Ok(diesel::update(janitor_runs::table.find(run_id))
                    .set((
                        janitor_runs::status.eq(JanitorStatus::Completed),
                        janitor_runs::completed_at.eq(Some(now)),
                        janitor_runs::updated_at.eq(now),
                    ))
                    .returning(JanitorRun::as_returning())
                    .get_result(conn)?)
            })
        })
        .await
    }

    async fn fail_janitor_run(&self, run_id: Uuid, error: Option<String>) -> Result<JanitorRun, StoreError> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                lock_in_flight_run(conn, run_id)?;
                let now = Utc::now();
                Ok(diesel::update(janitor_runs::table.find(run_id))
                    .set((
                        janitor_runs::status.eq(JanitorStatus::Failed),
                        janitor_runs::error.eq(error),
                        janitor_runs::completed_at.eq(Some(now)),
                        janitor_runs::updated_at.eq(now),
                    ))
                    .returning(JanitorRun::as_returning())
                    .get_result(conn)?)
            })
        })
        .await
    }

    async fn find_recommendation(&self, id: Uuid) -> Result<Option<(JanitorRecommendation, Uuid)>, StoreError> {
        self.run(move |conn| {
            Ok(janitor_recommendations::table
                .inner_join(janitor_runs::table.inner_join(janitor_configs::table))
                .filter(janitor_recommendations::id.eq(id))
                .select((JanitorRecommendation::as_select(), janitor_configs::workspace_id))
                .first(conn)
                .optional()?)
        })
        .await
    }

    async fn list_recommendations(
        &self,
        workspace_id: Uuid,
        filter: RecommendationFilter,
    ) -> Result<Vec<JanitorRecommendation>, StoreError> {
        self.run(move |conn| {
            let mut query = janitor_recommendations::table
                .inner_join(janitor_runs::table.inner_join(janitor_configs::table))
                .filter(janitor_configs::workspace_id.eq(workspace_id))
                .select(JanitorRecommendation::as_select())
                .into_boxed();
            if let Some(status) = filter.status {
                query = query.filter(janitor_recommendations::status.eq(status));
            }
            if let Some(priority) = filter.priority {
                query = query.filter(janitor_recommendations::priority.eq(priority));
            }
            Ok(query
                .order((
                    diesel::dsl::sql::<Integer>(PRIORITY_RANK_SQL).desc(),
                    janitor_recommendations::created_at.desc(),
                ))
                .limit(filter.limit)
                .load(conn)?)
        })
        .await
    }

    async fn accept_recommendation(
        &self,
        id: Uuid,
        accepted_by: Uuid,
        task: Task,
    ) -> Result<(JanitorRecommendation, Task), StoreError> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                let current: JanitorRecommendation = janitor_recommendations::table
                    .find(id)
                    .select(JanitorRecommendation::as_select())
                    .for_update()
                    .first(conn)
                    .optional()?
                    .ok_or_else(|| StoreError::NotFound(format!("recommendation {id}")))?;
                if current.status != RecommendationStatus::Pending {
                    return Err(StoreError::Conflict(NOT_PENDING.to_string()));
                }

                let recommendation = diesel::update(janitor_recommendations::table.find(id))
                    .set((
                        janitor_recommendations::status.eq(RecommendationStatus::Accepted),
                        janitor_recommendations::accepted_at.eq(Some(Utc::now())),
                        janitor_recommendations::accepted_by_id.eq(Some(accepted_by)),
                    ))
                    .returning(JanitorRecommendation::as_returning())
                    .get_result(conn)?;
                let task = diesel::insert_into(tasks::table)
                    .values(&task)
                    .returning(Task::as_returning())
                    .get_result(conn)?;
                Ok((recommendation, task))
            })
        })
        .await
    }

    async fn dismiss_recommendation(
        &self,
        id: Uuid,
        dismissed_by: Uuid,
        reason: Option<String>,
    ) -> Result<JanitorRecommendation, StoreError> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                let current: JanitorRecommendation = janitor_recommendations::table
                    .find(id)
                    .select(JanitorRecommendation::as_select())
                    .for_update()
                    .first(conn)
                    .optional()?
                    .ok_or_else(|| StoreError::NotFound(format!("recommendation {id}")))?;
                if current.status != RecommendationStatus::Pending {
                    return Err(StoreError::Conflict(NOT_PENDING.to_string()));
                }

                Ok(diesel::update(janitor_recommendations::table.find(id))
                    .set((
                        janitor_recommendations::status.eq(RecommendationStatus::Dismissed),
                        janitor_recommendations::dismissed_at.eq(Some(Utc::now())),
                        janitor_recommendations::dismissed_by_id.eq(Some(dismissed_by)),
                        janitor_recommendations::metadata
                            .eq(dismissal_metadata(current.metadata, reason)),
                    ))
                    .returning(JanitorRecommendation::as_returning())
                    .get_result(conn)?)
            })
        })
        .await
    }
}

/// Locks the run row and fails with `Conflict` once the run has finished.
fn lock_in_flight_run(conn: &mut PgConnection, run_id: Uuid) -> Result<JanitorRun, StoreError> {
    let run: JanitorRun = janitor_runs::table
        .find(run_id)
        .select(JanitorRun::as_select())
        .for_update()
        .first(conn)
        .optional()?
        .ok_or_else(|| StoreError::NotFound(format!("janitor run {run_id}")))?;
    if !run.status.is_in_flight() {
        return Err(StoreError::Conflict(RUN_FINISHED.to_string()));
    }
    Ok(run)
}
