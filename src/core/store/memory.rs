use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    dismissal_metadata, in_flight_conflict, RecommendationFilter, RunFilter, Store, StoreError,
    NOT_PENDING, RUN_FINISHED,
};
use crate::core::shared::enums::{JanitorStatus, RecommendationStatus, WorkspaceRole};
use crate::core::shared::models::{
    ChatMessage, JanitorConfig, JanitorRecommendation, JanitorRun, Swarm, Task, User, Workspace,
    WorkspaceMember, WorkflowUpdate,
};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    workspaces: HashMap<Uuid, Workspace>,
    members: HashMap<Uuid, WorkspaceMember>,
    swarms: HashMap<Uuid, Swarm>,
    tasks: HashMap<Uuid, Task>,
    messages: HashMap<Uuid, ChatMessage>,
    janitor_configs: HashMap<Uuid, JanitorConfig>,
    janitor_runs: HashMap<Uuid, JanitorRun>,
    recommendations: HashMap<Uuid, JanitorRecommendation>,
}

impl Tables {
    fn live_slug_taken(&self, slug: &str, except: Option<Uuid>) -> bool {
        self.workspaces
            .values()
            .any(|w| !w.deleted && w.slug == slug && Some(w.id) != except)
    }

    fn in_flight_run_mut(&mut self, run_id: Uuid) -> Result<&mut JanitorRun, StoreError> {
        let run = self
            .janitor_runs
            .get_mut(&run_id)
            .ok_or_else(|| StoreError::NotFound(format!("janitor run {run_id}")))?;
        if !run.status.is_in_flight() {
            return Err(StoreError::Conflict(RUN_FINISHED.to_string()));
        }
        Ok(run)
    }

    fn workspace_of_run(&self, run_id: Uuid) -> Option<Uuid> {
        let run = self.janitor_runs.get(&run_id)?;
        self.janitor_configs
            .get(&run.janitor_config_id)
            .map(|c| c.workspace_id)
    }
}

/// In-process [`Store`]. A single lock guards all tables so every trait
/// method is atomic with respect to the others.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_swarm(&self, swarm: Swarm) -> Swarm {
        let mut tables = self.tables.write().await;
        tables.swarms.insert(swarm.workspace_id, swarm.clone());
        swarm
    }

    pub async fn insert_janitor_run(&self, run: JanitorRun) -> JanitorRun {
        let mut tables = self.tables.write().await;
        tables.janitor_runs.insert(run.id, run.clone());
        run
    }

    pub async fn insert_recommendation(&self, recommendation: JanitorRecommendation) -> JanitorRecommendation {
        let mut tables = self.tables.write().await;
        tables
            .recommendations
            .insert(recommendation.id, recommendation.clone());
        recommendation
    }

    pub async fn get_janitor_run(&self, id: Uuid) -> Option<JanitorRun> {
        self.tables.read().await.janitor_runs.get(&id).cloned()
    }

    pub async fn tasks_for_workspace(&self, workspace_id: Uuid) -> Vec<Task> {
        let tables = self.tables.read().await;
        tables
            .tasks
            .values()
            .filter(|t| t.workspace_id == workspace_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_github_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.github_username.as_deref() == Some(username))
            .cloned())
    }

    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(username) = user.github_username.as_deref() {
            if tables
                .users
                .values()
                .any(|u| u.github_username.as_deref() == Some(username))
            {
                return Err(StoreError::UniqueViolation("users_github_username_key".to_string()));
            }
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_workspace_by_slug(&self, slug: &str) -> Result<Option<Workspace>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .workspaces
            .values()
            .find(|w| !w.deleted && w.slug == slug)
            .cloned())
    }

    async fn get_workspace(&self, id: Uuid) -> Result<Option<Workspace>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.workspaces.get(&id).filter(|w| !w.deleted).cloned())
    }

    async fn insert_workspace(&self, workspace: Workspace) -> Result<Workspace, StoreError> {
        let mut tables = self.tables.write().await;
        if !workspace.deleted && tables.live_slug_taken(&workspace.slug, None) {
            return Err(StoreError::UniqueViolation("workspaces_live_slug_key".to_string()));
        }
        tables.workspaces.insert(workspace.id, workspace.clone());
        Ok(workspace)
    }

    async fn update_workspace(&self, workspace: Workspace) -> Result<Workspace, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.workspaces.contains_key(&workspace.id) {
            return Err(StoreError::NotFound(format!("workspace {}", workspace.id)));
        }
        if !workspace.deleted && tables.live_slug_taken(&workspace.slug, Some(workspace.id)) {
            return Err(StoreError::UniqueViolation("workspaces_live_slug_key".to_string()));
        }
        tables.workspaces.insert(workspace.id, workspace.clone());
        Ok(workspace)
    }

    async fn list_workspaces_for_user(&self, user_id: Uuid) -> Result<Vec<(Workspace, WorkspaceRole)>, StoreError> {
        let tables = self.tables.read().await;
        let mut result: Vec<(Workspace, WorkspaceRole)> = tables
            .workspaces
            .values()
            .filter(|w| !w.deleted)
            .filter_map(|w| {
                if w.owner_id == user_id {
                    return Some((w.clone(), WorkspaceRole::Owner));
                }
                tables
                    .members
                    .values()
                    .find(|m| m.workspace_id == w.id && m.user_id == user_id && m.is_active())
                    .map(|m| (w.clone(), m.role))
            })
            .collect();
        result.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        Ok(result)
    }

    async fn find_membership(&self, workspace_id: Uuid, user_id: Uuid) -> Result<Option<WorkspaceMember>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .members
            .values()
            .find(|m| m.workspace_id == workspace_id && m.user_id == user_id)
            .cloned())
    }

    async fn insert_member(&self, member: WorkspaceMember) -> Result<WorkspaceMember, StoreError> {
        let mut tables = self.tables.write().await;
        if tables
            .members
            .values()
            .any(|m| m.workspace_id == member.workspace_id && m.user_id == member.user_id)
        {
            return Err(StoreError::UniqueViolation(
                "workspace_members_workspace_user_key".to_string(),
            ));
        }
        tables.members.insert(member.id, member.clone());
        Ok(member)
    }

    async fn update_member(&self, member: WorkspaceMember) -> Result<WorkspaceMember, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.members.get_mut(&member.id) {
            Some(existing) => {
                *existing = member.clone();
                Ok(member)
            }
            None => Err(StoreError::NotFound(format!("workspace member {}", member.id))),
        }
    }

    async fn list_active_members(&self, workspace_id: Uuid) -> Result<Vec<(WorkspaceMember, User)>, StoreError> {
        let tables = self.tables.read().await;
        let mut members: Vec<(WorkspaceMember, User)> = tables
            .members
            .values()
            .filter(|m| m.workspace_id == workspace_id && m.is_active())
            .filter_map(|m| tables.users.get(&m.user_id).map(|u| (m.clone(), u.clone())))
            .collect();
        members.sort_by_key(|(m, _)| m.joined_at);
        Ok(members)
    }

    async fn find_swarm(&self, workspace_id: Uuid) -> Result<Option<Swarm>, StoreError> {
        Ok(self.tables.read().await.swarms.get(&workspace_id).cloned())
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(self.tables.read().await.tasks.get(&id).cloned())
    }

    async fn insert_task(&self, task: Task) -> Result<Task, StoreError> {
        let mut tables = self.tables.write().await;
        tables.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn update_task_workflow(&self, id: Uuid, update: WorkflowUpdate) -> Result<Option<Task>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(task) = tables.tasks.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(status) = update.workflow_status {
            task.workflow_status = Some(status);
        }
        if let Some(project_id) = update.stakwork_project_id {
            task.stakwork_project_id = Some(project_id);
        }
        if let Some(started) = update.workflow_started_at {
            task.workflow_started_at = Some(started);
        }
        if let Some(completed) = update.workflow_completed_at {
            task.workflow_completed_at = Some(completed);
        }
        task.updated_at = Utc::now();
        Ok(Some(task.clone()))
    }

    async fn list_tasks(&self, workspace_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let tables = self.tables.read().await;
        let mut tasks: Vec<Task> = tables
            .tasks
            .values()
            .filter(|t| t.workspace_id == workspace_id && !t.deleted)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn insert_chat_message(&self, message: ChatMessage) -> Result<ChatMessage, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.tasks.contains_key(&message.task_id) {
            return Err(StoreError::Database(format!(
                "chat_messages.task_id references missing task {}",
                message.task_id
            )));
        }
        tables.messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn list_chat_messages(&self, task_id: Uuid) -> Result<Vec<ChatMessage>, StoreError> {
        let tables = self.tables.read().await;
        let mut messages: Vec<ChatMessage> = tables
            .messages
            .values()
            .filter(|m| m.task_id == task_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }

    async fn get_janitor_config(&self, workspace_id: Uuid) -> Result<Option<JanitorConfig>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .janitor_configs
            .values()
            .find(|c| c.workspace_id == workspace_id)
            .cloned())
    }

    async fn ensure_janitor_config(&self, workspace_id: Uuid) -> Result<JanitorConfig, StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .janitor_configs
            .values()
            .find(|c| c.workspace_id == workspace_id)
        {
            return Ok(existing.clone());
        }
        let config = JanitorConfig::new(workspace_id);
        tables.janitor_configs.insert(config.id, config.clone());
        Ok(config)
    }

    async fn update_janitor_config(&self, config: JanitorConfig) -> Result<JanitorConfig, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.janitor_configs.get_mut(&config.id) {
            Some(existing) => {
                *existing = config.clone();
                Ok(config)
            }
            None => Err(StoreError::NotFound(format!("janitor config {}", config.id))),
        }
    }

    async fn create_janitor_run_if_idle(&self, run: JanitorRun) -> Result<JanitorRun, StoreError> {
        let mut tables = self.tables.write().await;
        let busy = tables.janitor_runs.values().any(|r| {
            r.janitor_config_id == run.janitor_config_id
                && r.janitor_type == run.janitor_type
                && r.status.is_in_flight()
        });
        if busy {
            return Err(in_flight_conflict(run.janitor_type));
        }
        tables.janitor_runs.insert(run.id, run.clone());
        Ok(run)
    }

    async fn update_janitor_run(&self, run: JanitorRun) -> Result<JanitorRun, StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(project_id) = run.stakwork_project_id {
            if tables
                .janitor_runs
                .values()
                .any(|r| r.id != run.id && r.stakwork_project_id == Some(project_id))
            {
                return Err(StoreError::UniqueViolation(
                    "janitor_runs_stakwork_project_id_key".to_string(),
                ));
            }
        }
        match tables.janitor_runs.get_mut(&run.id) {
            Some(existing) => {
                *existing = run.clone();
                Ok(run)
            }
            None => Err(StoreError::NotFound(format!("janitor run {}", run.id))),
        }
    }

    async fn find_janitor_run_by_project_id(&self, project_id: i64) -> Result<Option<JanitorRun>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .janitor_runs
            .values()
            .find(|r| r.stakwork_project_id == Some(project_id))
            .cloned())
    }

    async fn list_janitor_runs(&self, janitor_config_id: Uuid, filter: RunFilter) -> Result<Vec<JanitorRun>, StoreError> {
        let tables = self.tables.read().await;
        let mut runs: Vec<JanitorRun> = tables
            .janitor_runs
            .values()
            .filter(|r| r.janitor_config_id == janitor_config_id)
            .filter(|r| filter.janitor_type.map_or(true, |t| r.janitor_type == t))
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        runs.truncate(filter.limit.max(0) as usize);
        Ok(runs)
    }

    async fn start_janitor_run(&self, run_id: Uuid) -> Result<JanitorRun, StoreError> {
        let mut tables = self.tables.write().await;
        let run = tables.in_flight_run_mut(run_id)?;
        let now = Utc::now();
        run.status = JanitorStatus::Running;
        run.started_at = run.started_at.or(Some(now));
        run.updated_at = now;
        Ok(run.clone())
    }

    async fn complete_janitor_run(
        &self,
        run_id: Uuid,
        recommendations: Vec<JanitorRecommendation>,
    ) -> Result<JanitorRun, StoreError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let run = {
            let run = tables.in_flight_run_mut(run_id)?;
            run.status = JanitorStatus::Completed;
            run.completed_at = Some(now);
            run.updated_at = now;
            run.clone()
        };
        for recommendation in recommendations {
            tables
                .recommendations
                .insert(recommendation.id, recommendation);
        }
        Ok(run)
    }

    async fn fail_janitor_run(&self, run_id: Uuid, error: Option<String>) -> Result<JanitorRun, StoreError> {
        let mut tables = self.tables.write().await;
        let run = tables.in_flight_run_mut(run_id)?;
        let now = Utc::now();
        run.status = JanitorStatus::Failed;
        run.error = error;
        run.completed_at = Some(now);
        run.updated_at = now;
        Ok(run.clone())
    }

    async fn find_recommendation(&self, id: Uuid) -> Result<Option<(JanitorRecommendation, Uuid)>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.recommendations.get(&id).and_then(|r| {
            tables
                .workspace_of_run(r.janitor_run_id)
                .map(|workspace_id| (r.clone(), workspace_id))
        }))
    }

    async fn list_recommendations(
        &self,
        workspace_id: Uuid,
        filter: RecommendationFilter,
    ) -> Result<Vec<JanitorRecommendation>, StoreError> {
        let tables = self.tables.read().await;
        let mut recommendations: Vec<JanitorRecommendation> = tables
            .recommendations
            .values()
            .filter(|r| tables.workspace_of_run(r.janitor_run_id) == Some(workspace_id))
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .filter(|r| filter.priority.map_or(true, |p| r.priority == p))
            .cloned()
            .collect();
        recommendations.sort_by(|a, b| {
            b.priority
                .rank()
                .cmp(&a.priority.rank())
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        recommendations.truncate(filter.limit.max(0) as usize);
        Ok(recommendations)
    }

    async fn accept_recommendation(
        &self,
        id: Uuid,
        accepted_by: Uuid,
        task: Task,
    ) -> Result<(JanitorRecommendation, Task), StoreError> {
        let mut tables = self.tables.write().await;
        let recommendation = {
            let Some(recommendation) = tables.recommendations.get_mut(&id) else {
                return Err(StoreError::NotFound(format!("recommendation {id}")));
            };
            if recommendation.status != RecommendationStatus::Pending {
                return Err(StoreError::Conflict(NOT_PENDING.to_string()));
            }
            recommendation.status = RecommendationStatus::Accepted;
            recommendation.accepted_at = Some(Utc::now());
            recommendation.accepted_by_id = Some(accepted_by);
            recommendation.clone()
        };
        tables.tasks.insert(task.id, task.clone());
        Ok((recommendation, task))
    }

    async fn dismiss_recommendation(
        &self,
        id: Uuid,
        dismissed_by: Uuid,
        reason: Option<String>,
    ) -> Result<JanitorRecommendation, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(recommendation) = tables.recommendations.get_mut(&id) else {
            return Err(StoreError::NotFound(format!("recommendation {id}")));
        };
        if recommendation.status != RecommendationStatus::Pending {
            return Err(StoreError::Conflict(NOT_PENDING.to_string()));
        }
        recommendation.status = RecommendationStatus::Dismissed;
        recommendation.dismissed_at = Some(Utc::now());
        recommendation.dismissed_by_id = Some(dismissed_by);
        recommendation.metadata = dismissal_metadata(recommendation.metadata.take(), reason);
        Ok(recommendation.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::enums::{JanitorTrigger, JanitorType, Priority};

    fn workspace(slug: &str, owner_id: Uuid) -> Workspace {
        let now = Utc::now();
        Workspace {
            id: Uuid::new_v4(),
            name: slug.to_string(),
            description: None,
            slug: slug.to_string(),
            owner_id,
            deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_live_slug_is_unique_but_deleted_slug_is_reusable() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let first = store
            .insert_workspace(workspace("acme", owner))
            .await
            .expect("first insert");

        let duplicate = store.insert_workspace(workspace("acme", owner)).await;
        assert!(matches!(duplicate, Err(StoreError::UniqueViolation(_))));

        let mut deleted = first.clone();
        deleted.deleted = true;
        deleted.deleted_at = Some(Utc::now());
        store.update_workspace(deleted).await.expect("soft delete");

        assert!(store.insert_workspace(workspace("acme", owner)).await.is_ok());
        assert!(store
            .get_workspace(first.id)
            .await
            .expect("lookup")
            .is_none());
    }

    #[tokio::test]
    async fn test_run_admission_rejects_in_flight_type() {
        let store = MemoryStore::new();
        let config = store
            .ensure_janitor_config(Uuid::new_v4())
            .await
            .expect("config");

        let first = JanitorRun::new(config.id, JanitorType::UnitTests, JanitorTrigger::Manual);
        store
            .create_janitor_run_if_idle(first.clone())
            .await
            .expect("first run admitted");

        let second = JanitorRun::new(config.id, JanitorType::UnitTests, JanitorTrigger::Manual);
        match store.create_janitor_run_if_idle(second).await {
            Err(StoreError::Conflict(msg)) => assert!(msg.contains("already in progress")),
            other => panic!("expected conflict, got {other:?}"),
        }

        let other_type = JanitorRun::new(config.id, JanitorType::IntegrationTests, JanitorTrigger::Manual);
        assert!(store.create_janitor_run_if_idle(other_type).await.is_ok());

        let mut done = first;
        done.status = JanitorStatus::Completed;
        store.update_janitor_run(done).await.expect("complete");
        let third = JanitorRun::new(config.id, JanitorType::UnitTests, JanitorTrigger::Manual);
        assert!(store.create_janitor_run_if_idle(third).await.is_ok());
    }

    #[tokio::test]
    async fn test_accept_twice_is_a_conflict() {
        let store = MemoryStore::new();
        let workspace_id = Uuid::new_v4();
        let config = store.ensure_janitor_config(workspace_id).await.expect("config");
        let run = store
            .insert_janitor_run(JanitorRun::new(config.id, JanitorType::UnitTests, JanitorTrigger::Manual))
            .await;
        let recommendation = store
            .insert_recommendation(JanitorRecommendation {
                id: Uuid::new_v4(),
                janitor_run_id: run.id,
                title: "Cover parser".to_string(),
                description: "Add tests".to_string(),
                priority: Priority::High,
                impact: None,
                status: RecommendationStatus::Pending,
                accepted_at: None,
                accepted_by_id: None,
                dismissed_at: None,
                dismissed_by_id: None,
                metadata: None,
                created_at: Utc::now(),
            })
            .await;

        let user = Uuid::new_v4();
        let task = Task::new(workspace_id, recommendation.title.clone(), user);
        store
            .accept_recommendation(recommendation.id, user, task)
            .await
            .expect("first accept");

        let again = Task::new(workspace_id, recommendation.title.clone(), user);
        let result = store.accept_recommendation(recommendation.id, user, again).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert_eq!(store.tasks_for_workspace(workspace_id).await.len(), 1);
    }
}
