//! Janitor configuration, run lifecycle and the recommendation state machine.
//!
//! Runs go PENDING -> RUNNING -> COMPLETED | FAILED, driven by the trigger and
//! by the engine's webhook. Recommendations go PENDING -> ACCEPTED | DISMISSED
//! exactly once.

use chrono::Utc;
use log::{info, warn};
use std::sync::Arc;
use uuid::Uuid;

use super::error::JanitorError;
use super::types::{JanitorWebhookPayload, RecommendationInput, UpdateJanitorConfigRequest};
use crate::core::shared::enums::{
    JanitorStatus, JanitorTrigger, JanitorType, Priority, RecommendationStatus, TaskSourceType,
};
use crate::core::shared::models::{JanitorConfig, JanitorRecommendation, JanitorRun, Task};
use crate::core::store::{RecommendationFilter, RunFilter, Store, StoreError};
use crate::stakwork::DispatchOutcome;
use crate::workspaces::{
    require_access, resolve_workspace_access_by_id, Capability, WorkspaceAccess, WorkspaceError,
};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;
const NO_PROJECT_ID: &str = "No project id returned";

pub fn parse_janitor_type(raw: &str) -> Result<JanitorType, JanitorError> {
    raw.parse()
        .map_err(|_| JanitorError::InvalidType(raw.to_string()))
}

/// What the webhook did with a run.
#[derive(Debug, Clone)]
pub enum WebhookEffect {
    Updated(JanitorRun),
    /// The run had already finished; redeliveries change nothing.
    AlreadyFinished(JanitorRun),
}

pub struct JanitorService {
    store: Arc<dyn Store>,
}

impl JanitorService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn access(&self, slug: &str, user_id: Uuid, capability: Capability) -> Result<WorkspaceAccess, JanitorError> {
        Ok(require_access(self.store.as_ref(), slug, user_id, capability).await?)
    }

    pub async fn get_config(&self, slug: &str, user_id: Uuid) -> Result<JanitorConfig, JanitorError> {
        let access = self.access(slug, user_id, Capability::Read).await?;
        Ok(self.store.ensure_janitor_config(access.workspace.id).await?)
    }

    pub async fn update_config(
        &self,
        slug: &str,
        user_id: Uuid,
        req: &UpdateJanitorConfigRequest,
    ) -> Result<JanitorConfig, JanitorError> {
        let access = self.access(slug, user_id, Capability::Admin).await?;
        let mut config = self.store.ensure_janitor_config(access.workspace.id).await?;
        req.apply(&mut config);
        config.updated_at = Utc::now();
        let config = self.store.update_janitor_config(config).await?;
        info!("Updated janitor config for workspace {}", access.workspace.slug);
        Ok(config)
    }

    /// Admits a new PENDING run. Returns the run with the workspace access so
    /// the caller can dispatch it.
    pub async fn trigger_run(
        &self,
        slug: &str,
        raw_type: &str,
        user_id: Uuid,
    ) -> Result<(JanitorRun, WorkspaceAccess), JanitorError> {
        let access = self.access(slug, user_id, Capability::Write).await?;
        let janitor_type = parse_janitor_type(raw_type)?;
        let config = self.store.ensure_janitor_config(access.workspace.id).await?;
        if !config.is_enabled(janitor_type) {
            return Err(JanitorError::NotEnabled(janitor_type.label()));
        }

        let run = JanitorRun::new(config.id, janitor_type, JanitorTrigger::Manual);
        let run = match self.store.create_janitor_run_if_idle(run).await {
            Ok(run) => run,
            Err(StoreError::Conflict(msg)) => return Err(JanitorError::RunInProgress(msg)),
            Err(e) => return Err(e.into()),
        };
        info!(
            "Queued {} janitor run {} for workspace {}",
            janitor_type, run.id, access.workspace.slug
        );
        Ok((run, access))
    }

    /// Folds the engine's answer to a dispatched run into the run row. A run
    /// that cannot be tracked by project id is failed so it never blocks the
    /// next trigger.
    pub async fn record_dispatch(&self, mut run: JanitorRun, outcome: &DispatchOutcome) -> Result<JanitorRun, JanitorError> {
        let project_id = match outcome {
            DispatchOutcome::Success { .. } => match outcome.project_id() {
                Some(project_id) => project_id,
                None => return self.fail_dispatch(run, NO_PROJECT_ID).await,
            },
            DispatchOutcome::Failure { error } => return self.fail_dispatch(run, error).await,
        };

        let now = Utc::now();
        run.status = JanitorStatus::Running;
        run.started_at = Some(now);
        run.stakwork_project_id = Some(project_id);
        run.updated_at = now;
        let run_id = run.id;
        match self.store.update_janitor_run(run).await {
            Ok(run) => Ok(run),
            Err(e) => {
                warn!("Could not record project {project_id} for janitor run {run_id}: {e}");
                self.store
                    .fail_janitor_run(run_id, Some(format!("Failed to record dispatch: {e}")))
                    .await?;
                Err(e.into())
            }
        }
    }

    async fn fail_dispatch(&self, run: JanitorRun, error: &str) -> Result<JanitorRun, JanitorError> {
        warn!("Janitor run {} dispatch failed: {error}", run.id);
        Ok(self.store.fail_janitor_run(run.id, Some(error.to_string())).await?)
    }

    pub async fn list_runs(
        &self,
        slug: &str,
        user_id: Uuid,
        filter: RunFilter,
    ) -> Result<Vec<JanitorRun>, JanitorError> {
        let access = self.access(slug, user_id, Capability::Read).await?;
        let config = self.store.ensure_janitor_config(access.workspace.id).await?;
        Ok(self.store.list_janitor_runs(config.id, filter).await?)
    }

    pub async fn list_recommendations(
        &self,
        slug: &str,
        user_id: Uuid,
        filter: RecommendationFilter,
    ) -> Result<Vec<JanitorRecommendation>, JanitorError> {
        let access = self.access(slug, user_id, Capability::Read).await?;
        Ok(self
            .store
            .list_recommendations(access.workspace.id, filter)
            .await?)
    }

    /// Write access on the recommendation's workspace, resolved by id.
    async fn load_recommendation(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<(JanitorRecommendation, WorkspaceAccess), JanitorError> {
        let (recommendation, workspace_id) = self
            .store
            .find_recommendation(id)
            .await?
            .ok_or(JanitorError::RecommendationNotFound)?;
        let access = resolve_workspace_access_by_id(self.store.as_ref(), workspace_id, user_id)
            .await?
            .ok_or(JanitorError::RecommendationNotFound)?;
        if !access.allows(Capability::Write) {
            return Err(WorkspaceError::AccessDenied.into());
        }
        Ok((recommendation, access))
    }

    pub async fn accept_recommendation(
        &self,
        id: Uuid,
        user_id: Uuid,
        assignee_id: Option<Uuid>,
    ) -> Result<(JanitorRecommendation, Task), JanitorError> {
        let (recommendation, access) = self.load_recommendation(id, user_id).await?;
        if recommendation.status != RecommendationStatus::Pending {
            return Err(JanitorError::NotPending);
        }
        if let Some(assignee_id) = assignee_id {
            if resolve_workspace_access_by_id(self.store.as_ref(), access.workspace.id, assignee_id)
                .await?
                .is_none()
            {
                return Err(JanitorError::Validation(
                    "Assignee is not a member of this workspace".to_string(),
                ));
            }
        }

        let mut task = Task::new(access.workspace.id, recommendation.title.clone(), user_id);
        task.description = Some(recommendation.description.clone());
        task.priority = recommendation.priority;
        task.source_type = TaskSourceType::Janitor;
        task.assignee_id = assignee_id;

        match self.store.accept_recommendation(id, user_id, task).await {
            Ok((recommendation, task)) => {
                info!("Recommendation {} accepted as task {}", recommendation.id, task.id);
                Ok((recommendation, task))
            }
            Err(StoreError::Conflict(_)) => Err(JanitorError::NotPending),
            Err(StoreError::NotFound(_)) => Err(JanitorError::RecommendationNotFound),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn dismiss_recommendation(
        &self,
        id: Uuid,
        user_id: Uuid,
        reason: Option<String>,
    ) -> Result<JanitorRecommendation, JanitorError> {
        let (recommendation, _) = self.load_recommendation(id, user_id).await?;
        if recommendation.status != RecommendationStatus::Pending {
            return Err(JanitorError::NotPending);
        }
        match self.store.dismiss_recommendation(id, user_id, reason).await {
            Ok(recommendation) => {
                info!("Recommendation {} dismissed", recommendation.id);
                Ok(recommendation)
            }
            Err(StoreError::Conflict(_)) => Err(JanitorError::NotPending),
            Err(StoreError::NotFound(_)) => Err(JanitorError::RecommendationNotFound),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn process_webhook(&self, payload: JanitorWebhookPayload) -> Result<WebhookEffect, JanitorError> {
        let project_id = payload
            .project_id
            .value()
            .ok_or_else(|| JanitorError::Validation("Invalid projectId".to_string()))?;
        let run = self
            .store
            .find_janitor_run_by_project_id(project_id)
            .await?
            .ok_or(JanitorError::RunNotFound)?;

        let status = payload.status.trim().to_ascii_lowercase();
        if !matches!(status.as_str(), "running" | "completed" | "failed") {
            return Err(JanitorError::Validation(format!("Unknown status: {}", payload.status)));
        }
        if !run.status.is_in_flight() {
            info!("Ignoring {status} webhook for finished janitor run {}", run.id);
            return Ok(WebhookEffect::AlreadyFinished(run));
        }

        let run_id = run.id;
        let transition = match status.as_str() {
            "running" => self.store.start_janitor_run(run_id).await,
            "completed" => {
                let recommendations = payload
                    .results
                    .map(|r| r.recommendations)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|input| new_recommendation(run_id, input))
                    .collect::<Vec<_>>();
                let count = recommendations.len();
                let result = self.store.complete_janitor_run(run_id, recommendations).await;
                if result.is_ok() {
                    info!("Janitor run {run_id} completed with {count} recommendations");
                }
                result
            }
            _ => {
                warn!("Janitor run {run_id} failed: {:?}", payload.error);
                self.store.fail_janitor_run(run_id, payload.error).await
            }
        };
        match transition {
            Ok(run) => Ok(WebhookEffect::Updated(run)),
            Err(StoreError::Conflict(_)) => {
                info!("Janitor run {run_id} finished concurrently; ignoring {status} webhook");
                let current = self.store.find_janitor_run_by_project_id(project_id).await?;
                Ok(WebhookEffect::AlreadyFinished(current.unwrap_or(run)))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn new_recommendation(run_id: Uuid, input: RecommendationInput) -> JanitorRecommendation {
    JanitorRecommendation {
        id: Uuid::new_v4(),
        janitor_run_id: run_id,
        title: input.title,
        description: input.description,
        priority: input
            .priority
            .as_deref()
            .and_then(|p| p.parse().ok())
            .unwrap_or(Priority::Medium),
        impact: input.impact,
        status: RecommendationStatus::Pending,
        accepted_at: None,
        accepted_by_id: None,
        dismissed_at: None,
        dismissed_by_id: None,
        metadata: None,
        created_at: Utc::now(),
    }
}
