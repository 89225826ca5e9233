use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use log::warn;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::error::JanitorError;
use super::service::{parse_janitor_type, JanitorService, WebhookEffect, DEFAULT_LIMIT, MAX_LIMIT};
use super::types::{
    AcceptRecommendationRequest, AcceptedRecommendation, ConfigResponse, DismissRecommendationRequest,
    DismissedRecommendation, JanitorWebhookPayload, RecommendationsQuery, RecommendationsResponse, RunCreated,
    RunsQuery, RunsResponse, UpdateJanitorConfigRequest,
};
use crate::core::middleware::SessionUser;
use crate::core::shared::models::JanitorRun;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::clamp_limit;
use crate::core::store::{RecommendationFilter, RunFilter};
use crate::security::verify_webhook;
use crate::stakwork::{build_janitor_payload, DispatchOutcome, JanitorDispatch, StakworkClient};
use crate::workspaces::WorkspaceAccess;

fn parse_limit(raw: Option<&str>) -> i64 {
    clamp_limit(raw.and_then(|l| l.trim().parse().ok()), DEFAULT_LIMIT, MAX_LIMIT)
}

fn parse_filter<T: std::str::FromStr>(raw: Option<&str>, what: &str) -> Result<Option<T>, JanitorError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| JanitorError::Validation(format!("Invalid {what}: {value}"))),
        None => Ok(None),
    }
}

/// Ids that do not parse name no recommendation.
fn parse_recommendation_id(raw: &str) -> Result<Uuid, JanitorError> {
    Uuid::parse_str(raw.trim()).map_err(|_| JanitorError::RecommendationNotFound)
}

pub async fn handle_get_config(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(slug): Path<String>,
) -> Result<Json<ConfigResponse>, JanitorError> {
    let config = JanitorService::new(state.store.clone())
        .get_config(&slug, session.user_id)
        .await?;
    Ok(Json(ConfigResponse { config }))
}

pub async fn handle_update_config(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(slug): Path<String>,
    Json(req): Json<UpdateJanitorConfigRequest>,
) -> Result<Json<ConfigResponse>, JanitorError> {
    let config = JanitorService::new(state.store.clone())
        .update_config(&slug, session.user_id, &req)
        .await?;
    Ok(Json(ConfigResponse { config }))
}

async fn dispatch_run(state: &AppState, run: &JanitorRun, access: &WorkspaceAccess) -> DispatchOutcome {
    let Some(workflow_id) = state
        .config
        .stakwork
        .janitor_workflow_id
        .as_deref()
        .and_then(|id| id.trim().parse::<i64>().ok())
    else {
        return DispatchOutcome::failure("Janitor workflow id is not a number");
    };
    let swarm = match state.store.find_swarm(access.workspace.id).await {
        Ok(swarm) => swarm,
        Err(e) => {
            warn!("Could not load swarm for workspace {}: {e}", access.workspace.slug);
            None
        }
    };
    let dispatch = JanitorDispatch {
        run_id: run.id,
        janitor_type: run.janitor_type,
        workspace_id: access.workspace.id,
        workspace_slug: &access.workspace.slug,
        swarm: swarm.as_ref(),
    };
    let payload = build_janitor_payload(&dispatch, workflow_id, &state.config.server.base_url);
    StakworkClient::new(&state.http, &state.config.stakwork)
        .create_project(&payload)
        .await
}

pub async fn handle_trigger_run(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path((slug, janitor_type)): Path<(String, String)>,
) -> Result<(StatusCode, Json<RunCreated>), JanitorError> {
    let service = JanitorService::new(state.store.clone());
    let (mut run, access) = service.trigger_run(&slug, &janitor_type, session.user_id).await?;

    if state.config.stakwork.janitor_configured() {
        let outcome = dispatch_run(&state, &run, &access).await;
        run = service.record_dispatch(run, &outcome).await?;
    }

    Ok((StatusCode::CREATED, Json(RunCreated { success: true, run })))
}

pub async fn handle_list_runs(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(slug): Path<String>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<RunsResponse>, JanitorError> {
    let janitor_type = match query.janitor_type.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(parse_janitor_type(raw)?),
        None => None,
    };
    let filter = RunFilter {
        janitor_type,
        status: parse_filter(query.status.as_deref(), "status")?,
        limit: parse_limit(query.limit.as_deref()),
    };
    let runs = JanitorService::new(state.store.clone())
        .list_runs(&slug, session.user_id, filter)
        .await?;
    Ok(Json(RunsResponse { runs }))
}

pub async fn handle_list_recommendations(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(slug): Path<String>,
    Query(query): Query<RecommendationsQuery>,
) -> Result<Json<RecommendationsResponse>, JanitorError> {
    let filter = RecommendationFilter {
        status: parse_filter(query.status.as_deref(), "status")?,
        priority: parse_filter(query.priority.as_deref(), "priority")?,
        limit: parse_limit(query.limit.as_deref()),
    };
    let recommendations = JanitorService::new(state.store.clone())
        .list_recommendations(&slug, session.user_id, filter)
        .await?;
    Ok(Json(RecommendationsResponse { recommendations }))
}

pub async fn handle_accept_recommendation(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(id): Path<String>,
    body: Option<Json<AcceptRecommendationRequest>>,
) -> Result<Json<AcceptedRecommendation>, JanitorError> {
    let id = parse_recommendation_id(&id)?;
    let req = body.map(|Json(b)| b).unwrap_or_default();
    let (recommendation, task) = JanitorService::new(state.store.clone())
        .accept_recommendation(id, session.user_id, req.assignee_id)
        .await?;
    Ok(Json(AcceptedRecommendation {
        success: true,
        recommendation,
        task,
    }))
}

pub async fn handle_dismiss_recommendation(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(id): Path<String>,
    body: Option<Json<DismissRecommendationRequest>>,
) -> Result<Json<DismissedRecommendation>, JanitorError> {
    let id = parse_recommendation_id(&id)?;
    let req = body.map(|Json(b)| b).unwrap_or_default();
    let recommendation = JanitorService::new(state.store.clone())
        .dismiss_recommendation(id, session.user_id, req.reason)
        .await?;
    Ok(Json(DismissedRecommendation {
        success: true,
        recommendation,
    }))
}

pub async fn handle_janitor_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, JanitorError> {
    verify_webhook(&headers, &body, state.config.webhook_secret.as_deref())?;
    let payload: JanitorWebhookPayload = serde_json::from_slice(&body)
        .map_err(|e| JanitorError::Validation(format!("Invalid JSON payload: {e}")))?;

    let effect = JanitorService::new(state.store.clone())
        .process_webhook(payload)
        .await?;
    let body = match effect {
        WebhookEffect::Updated(run) => json!({
            "success": true,
            "data": { "runId": run.id, "status": run.status },
        }),
        WebhookEffect::AlreadyFinished(run) => json!({
            "success": true,
            "message": "Janitor run already finished",
            "data": { "runId": run.id, "status": run.status },
        }),
    };
    Ok(Json(body))
}
