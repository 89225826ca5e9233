use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::error::WorkspaceError;
use super::service::WorkspaceService;
use super::types::{
    AddMemberRequest, CreateWorkspaceRequest, MemberResponse, MembersResponse, SlugAvailability,
    SlugAvailabilityQuery, UpdateMemberRoleRequest, UpdateWorkspaceRequest, WorkspaceResponse,
};
use crate::core::middleware::SessionUser;
use crate::core::shared::state::AppState;

fn service(state: &AppState) -> WorkspaceService {
    WorkspaceService::new(state.store.clone())
}

pub async fn handle_list_workspaces(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
) -> Result<Json<Vec<WorkspaceResponse>>, WorkspaceError> {
    Ok(Json(service(&state).list_workspaces(session.user_id).await?))
}

pub async fn handle_create_workspace(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Json(req): Json<CreateWorkspaceRequest>,
) -> Result<(StatusCode, Json<WorkspaceResponse>), WorkspaceError> {
    let workspace = service(&state).create_workspace(session.user_id, req).await?;
    Ok((StatusCode::CREATED, Json(workspace)))
}

pub async fn handle_get_workspace(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(slug): Path<String>,
) -> Result<Json<WorkspaceResponse>, WorkspaceError> {
    Ok(Json(service(&state).get_workspace(&slug, session.user_id).await?))
}

pub async fn handle_update_workspace(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(slug): Path<String>,
    Json(req): Json<UpdateWorkspaceRequest>,
) -> Result<Json<WorkspaceResponse>, WorkspaceError> {
    Ok(Json(
        service(&state)
            .update_workspace(&slug, session.user_id, req)
            .await?,
    ))
}

pub async fn handle_delete_workspace(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(slug): Path<String>,
) -> Result<StatusCode, WorkspaceError> {
    service(&state).delete_workspace(&slug, session.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn handle_slug_availability(
    State(state): State<Arc<AppState>>,
    _session: SessionUser,
    Query(query): Query<SlugAvailabilityQuery>,
) -> Result<Json<SlugAvailability>, WorkspaceError> {
    let slug = query.slug.unwrap_or_default();
    Ok(Json(service(&state).check_slug_availability(&slug).await?))
}

pub async fn handle_list_members(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(slug): Path<String>,
) -> Result<Json<MembersResponse>, WorkspaceError> {
    Ok(Json(service(&state).list_members(&slug, session.user_id).await?))
}

pub async fn handle_add_member(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(slug): Path<String>,
    Json(req): Json<AddMemberRequest>,
) -> Result<(StatusCode, Json<MemberResponse>), WorkspaceError> {
    let member = service(&state).add_member(&slug, session.user_id, req).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn handle_update_member_role(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path((slug, user_id)): Path<(String, Uuid)>,
    Json(req): Json<UpdateMemberRoleRequest>,
) -> Result<Json<MemberResponse>, WorkspaceError> {
    Ok(Json(
        service(&state)
            .update_member_role(&slug, session.user_id, user_id, &req.role)
            .await?,
    ))
}

pub async fn handle_remove_member(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path((slug, user_id)): Path<(String, Uuid)>,
) -> Result<Json<serde_json::Value>, WorkspaceError> {
    service(&state)
        .remove_member(&slug, session.user_id, user_id)
        .await?;
    Ok(Json(serde_json::json!({ "success": true })))
}
