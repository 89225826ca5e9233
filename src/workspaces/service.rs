use chrono::Utc;
use log::info;
use std::sync::Arc;
use uuid::Uuid;

use super::access::{derive_permissions, require_access, resolve_workspace_access, Capability};
use super::error::{messages, WorkspaceError};
use super::slug::validate_workspace_slug;
use super::types::{
    AddMemberRequest, CreateWorkspaceRequest, MemberResponse, MembersResponse, SlugAvailability,
    UpdateWorkspaceRequest, WorkspaceResponse,
};
use crate::core::shared::enums::WorkspaceRole;
use crate::core::shared::models::{Workspace, WorkspaceMember};
use crate::core::store::{Store, StoreError};

/// Any unique violation on the workspaces table is the live-slug index.
fn slug_conflict(e: StoreError) -> WorkspaceError {
    match e {
        StoreError::UniqueViolation(_) => WorkspaceError::SlugAlreadyExists,
        other => WorkspaceError::Store(other),
    }
}

fn parse_assignable_role(raw: &str) -> Result<WorkspaceRole, WorkspaceError> {
    raw.parse::<WorkspaceRole>()
        .ok()
        .filter(WorkspaceRole::is_assignable)
        .ok_or(WorkspaceError::Validation(messages::INVALID_ROLE))
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

pub struct WorkspaceService {
    store: Arc<dyn Store>,
}

impl WorkspaceService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn ensure_slug_free(&self, slug: &str) -> Result<(), WorkspaceError> {
        validate_workspace_slug(slug).into_result()?;
        if self.store.find_workspace_by_slug(slug).await?.is_some() {
            return Err(WorkspaceError::SlugAlreadyExists);
        }
        Ok(())
    }

    pub async fn create_workspace(
        &self,
        owner_id: Uuid,
        req: CreateWorkspaceRequest,
    ) -> Result<WorkspaceResponse, WorkspaceError> {
        let name = req.name.trim().to_string();
        if name.is_empty() {
            return Err(WorkspaceError::Validation(messages::NAME_REQUIRED));
        }
        self.ensure_slug_free(&req.slug).await?;

        let now = Utc::now();
        let workspace = Workspace {
            id: Uuid::new_v4(),
            name,
            description: normalize_description(req.description),
            slug: req.slug,
            owner_id,
            deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        let workspace = self
            .store
            .insert_workspace(workspace)
            .await
            .map_err(slug_conflict)?;

        info!("Created workspace {} ({})", workspace.slug, workspace.id);
        Ok(WorkspaceResponse {
            workspace,
            user_role: WorkspaceRole::Owner,
            permissions: derive_permissions(WorkspaceRole::Owner),
        })
    }

    pub async fn get_workspace(&self, slug: &str, user_id: Uuid) -> Result<WorkspaceResponse, WorkspaceError> {
        let access = require_access(self.store.as_ref(), slug, user_id, Capability::Read).await?;
        Ok(access.into())
    }

    pub async fn list_workspaces(&self, user_id: Uuid) -> Result<Vec<WorkspaceResponse>, WorkspaceError> {
        let rows = self.store.list_workspaces_for_user(user_id).await?;
        Ok(rows
            .into_iter()
            .map(|(workspace, role)| WorkspaceResponse {
                workspace,
                user_role: role,
                permissions: derive_permissions(role),
            })
            .collect())
    }

    pub async fn update_workspace(
        &self,
        slug: &str,
        user_id: Uuid,
        req: UpdateWorkspaceRequest,
    ) -> Result<WorkspaceResponse, WorkspaceError> {
        let access = require_access(self.store.as_ref(), slug, user_id, Capability::Admin).await?;
        let mut workspace = access.workspace.clone();

        if let Some(new_slug) = req.slug {
            if new_slug != workspace.slug {
                self.ensure_slug_free(&new_slug).await?;
                workspace.slug = new_slug;
            }
        }
        if let Some(name) = req.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(WorkspaceError::Validation(messages::NAME_REQUIRED));
            }
            workspace.name = name;
        }
        if req.description.is_some() {
            workspace.description = normalize_description(req.description);
        }
        workspace.updated_at = Utc::now();

        let workspace = self
            .store
            .update_workspace(workspace)
            .await
            .map_err(slug_conflict)?;
        Ok(WorkspaceResponse {
            workspace,
            user_role: access.role,
            permissions: access.permissions,
        })
    }

    pub async fn delete_workspace(&self, slug: &str, user_id: Uuid) -> Result<(), WorkspaceError> {
        let access = resolve_workspace_access(self.store.as_ref(), slug, user_id)
            .await?
            .ok_or(WorkspaceError::NotFound)?;
        if !access.is_owner() {
            return Err(WorkspaceError::AccessDenied);
        }

        let now = Utc::now();
        let mut workspace = access.workspace;
        workspace.deleted = true;
        workspace.deleted_at = Some(now);
        workspace.updated_at = now;
        self.store.update_workspace(workspace).await?;
        info!("Deleted workspace {slug}");
        Ok(())
    }

    pub async fn check_slug_availability(&self, slug: &str) -> Result<SlugAvailability, WorkspaceError> {
        let validation = validate_workspace_slug(slug);
        if let Some(error) = validation.error {
            return Ok(SlugAvailability {
                slug: slug.to_string(),
                is_available: false,
                error: Some(error.message().to_string()),
            });
        }
        let taken = self.store.find_workspace_by_slug(slug).await?.is_some();
        Ok(SlugAvailability {
            slug: slug.to_string(),
            is_available: !taken,
            error: taken.then(|| messages::SLUG_ALREADY_EXISTS.to_string()),
        })
    }

    pub async fn list_members(&self, slug: &str, user_id: Uuid) -> Result<MembersResponse, WorkspaceError> {
        let access = require_access(self.store.as_ref(), slug, user_id, Capability::Read).await?;
        let owner = self.store.get_user(access.workspace.owner_id).await?;
        let members = self
            .store
            .list_active_members(access.workspace.id)
            .await?
            .into_iter()
            .map(|(member, user)| MemberResponse::from_member(&member, user))
            .collect();
        Ok(MembersResponse { owner, members })
    }

    pub async fn add_member(
        &self,
        slug: &str,
        actor_id: Uuid,
        req: AddMemberRequest,
    ) -> Result<MemberResponse, WorkspaceError> {
        let access = require_access(self.store.as_ref(), slug, actor_id, Capability::Admin).await?;
        let role = parse_assignable_role(&req.role)?;

        let user = self
            .store
            .find_user_by_github_username(req.github_username.trim())
            .await?
            .ok_or(WorkspaceError::UserNotFound)?;
        if user.id == access.workspace.owner_id {
            return Err(WorkspaceError::Validation(messages::CANNOT_ADD_OWNER));
        }

        let member = match self.store.find_membership(access.workspace.id, user.id).await? {
            Some(existing) if existing.is_active() => return Err(WorkspaceError::AlreadyMember),
            Some(mut previous) => {
                previous.role = role;
                previous.joined_at = Utc::now();
                previous.left_at = None;
                self.store.update_member(previous).await?
            }
            None => self
                .store
                .insert_member(WorkspaceMember {
                    id: Uuid::new_v4(),
                    workspace_id: access.workspace.id,
                    user_id: user.id,
                    role,
                    joined_at: Utc::now(),
                    left_at: None,
                })
                .await
                .map_err(|e| match e {
                    StoreError::UniqueViolation(_) => WorkspaceError::AlreadyMember,
                    other => WorkspaceError::Store(other),
                })?,
        };

        info!("Added {} to workspace {slug} as {}", user.id, member.role);
        Ok(MemberResponse::from_member(&member, user))
    }

    async fn active_member(&self, workspace_id: Uuid, user_id: Uuid) -> Result<WorkspaceMember, WorkspaceError> {
        self.store
            .find_membership(workspace_id, user_id)
            .await?
            .filter(WorkspaceMember::is_active)
            .ok_or(WorkspaceError::MemberNotFound)
    }

    pub async fn update_member_role(
        &self,
        slug: &str,
        actor_id: Uuid,
        user_id: Uuid,
        raw_role: &str,
    ) -> Result<MemberResponse, WorkspaceError> {
        let access = require_access(self.store.as_ref(), slug, actor_id, Capability::Admin).await?;
        let role = parse_assignable_role(raw_role)?;
        if user_id == access.workspace.owner_id {
            return Err(WorkspaceError::Validation(messages::CANNOT_MODIFY_OWNER));
        }

        let mut member = self.active_member(access.workspace.id, user_id).await?;
        if member.role == role {
            return Err(WorkspaceError::Validation(messages::SAME_ROLE));
        }
        member.role = role;
        let member = self.store.update_member(member).await?;

        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(WorkspaceError::MemberNotFound)?;
        Ok(MemberResponse::from_member(&member, user))
    }

    pub async fn remove_member(&self, slug: &str, actor_id: Uuid, user_id: Uuid) -> Result<(), WorkspaceError> {
        let access = require_access(self.store.as_ref(), slug, actor_id, Capability::Admin).await?;
        if user_id == access.workspace.owner_id {
            return Err(WorkspaceError::Validation(messages::CANNOT_REMOVE_OWNER));
        }

        let mut member = self.active_member(access.workspace.id, user_id).await?;
        member.left_at = Some(Utc::now());
        self.store.update_member(member).await?;
        info!("Removed {user_id} from workspace {slug}");
        Ok(())
    }
}
