use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::access::{Permissions, WorkspaceAccess};
use crate::core::shared::enums::WorkspaceRole;
use crate::core::shared::models::{User, Workspace, WorkspaceMember};

#[derive(Debug, Deserialize)]
pub struct CreateWorkspaceRequest {
    pub name: String,
    pub description: Option<String>,
    pub slug: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateWorkspaceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub github_username: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct SlugAvailabilityQuery {
    pub slug: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlugAvailability {
    pub slug: String,
    pub is_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceResponse {
    #[serde(flatten)]
    pub workspace: Workspace,
    pub user_role: WorkspaceRole,
    pub permissions: Permissions,
}

impl From<WorkspaceAccess> for WorkspaceResponse {
    fn from(access: WorkspaceAccess) -> Self {
        Self {
            workspace: access.workspace,
            user_role: access.role,
            permissions: access.permissions,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    pub user_id: Uuid,
    pub role: WorkspaceRole,
    pub joined_at: DateTime<Utc>,
    pub user: User,
}

impl MemberResponse {
    pub fn from_member(member: &WorkspaceMember, user: User) -> Self {
        Self {
            user_id: member.user_id,
            role: member.role,
            joined_at: member.joined_at,
            user,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembersResponse {
    pub owner: Option<User>,
    pub members: Vec<MemberResponse>,
}
