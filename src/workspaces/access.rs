use serde::Serialize;
use uuid::Uuid;

use super::error::WorkspaceError;
use crate::core::shared::enums::WorkspaceRole;
use crate::core::shared::models::Workspace;
use crate::core::store::{Store, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    pub can_read: bool,
    pub can_write: bool,
    pub can_admin: bool,
}

pub fn derive_permissions(role: WorkspaceRole) -> Permissions {
    use WorkspaceRole::*;
    Permissions {
        can_read: true,
        can_write: matches!(role, Owner | Admin | Pm | Developer),
        can_admin: matches!(role, Owner | Admin),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Read,
    Write,
    Admin,
}

#[derive(Debug, Clone)]
pub struct WorkspaceAccess {
    pub workspace: Workspace,
    pub role: WorkspaceRole,
    pub permissions: Permissions,
}

impl WorkspaceAccess {
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Read => self.permissions.can_read,
            Capability::Write => self.permissions.can_write,
            Capability::Admin => self.permissions.can_admin,
        }
    }

    pub fn is_owner(&self) -> bool {
        self.role == WorkspaceRole::Owner
    }
}

async fn access_for(
    store: &dyn Store,
    workspace: Workspace,
    user_id: Uuid,
) -> Result<Option<WorkspaceAccess>, StoreError> {
    let role = if workspace.owner_id == user_id {
        WorkspaceRole::Owner
    } else {
        match store.find_membership(workspace.id, user_id).await? {
            Some(member) if member.is_active() => member.role,
            _ => return Ok(None),
        }
    };
    Ok(Some(WorkspaceAccess {
        workspace,
        role,
        permissions: derive_permissions(role),
    }))
}

/// Owner first, then an active membership; `None` when neither applies or
/// the workspace does not exist or is deleted.
pub async fn resolve_workspace_access(
    store: &dyn Store,
    slug: &str,
    user_id: Uuid,
) -> Result<Option<WorkspaceAccess>, StoreError> {
    match store.find_workspace_by_slug(slug).await? {
        Some(workspace) => access_for(store, workspace, user_id).await,
        None => Ok(None),
    }
}

pub async fn resolve_workspace_access_by_id(
    store: &dyn Store,
    workspace_id: Uuid,
    user_id: Uuid,
) -> Result<Option<WorkspaceAccess>, StoreError> {
    match store.get_workspace(workspace_id).await? {
        Some(workspace) => access_for(store, workspace, user_id).await,
        None => Ok(None),
    }
}

/// No access at all is reported as not found; insufficient role as denied.
pub async fn require_access(
    store: &dyn Store,
    slug: &str,
    user_id: Uuid,
    capability: Capability,
) -> Result<WorkspaceAccess, WorkspaceError> {
    let access = resolve_workspace_access(store, slug, user_id)
        .await?
        .ok_or(WorkspaceError::NotFound)?;
    if !access.allows(capability) {
        return Err(WorkspaceError::AccessDenied);
    }
    Ok(access)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::models::WorkspaceMember;
    use crate::core::store::MemoryStore;
    use chrono::Utc;

    #[test]
    fn test_derive_permissions() {
        let owner = derive_permissions(WorkspaceRole::Owner);
        assert!(owner.can_read && owner.can_write && owner.can_admin);

        let admin = derive_permissions(WorkspaceRole::Admin);
        assert!(admin.can_write && admin.can_admin);

        for role in [WorkspaceRole::Pm, WorkspaceRole::Developer] {
            let p = derive_permissions(role);
            assert!(p.can_read && p.can_write && !p.can_admin);
        }
        for role in [WorkspaceRole::Viewer, WorkspaceRole::Stakeholder] {
            let p = derive_permissions(role);
            assert!(p.can_read && !p.can_write && !p.can_admin);
        }
    }

    async fn seeded() -> (MemoryStore, Workspace) {
        let store = MemoryStore::new();
        let now = Utc::now();
        let workspace = store
            .insert_workspace(Workspace {
                id: Uuid::new_v4(),
                name: "Acme".to_string(),
                description: None,
                slug: "acme".to_string(),
                owner_id: Uuid::new_v4(),
                deleted: false,
                deleted_at: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("workspace");
        (store, workspace)
    }

    #[tokio::test]
    async fn test_owner_resolves_to_owner_role() {
        let (store, workspace) = seeded().await;
        let access = resolve_workspace_access(&store, "acme", workspace.owner_id)
            .await
            .expect("resolve")
            .expect("access");
        assert_eq!(access.role, WorkspaceRole::Owner);
        assert!(access.permissions.can_admin);
    }

    #[tokio::test]
    async fn test_left_member_has_no_access() {
        let (store, workspace) = seeded().await;
        let user_id = Uuid::new_v4();
        let member = store
            .insert_member(WorkspaceMember {
                id: Uuid::new_v4(),
                workspace_id: workspace.id,
                user_id,
                role: WorkspaceRole::Developer,
                joined_at: Utc::now(),
                left_at: None,
            })
            .await
            .expect("member");

        let access = resolve_workspace_access(&store, "acme", user_id)
            .await
            .expect("resolve")
            .expect("access");
        assert_eq!(access.role, WorkspaceRole::Developer);

        let mut left = member;
        left.left_at = Some(Utc::now());
        store.update_member(left).await.expect("leave");
        assert!(resolve_workspace_access(&store, "acme", user_id)
            .await
            .expect("resolve")
            .is_none());
    }

    #[tokio::test]
    async fn test_stranger_and_unknown_slug() {
        let (store, _) = seeded().await;
        assert!(resolve_workspace_access(&store, "acme", Uuid::new_v4())
            .await
            .expect("resolve")
            .is_none());
        assert!(resolve_workspace_access(&store, "nope", Uuid::new_v4())
            .await
            .expect("resolve")
            .is_none());
        assert!(matches!(
            require_access(&store, "nope", Uuid::new_v4(), Capability::Read).await,
            Err(WorkspaceError::NotFound)
        ));
    }
}
