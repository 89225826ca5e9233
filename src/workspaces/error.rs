use axum::http::StatusCode;
use axum::{response::IntoResponse, Json};
use log::error;

use crate::core::store::StoreError;

pub mod messages {
    pub const SLUG_ALREADY_EXISTS: &str = "A workspace with this slug already exists";
    pub const INVALID_SLUG: &str = "Invalid workspace slug format";
    pub const RESERVED_SLUG: &str = "This workspace slug is reserved. Please choose a different one.";
    pub const SLUG_TOO_SHORT: &str = "Workspace slug must be at least 2 characters";
    pub const SLUG_TOO_LONG: &str = "Workspace slug must be 50 characters or less";
    pub const NOT_FOUND: &str = "Workspace not found or access denied";
    pub const ACCESS_DENIED: &str = "Access denied";
    pub const USER_NOT_FOUND: &str = "User not found. They must sign up first.";
    pub const CANNOT_ADD_OWNER: &str = "Cannot add workspace owner as a member";
    pub const ALREADY_MEMBER: &str = "User is already a member of this workspace";
    pub const INVALID_ROLE: &str = "Invalid role";
    pub const SAME_ROLE: &str = "Member already has this role";
    pub const CANNOT_MODIFY_OWNER: &str = "Cannot modify workspace owner";
    pub const CANNOT_REMOVE_OWNER: &str = "Cannot remove workspace owner";
    pub const MEMBER_NOT_FOUND: &str = "Member not found";
    pub const NAME_REQUIRED: &str = "Workspace name is required";
}

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("{}", messages::SLUG_TOO_SHORT)]
    SlugTooShort,
    #[error("{}", messages::SLUG_TOO_LONG)]
    SlugTooLong,
    #[error("{}", messages::INVALID_SLUG)]
    InvalidSlug,
    #[error("{}", messages::RESERVED_SLUG)]
    ReservedSlug,
    #[error("{}", messages::SLUG_ALREADY_EXISTS)]
    SlugAlreadyExists,
    #[error("{}", messages::NOT_FOUND)]
    NotFound,
    #[error("{}", messages::ACCESS_DENIED)]
    AccessDenied,
    #[error("{}", messages::USER_NOT_FOUND)]
    UserNotFound,
    #[error("{}", messages::ALREADY_MEMBER)]
    AlreadyMember,
    #[error("{}", messages::MEMBER_NOT_FOUND)]
    MemberNotFound,
    #[error("{0}")]
    Validation(&'static str),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for WorkspaceError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            Self::SlugTooShort
            | Self::SlugTooLong
            | Self::InvalidSlug
            | Self::ReservedSlug
            | Self::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Self::SlugAlreadyExists | Self::AlreadyMember => (StatusCode::CONFLICT, self.to_string()),
            Self::NotFound | Self::UserNotFound | Self::MemberNotFound => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            Self::AccessDenied => (StatusCode::FORBIDDEN, self.to_string()),
            Self::Store(e) => {
                error!("Workspace store failure: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
