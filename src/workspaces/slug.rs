use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};

use super::error::{messages, WorkspaceError};

pub const MIN_SLUG_LENGTH: usize = 2;
pub const MAX_SLUG_LENGTH: usize = 50;

static SLUG_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").ok());

pub const RESERVED_SLUGS: &[&str] = &[
    "account", "admin", "api", "app", "assets", "auth", "billing", "create", "dashboard", "delete",
    "docs", "edit", "health", "help", "login", "logout", "new", "onboarding", "profile", "public",
    "settings", "signup", "static", "status", "support", "update", "user", "users", "workspace",
    "workspaces",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugError {
    TooShort,
    TooLong,
    InvalidFormat,
    Reserved,
}

impl SlugError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::TooShort => messages::SLUG_TOO_SHORT,
            Self::TooLong => messages::SLUG_TOO_LONG,
            Self::InvalidFormat => messages::INVALID_SLUG,
            Self::Reserved => messages::RESERVED_SLUG,
        }
    }
}

impl Serialize for SlugError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.message())
    }
}

impl From<SlugError> for WorkspaceError {
    fn from(e: SlugError) -> Self {
        match e {
            SlugError::TooShort => Self::SlugTooShort,
            SlugError::TooLong => Self::SlugTooLong,
            SlugError::InvalidFormat => Self::InvalidSlug,
            SlugError::Reserved => Self::ReservedSlug,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlugValidation {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SlugError>,
}

impl SlugValidation {
    pub fn into_result(self) -> Result<(), SlugError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn matches_pattern(slug: &str) -> bool {
    match SLUG_PATTERN.as_ref() {
        Some(pattern) => pattern.is_match(slug),
        None => false,
    }
}

/// Checks length, then format, then the reserved list. Pure.
pub fn validate_workspace_slug(slug: &str) -> SlugValidation {
    let len = slug.chars().count();
    let error = if len < MIN_SLUG_LENGTH {
        Some(SlugError::TooShort)
    } else if len > MAX_SLUG_LENGTH {
        Some(SlugError::TooLong)
    } else if !matches_pattern(slug) {
        Some(SlugError::InvalidFormat)
    } else if RESERVED_SLUGS.contains(&slug) {
        Some(SlugError::Reserved)
    } else {
        None
    };
    SlugValidation {
        is_valid: error.is_none(),
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_slugs() {
        for slug in ["ab", "my-team", "team-42", "a1b2c3", &"a".repeat(50)] {
            assert!(validate_workspace_slug(slug).is_valid, "{slug} should be valid");
        }
    }

    #[test]
    fn test_validation_serializes_error_message() {
        let invalid = serde_json::to_value(validate_workspace_slug("a")).expect("serialize");
        assert_eq!(
            invalid,
            serde_json::json!({ "isValid": false, "error": messages::SLUG_TOO_SHORT })
        );
        let valid = serde_json::to_value(validate_workspace_slug("my-team")).expect("serialize");
        assert_eq!(valid, serde_json::json!({ "isValid": true }));
    }

    #[test]
    fn test_length_bounds() {
        assert_eq!(validate_workspace_slug("a").error, Some(SlugError::TooShort));
        assert_eq!(validate_workspace_slug("").error, Some(SlugError::TooShort));
        assert_eq!(validate_workspace_slug(&"a".repeat(51)).error, Some(SlugError::TooLong));
    }

    #[test]
    fn test_format_rules() {
        for slug in ["My-Team", "my_team", "-team", "team-", "te am", "tëam"] {
            assert_eq!(
                validate_workspace_slug(slug).error,
                Some(SlugError::InvalidFormat),
                "{slug}"
            );
        }
    }

    #[test]
    fn test_reserved_words() {
        for slug in ["admin", "api", "dashboard", "settings", "workspaces"] {
            assert_eq!(validate_workspace_slug(slug).error, Some(SlugError::Reserved));
        }
        assert!(validate_workspace_slug("admin-team").is_valid);
    }

    #[test]
    fn test_length_checked_before_format() {
        assert_eq!(validate_workspace_slug("A").error, Some(SlugError::TooShort));
        assert_eq!(validate_workspace_slug(&"A".repeat(60)).error, Some(SlugError::TooLong));
    }

    #[test]
    fn test_validation_is_deterministic() {
        assert_eq!(validate_workspace_slug("acme"), validate_workspace_slug("acme"));
        assert_eq!(validate_workspace_slug("Acme"), validate_workspace_slug("Acme"));
    }

    #[test]
    fn test_messages() {
        assert_eq!(SlugError::TooShort.message(), "Workspace slug must be at least 2 characters");
        assert_eq!(
            SlugError::Reserved.message(),
            "This workspace slug is reserved. Please choose a different one."
        );
    }
}
