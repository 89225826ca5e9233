//! Text-backed enum types shared by the API and the database schema.
//!
//! Every enum here is stored as an upper-case TEXT column and serialized with
//! the same upper-case spelling on the wire. Parsing is lenient about case and
//! accepts `-` in place of `_`, so `unit-tests` and `UNIT_TESTS` are the same
//! janitor type.

use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Text;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use std::io::Write;

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
        )]
        #[diesel(sql_type = Text)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
                match normalized.as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!("Unknown {}: {}", stringify!($name), s)),
                }
            }
        }

        impl ToSql<Text, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(serialize::IsNull::No)
            }
        }

        impl FromSql<Text, Pg> for $name {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let value = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
                value.parse().map_err(Into::into)
            }
        }
    };
}

text_enum! {
    /// Role a user holds inside a workspace
    WorkspaceRole {
        Owner => "OWNER",
        Admin => "ADMIN",
        Pm => "PM",
        Developer => "DEVELOPER",
        Viewer => "VIEWER",
        Stakeholder => "STAKEHOLDER",
    }
}

impl WorkspaceRole {
    /// OWNER comes from `workspaces.owner_id` and is never granted through membership.
    pub fn is_assignable(&self) -> bool {
        !matches!(self, Self::Owner)
    }
}

text_enum! {
    TaskStatus {
        Todo => "TODO",
        InProgress => "IN_PROGRESS",
        Done => "DONE",
        Cancelled => "CANCELLED",
    }
}

text_enum! {
    /// Shared by tasks and janitor recommendations
    Priority {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
        Critical => "CRITICAL",
    }
}

impl Priority {
    pub fn rank(&self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Critical => 3,
        }
    }
}

text_enum! {
    /// Status of the external workflow attached to a task
    WorkflowStatus {
        Pending => "PENDING",
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
        Error => "ERROR",
        Halted => "HALTED",
        Failed => "FAILED",
    }
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Failed)
    }
}

text_enum! {
    TaskSourceType {
        User => "USER",
        Janitor => "JANITOR",
        System => "SYSTEM",
    }
}

text_enum! {
    ChatRole {
        User => "USER",
        Assistant => "ASSISTANT",
    }
}

text_enum! {
    ChatStatus {
        Sending => "SENDING",
        Sent => "SENT",
        Error => "ERROR",
    }
}

text_enum! {
    ArtifactType {
        Code => "CODE",
        Form => "FORM",
        Browser => "BROWSER",
        Ide => "IDE",
        Media => "MEDIA",
        Stream => "STREAM",
        Longform => "LONGFORM",
        BugReport => "BUG_REPORT",
        Graph => "GRAPH",
    }
}

text_enum! {
    JanitorType {
        UnitTests => "UNIT_TESTS",
        IntegrationTests => "INTEGRATION_TESTS",
        E2eTests => "E2E_TESTS",
        SecurityReview => "SECURITY_REVIEW",
    }
}

impl JanitorType {
    /// Human label used in error messages, e.g. "Unit Tests".
    pub fn label(&self) -> &'static str {
        match self {
            Self::UnitTests => "Unit Tests",
            Self::IntegrationTests => "Integration Tests",
            Self::E2eTests => "E2E Tests",
            Self::SecurityReview => "Security Review",
        }
    }
}

text_enum! {
    JanitorTrigger {
        Manual => "MANUAL",
        Scheduled => "SCHEDULED",
    }
}

text_enum! {
    JanitorStatus {
        Pending => "PENDING",
        Running => "RUNNING",
        Completed => "COMPLETED",
        Failed => "FAILED",
    }
}

impl JanitorStatus {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }
}

text_enum! {
    RecommendationStatus {
        Pending => "PENDING",
        Accepted => "ACCEPTED",
        Dismissed => "DISMISSED",
    }
}
