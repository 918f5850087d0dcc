//! Error types for the Slack client

use thiserror::Error;

/// Web API error code: user group name taken in the workspace.
pub const CODE_NAME_ALREADY_EXISTS: &str = "name_already_exists";
/// Web API error code: unknown user group.
pub const CODE_NO_SUCH_SUBTEAM: &str = "no_such_subteam";
/// Web API error code: unknown user group (alternate spelling).
pub const CODE_SUBTEAM_NOT_FOUND: &str = "subteam_not_found";
/// Web API error code: unknown workspace.
pub const CODE_TEAM_NOT_FOUND: &str = "team_not_found";
/// Web API error code from `users.lookupByEmail`.
pub const CODE_USER_NOT_FOUND: &str = "user_not_found";
/// Web API error code from `users.info`.
pub const CODE_USERS_NOT_FOUND: &str = "users_not_found";

/// Slack client errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlackError {
    /// An identifier required by the call was empty
    #[error("bad parameters in request")]
    BadParameter,

    /// Create/update request lacks required fields
    #[error("missing required user group parameters in request")]
    MissingUserGroupParameter,

    /// Slack does not allow removing every member of a group
    #[error("user group members cannot be empty list")]
    EmptyUserGroupMembers,

    #[error("slack user group already exists")]
    GroupAlreadyExists,

    #[error("slack user group not found")]
    GroupNotFound,

    #[error("slack user not found")]
    UserNotFound,

    #[error("slack workspace not found")]
    WorkspaceNotFound,

    /// HTTP 503 from the Web API; the only error worth retrying
    #[error("503 Service Unavailable")]
    ServiceUnavailable,

    /// `{"ok": false, "error": code}` that wasn't normalized
    #[error("slack api error: {0}")]
    Api(String),

    #[error("slack transport error: {0}")]
    Transport(String),

    #[error("failed to decode slack response: {0}")]
    Decode(String),
}

impl SlackError {
    /// Whether this is a raw API error with one of the given codes.
    pub fn is_api_code(&self, codes: &[&str]) -> bool {
        matches!(self, SlackError::Api(code) if codes.contains(&code.as_str()))
    }

    /// Whether retrying the same call might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, SlackError::ServiceUnavailable)
    }
}

/// Result type for Slack operations
pub type SlackResult<T> = Result<T, SlackError>;
