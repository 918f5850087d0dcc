//! Error types for the reconciler

use gsa_02_slack::SlackError;
use gsa_03_governor::GovernorError;
use thiserror::Error;

/// Reconciliation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// An identifier required by the operation was empty
    #[error("bad parameters in request")]
    BadParameter,

    /// The Governor application has no name to match a workspace against
    #[error("governor application name is empty")]
    AppNameEmpty,

    #[error("slack user group not found")]
    SlackUserGroupNotFound,

    #[error("slack workspace not found")]
    SlackWorkspaceNotFound,

    /// No Governor application type carries the configured slug
    #[error("governor application type {0:?} not found")]
    ApplicationTypeNotFound(String),

    #[error(transparent)]
    Governor(#[from] GovernorError),

    #[error(transparent)]
    Slack(#[from] SlackError),
}

impl ReconcileError {
    /// Whether the user group being created already exists. Expected in the
    /// sweep, a failure for one-shot events.
    pub fn is_group_already_exists(&self) -> bool {
        matches!(self, ReconcileError::Slack(SlackError::GroupAlreadyExists))
    }
}

/// Result type for reconciliation operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;
