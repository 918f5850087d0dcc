//! Governor group to Slack user group resolution
//!
//! There is no stored mapping between the two systems: a Governor group's
//! user group is the one named `prefix + group.name` in the workspace. A
//! renamed Governor group therefore no longer finds its old user group and
//! the next sweep creates a new one under the new name.
//!
//! The lookup sits behind [`TargetGroupResolver`] so a persisted mapping
//! can replace it without touching the engine.

use async_trait::async_trait;
use gsa_02_slack::{SlackClient, UserGroup, UserGroupReq};
use shared_types::Group;
use tracing::debug;

use crate::error::{ReconcileError, ReconcileResult};

#[async_trait]
pub trait TargetGroupResolver: Send + Sync {
    /// Create request for the user group mirroring `group`.
    fn create_request(&self, group: &Group) -> UserGroupReq;

    /// Display name the user group for `group` carries.
    fn user_group_name(&self, group: &Group) -> String;

    /// The enabled user group mirroring `group` in workspace `team_id`.
    async fn resolve(
        &self,
        slack: &SlackClient,
        team_id: &str,
        group: &Group,
    ) -> ReconcileResult<UserGroup>;
}

/// Resolves by display name: `prefix + group.name`, handle = group slug.
#[derive(Debug, Clone)]
pub struct NameResolver {
    prefix: String,
}

impl NameResolver {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl TargetGroupResolver for NameResolver {
    fn create_request(&self, group: &Group) -> UserGroupReq {
        UserGroupReq {
            name: Some(self.user_group_name(group)),
            handle: Some(group.slug.clone()),
            description: Some(group.description.clone()),
        }
    }

    fn user_group_name(&self, group: &Group) -> String {
        format!("{}{}", self.prefix, group.name)
    }

    async fn resolve(
        &self,
        slack: &SlackClient,
        team_id: &str,
        group: &Group,
    ) -> ReconcileResult<UserGroup> {
        user_group_from_name(slack, &self.user_group_name(group), team_id, false).await
    }
}

/// Id of the workspace named exactly `name`.
pub async fn team_id_from_name(slack: &SlackClient, name: &str) -> ReconcileResult<String> {
    if name.is_empty() {
        return Err(ReconcileError::BadParameter);
    }

    let workspaces = slack.list_workspaces().await?;

    match workspaces.into_iter().find(|ws| ws.name == name) {
        Some(ws) => {
            debug!(slack_workspace_name = name, slack_workspace_id = %ws.id, "found slack workspace");
            Ok(ws.id)
        }
        None => {
            debug!(slack_workspace_name = name, "slack workspace not found");
            Err(ReconcileError::SlackWorkspaceNotFound)
        }
    }
}

/// The user group named exactly `name` in workspace `team_id`.
pub async fn user_group_from_name(
    slack: &SlackClient,
    name: &str,
    team_id: &str,
    include_disabled: bool,
) -> ReconcileResult<UserGroup> {
    if name.is_empty() || team_id.is_empty() {
        return Err(ReconcileError::BadParameter);
    }

    let groups = slack.get_user_groups(team_id, include_disabled).await?;

    match groups.into_iter().find(|ug| ug.name == name) {
        Some(ug) => {
            debug!(
                slack_usergroup_name = name,
                slack_usergroup_id = %ug.id,
                slack_workspace_id = team_id,
                "found slack user group"
            );
            Ok(ug)
        }
        None => {
            debug!(slack_usergroup_name = name, slack_workspace_id = team_id, "slack user group not found");
            Err(ReconcileError::SlackUserGroupNotFound)
        }
    }
}
