//! Driven port: the raw Slack Web API
//!
//! One method per Web API call the addon uses. Implementations report
//! `{"ok": false}` responses as [`SlackError::Api`](crate::SlackError::Api)
//! with the untouched error code and HTTP 503 as
//! [`SlackError::ServiceUnavailable`](crate::SlackError::ServiceUnavailable).
//! Mapping codes to domain errors is the job of [`SlackClient`](crate::SlackClient).

use async_trait::async_trait;

use crate::domain::{SlackUser, UserGroup, UserGroupReq, Workspace};
use crate::error::SlackResult;

#[async_trait]
pub trait SlackApi: Send + Sync {
    /// `auth.teams.list`
    async fn list_teams(&self, limit: u32) -> SlackResult<Vec<Workspace>>;

    /// `usergroups.create`
    async fn create_user_group(
        &self,
        team_id: &str,
        name: &str,
        handle: &str,
        description: Option<&str>,
    ) -> SlackResult<UserGroup>;

    /// `usergroups.update`
    async fn update_user_group(
        &self,
        group_id: &str,
        team_id: &str,
        req: &UserGroupReq,
    ) -> SlackResult<UserGroup>;

    /// `usergroups.disable`
    async fn disable_user_group(&self, group_id: &str, team_id: &str) -> SlackResult<UserGroup>;

    /// `usergroups.enable`
    async fn enable_user_group(&self, group_id: &str, team_id: &str) -> SlackResult<UserGroup>;

    /// `usergroups.list` with users and counts included
    async fn list_user_groups(
        &self,
        team_id: &str,
        include_disabled: bool,
    ) -> SlackResult<Vec<UserGroup>>;

    /// `usergroups.users.list`
    async fn list_user_group_members(
        &self,
        group_id: &str,
        team_id: &str,
        include_disabled: bool,
    ) -> SlackResult<Vec<String>>;

    /// `usergroups.users.update`; `users` is a comma separated id list
    async fn update_user_group_members(
        &self,
        group_id: &str,
        team_id: &str,
        users: &str,
    ) -> SlackResult<UserGroup>;

    /// `users.info`
    async fn user_info(&self, user_id: &str) -> SlackResult<SlackUser>;

    /// `users.lookupByEmail`
    async fn lookup_user_by_email(&self, email: &str) -> SlackResult<SlackUser>;
}
