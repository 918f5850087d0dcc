//! Slack client service
//!
//! Validates parameters before any network call, normalizes the Web API's
//! "not found" and "already exists" codes into [`SlackError`] variants, and
//! retries user lookups on transient failures.

use std::sync::Arc;

use tracing::debug;

use crate::domain::{SlackUser, UserGroup, UserGroupReq, Workspace};
use crate::error::{
    SlackError, SlackResult, CODE_NAME_ALREADY_EXISTS, CODE_NO_SUCH_SUBTEAM,
    CODE_SUBTEAM_NOT_FOUND, CODE_TEAM_NOT_FOUND, CODE_USERS_NOT_FOUND, CODE_USER_NOT_FOUND,
};
use crate::ports::SlackApi;
use crate::retry::RetryPolicy;

/// Page size for `auth.teams.list`.
const LIST_TEAMS_LIMIT: u32 = 100;

const GROUP_NOT_FOUND_CODES: &[&str] = &[CODE_NO_SUCH_SUBTEAM, CODE_SUBTEAM_NOT_FOUND];

fn normalize(err: SlackError, codes: &[&str], to: SlackError) -> SlackError {
    if err.is_api_code(codes) {
        to
    } else {
        err
    }
}

/// Typed Slack access shared by the engine and the sweep.
#[derive(Clone)]
pub struct SlackClient {
    api: Arc<dyn SlackApi>,
    retry: RetryPolicy,
}

impl SlackClient {
    pub fn new(api: Arc<dyn SlackApi>) -> Self {
        Self::with_retry(api, RetryPolicy::default())
    }

    pub fn with_retry(api: Arc<dyn SlackApi>, retry: RetryPolicy) -> Self {
        Self { api, retry }
    }

    /// All workspaces the token can see. On Enterprise Grid this is every
    /// workspace in the organization.
    pub async fn list_workspaces(&self) -> SlackResult<Vec<Workspace>> {
        debug!("getting slack workspaces");

        let teams = self.api.list_teams(LIST_TEAMS_LIMIT).await?;

        debug!(count = teams.len(), "returning slack workspaces");
        Ok(teams)
    }

    /// Create a user group. Name and handle are required.
    pub async fn create_user_group(
        &self,
        team_id: &str,
        req: &UserGroupReq,
    ) -> SlackResult<UserGroup> {
        if team_id.is_empty() {
            return Err(SlackError::BadParameter);
        }

        let (Some(name), Some(handle)) = (req.name.as_deref(), req.handle.as_deref()) else {
            return Err(SlackError::MissingUserGroupParameter);
        };

        debug!(slack_workspace_id = team_id, ?req, "creating slack user group");

        let ug = self
            .api
            .create_user_group(team_id, name, handle, req.description.as_deref())
            .await
            .map_err(|e| normalize(e, &[CODE_NAME_ALREADY_EXISTS], SlackError::GroupAlreadyExists))?;

        debug!(slack_usergroup_id = %ug.id, "created slack user group");
        Ok(ug)
    }

    /// Disable a user group. Slack has no delete.
    pub async fn disable_user_group(&self, group_id: &str, team_id: &str) -> SlackResult<UserGroup> {
        if group_id.is_empty() || team_id.is_empty() {
            return Err(SlackError::BadParameter);
        }

        debug!(slack_usergroup_id = group_id, slack_workspace_id = team_id, "disabling slack user group");

        let ug = self
            .api
            .disable_user_group(group_id, team_id)
            .await
            .map_err(|e| normalize(e, GROUP_NOT_FOUND_CODES, SlackError::GroupNotFound))?;

        debug!(slack_usergroup_id = %ug.id, "disabled slack user group");
        Ok(ug)
    }

    /// Re-enable a disabled user group.
    pub async fn enable_user_group(&self, group_id: &str, team_id: &str) -> SlackResult<UserGroup> {
        if group_id.is_empty() || team_id.is_empty() {
            return Err(SlackError::BadParameter);
        }

        debug!(slack_usergroup_id = group_id, slack_workspace_id = team_id, "enabling slack user group");

        let ug = self
            .api
            .enable_user_group(group_id, team_id)
            .await
            .map_err(|e| normalize(e, GROUP_NOT_FOUND_CODES, SlackError::GroupNotFound))?;

        debug!(slack_usergroup_id = %ug.id, "enabled slack user group");
        Ok(ug)
    }

    /// All user groups in a workspace, members included.
    pub async fn get_user_groups(
        &self,
        team_id: &str,
        include_disabled: bool,
    ) -> SlackResult<Vec<UserGroup>> {
        if team_id.is_empty() {
            return Err(SlackError::BadParameter);
        }

        debug!(slack_workspace_id = team_id, include_disabled, "getting slack user groups");

        let groups = self
            .api
            .list_user_groups(team_id, include_disabled)
            .await
            .map_err(|e| normalize(e, &[CODE_TEAM_NOT_FOUND], SlackError::WorkspaceNotFound))?;

        debug!(count = groups.len(), "returning slack user groups");
        Ok(groups)
    }

    pub async fn get_user_group_members(
        &self,
        group_id: &str,
        team_id: &str,
        include_disabled: bool,
    ) -> SlackResult<Vec<String>> {
        if group_id.is_empty() || team_id.is_empty() {
            return Err(SlackError::BadParameter);
        }

        debug!(
            slack_usergroup_id = group_id,
            slack_workspace_id = team_id,
            include_disabled,
            "getting slack user group members"
        );

        let members = self
            .api
            .list_user_group_members(group_id, team_id, include_disabled)
            .await
            .map_err(|e| normalize(e, GROUP_NOT_FOUND_CODES, SlackError::GroupNotFound))?;

        debug!(slack_usergroup_members = ?members, "returning slack user group members");
        Ok(members)
    }

    /// Update name, handle or description. At least one must be set.
    pub async fn update_user_group(
        &self,
        group_id: &str,
        team_id: &str,
        req: &UserGroupReq,
    ) -> SlackResult<UserGroup> {
        if group_id.is_empty() || team_id.is_empty() {
            return Err(SlackError::BadParameter);
        }

        if req.is_empty() {
            return Err(SlackError::MissingUserGroupParameter);
        }

        debug!(slack_usergroup_id = group_id, slack_workspace_id = team_id, ?req, "updating slack user group");

        let ug = self.api.update_user_group(group_id, team_id, req).await?;

        debug!(slack_usergroup_id = %ug.id, "updated slack user group");
        Ok(ug)
    }

    /// Replace the member list of a user group.
    ///
    /// Slack refuses to empty a group, so an empty `members` is rejected
    /// with [`SlackError::EmptyUserGroupMembers`] without calling the API.
    pub async fn update_user_group_members(
        &self,
        group_id: &str,
        team_id: &str,
        members: &[String],
    ) -> SlackResult<UserGroup> {
        if group_id.is_empty() || team_id.is_empty() {
            return Err(SlackError::BadParameter);
        }

        if members.is_empty() {
            return Err(SlackError::EmptyUserGroupMembers);
        }

        debug!(
            slack_usergroup_id = group_id,
            slack_workspace_id = team_id,
            slack_usergroup_members = ?members,
            "updating slack user group members"
        );

        let ug = self
            .api
            .update_user_group_members(group_id, team_id, &members.join(","))
            .await
            .map_err(|e| normalize(e, GROUP_NOT_FOUND_CODES, SlackError::GroupNotFound))?;

        debug!(slack_usergroup_id = %ug.id, "updated slack user group members");
        Ok(ug)
    }

    /// Look up a user by Slack id.
    pub async fn get_user(&self, id: &str) -> SlackResult<SlackUser> {
        if id.is_empty() {
            return Err(SlackError::BadParameter);
        }

        debug!(slack_user_id = id, "getting slack user info");

        let user = self
            .retry
            .execute("users.info", || self.api.user_info(id))
            .await
            .map_err(|e| normalize(e, &[CODE_USERS_NOT_FOUND], SlackError::UserNotFound))?;

        debug!(slack_user_id = %user.id, "returning slack user info");
        Ok(user)
    }

    /// Look up a user by email address.
    pub async fn get_user_by_email(&self, email: &str) -> SlackResult<SlackUser> {
        if email.is_empty() {
            return Err(SlackError::BadParameter);
        }

        debug!(user_email = email, "getting slack user info");

        let user = self
            .retry
            .execute("users.lookupByEmail", || self.api.lookup_user_by_email(email))
            .await
            .map_err(|e| normalize(e, &[CODE_USER_NOT_FOUND], SlackError::UserNotFound))?;

        debug!(slack_user_id = %user.id, "returning slack user info");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeSlackApi, SlackCall};
    use std::time::Duration;

    fn client() -> (SlackClient, Arc<FakeSlackApi>) {
        let api = Arc::new(FakeSlackApi::new().with_workspace("T1", "Acme"));
        (SlackClient::new(api.clone()), api)
    }

    fn req(name: &str, handle: &str) -> UserGroupReq {
        UserGroupReq {
            name: Some(name.to_string()),
            handle: Some(handle.to_string()),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_create_requires_team_and_fields() {
        let (client, api) = client();

        assert_eq!(
            client.create_user_group("", &req("n", "h")).await,
            Err(SlackError::BadParameter)
        );
        assert_eq!(
            client
                .create_user_group("T1", &UserGroupReq { name: Some("n".into()), ..Default::default() })
                .await,
            Err(SlackError::MissingUserGroupParameter)
        );
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_duplicate_is_normalized() {
        let (client, _) = client();

        client.create_user_group("T1", &req("[Governor] Ops", "ops")).await.unwrap();

        assert_eq!(
            client.create_user_group("T1", &req("[Governor] Ops", "ops")).await,
            Err(SlackError::GroupAlreadyExists)
        );
    }

    #[tokio::test]
    async fn test_group_not_found_codes_normalized() {
        let (client, api) = client();

        assert_eq!(client.disable_user_group("S404", "T1").await, Err(SlackError::GroupNotFound));
        assert_eq!(client.enable_user_group("S404", "T1").await, Err(SlackError::GroupNotFound));
        assert_eq!(
            client.get_user_group_members("S404", "T1", false).await,
            Err(SlackError::GroupNotFound)
        );

        api.fail_next("usergroups.users.update", SlackError::Api(CODE_SUBTEAM_NOT_FOUND.into()));
        assert_eq!(
            client.update_user_group_members("S1", "T1", &["U1".to_string()]).await,
            Err(SlackError::GroupNotFound)
        );
    }

    #[tokio::test]
    async fn test_unknown_workspace_normalized() {
        let (client, _) = client();

        assert_eq!(client.get_user_groups("T404", false).await, Err(SlackError::WorkspaceNotFound));
    }

    #[tokio::test]
    async fn test_update_requires_a_field() {
        let (client, _) = client();

        assert_eq!(
            client.update_user_group("S1", "T1", &UserGroupReq::default()).await,
            Err(SlackError::MissingUserGroupParameter)
        );
        assert_eq!(
            client.update_user_group("", "T1", &req("n", "h")).await,
            Err(SlackError::BadParameter)
        );
    }

    #[tokio::test]
    async fn test_update_members_rejects_empty_list() {
        let (client, api) = client();

        assert_eq!(
            client.update_user_group_members("S1", "T1", &[]).await,
            Err(SlackError::EmptyUserGroupMembers)
        );
        assert_eq!(api.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_update_members_joins_ids() {
        let (client, api) = client();
        let ug = client.create_user_group("T1", &req("g", "g")).await.unwrap();

        client
            .update_user_group_members(&ug.id, "T1", &["U1".to_string(), "U2".to_string()])
            .await
            .unwrap();

        assert!(api.calls().contains(&SlackCall::UpdateUserGroupMembers {
            group_id: ug.id.clone(),
            users: "U1,U2".to_string(),
        }));
    }

    #[tokio::test]
    async fn test_user_lookups_normalize_not_found() {
        let (client, _) = client();

        assert_eq!(client.get_user("U404").await, Err(SlackError::UserNotFound));
        assert_eq!(
            client.get_user_by_email("nobody@example.com").await,
            Err(SlackError::UserNotFound)
        );
        assert_eq!(client.get_user("").await, Err(SlackError::BadParameter));
        assert_eq!(client.get_user_by_email("").await, Err(SlackError::BadParameter));
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_lookup_retries_service_unavailable() {
        let api = Arc::new(FakeSlackApi::new().with_user("U1", "alice@example.com"));
        let client = SlackClient::new(api.clone());
        api.fail_next("users.lookupByEmail", SlackError::ServiceUnavailable);
        api.fail_next("users.lookupByEmail", SlackError::ServiceUnavailable);

        let user = client.get_user_by_email("alice@example.com").await.unwrap();

        assert_eq!(user.id, "U1");
        assert_eq!(
            api.calls()
                .iter()
                .filter(|c| matches!(c, SlackCall::LookupUserByEmail { .. }))
                .count(),
            3
        );
    }

    #[tokio::test]
    async fn test_mutations_are_not_retried() {
        let api = Arc::new(FakeSlackApi::new().with_workspace("T1", "Acme"));
        let client = SlackClient::with_retry(api.clone(), RetryPolicy::new(3, Duration::ZERO));
        api.fail_next("usergroups.create", SlackError::ServiceUnavailable);

        assert_eq!(
            client.create_user_group("T1", &req("g", "g")).await,
            Err(SlackError::ServiceUnavailable)
        );
        assert_eq!(api.calls().len(), 1);
    }
}
