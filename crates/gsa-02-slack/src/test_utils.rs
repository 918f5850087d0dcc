//! In-memory Slack Web API for tests.
//!
//! [`FakeSlackApi`] keeps workspaces, user groups and users in memory,
//! answers with the same error codes the real API uses, and records every
//! call so tests can assert on the exact mutations issued.
//! Enable with the `test-utils` feature flag.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{SlackUser, SlackUserProfile, UserGroup, UserGroupReq, Workspace};
use crate::error::{
    SlackError, SlackResult, CODE_NAME_ALREADY_EXISTS, CODE_NO_SUCH_SUBTEAM, CODE_TEAM_NOT_FOUND,
    CODE_USERS_NOT_FOUND, CODE_USER_NOT_FOUND,
};
use crate::ports::SlackApi;

/// One recorded Web API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlackCall {
    ListTeams,
    CreateUserGroup {
        team_id: String,
        name: String,
        handle: String,
        description: Option<String>,
    },
    UpdateUserGroup {
        group_id: String,
        req: UserGroupReq,
    },
    DisableUserGroup {
        group_id: String,
    },
    EnableUserGroup {
        group_id: String,
    },
    ListUserGroups {
        team_id: String,
        include_disabled: bool,
    },
    ListUserGroupMembers {
        group_id: String,
    },
    UpdateUserGroupMembers {
        group_id: String,
        users: String,
    },
    UserInfo {
        user_id: String,
    },
    LookupUserByEmail {
        email: String,
    },
}

impl SlackCall {
    /// Web API method name, also the key for [`FakeSlackApi::fail_next`].
    pub fn method(&self) -> &'static str {
        match self {
            SlackCall::ListTeams => "auth.teams.list",
            SlackCall::CreateUserGroup { .. } => "usergroups.create",
            SlackCall::UpdateUserGroup { .. } => "usergroups.update",
            SlackCall::DisableUserGroup { .. } => "usergroups.disable",
            SlackCall::EnableUserGroup { .. } => "usergroups.enable",
            SlackCall::ListUserGroups { .. } => "usergroups.list",
            SlackCall::ListUserGroupMembers { .. } => "usergroups.users.list",
            SlackCall::UpdateUserGroupMembers { .. } => "usergroups.users.update",
            SlackCall::UserInfo { .. } => "users.info",
            SlackCall::LookupUserByEmail { .. } => "users.lookupByEmail",
        }
    }

    /// Whether the call changes Slack state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            SlackCall::CreateUserGroup { .. }
                | SlackCall::UpdateUserGroup { .. }
                | SlackCall::DisableUserGroup { .. }
                | SlackCall::EnableUserGroup { .. }
                | SlackCall::UpdateUserGroupMembers { .. }
        )
    }
}

#[derive(Default)]
struct FakeState {
    workspaces: Vec<Workspace>,
    groups: Vec<UserGroup>,
    users: Vec<SlackUser>,
    calls: Vec<SlackCall>,
    failures: HashMap<&'static str, VecDeque<SlackError>>,
    next_group: u64,
    clock: i64,
}

impl FakeState {
    fn record(&mut self, call: SlackCall) -> SlackResult<()> {
        let method = call.method();
        self.calls.push(call);

        match self.failures.get_mut(method).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn has_team(&self, team_id: &str) -> bool {
        self.workspaces.iter().any(|w| w.id == team_id)
    }

    fn group_mut(&mut self, group_id: &str) -> SlackResult<&mut UserGroup> {
        self.groups
            .iter_mut()
            .find(|g| g.id == group_id)
            .ok_or_else(|| SlackError::Api(CODE_NO_SUCH_SUBTEAM.to_string()))
    }
}

/// Recording in-memory [`SlackApi`].
#[derive(Default)]
pub struct FakeSlackApi {
    state: Mutex<FakeState>,
}

impl FakeSlackApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workspace(self, id: &str, name: &str) -> Self {
        self.state.lock().workspaces.push(Workspace {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub fn with_user(self, id: &str, email: &str) -> Self {
        self.state.lock().users.push(SlackUser {
            id: id.to_string(),
            name: email.split('@').next().unwrap_or_default().to_string(),
            profile: SlackUserProfile {
                email: email.to_string(),
                real_name: String::new(),
            },
            ..Default::default()
        });
        self
    }

    /// Seed an existing user group, returning its id.
    pub fn add_user_group(&self, team_id: &str, name: &str, handle: &str, members: &[&str]) -> String {
        let mut state = self.state.lock();
        state.next_group += 1;
        let id = format!("S{:04}", state.next_group);

        state.groups.push(UserGroup {
            id: id.clone(),
            team_id: team_id.to_string(),
            name: name.to_string(),
            handle: handle.to_string(),
            users: members.iter().map(|m| m.to_string()).collect(),
            user_count: members.len() as u64,
            ..Default::default()
        });
        id
    }

    /// Make the next call to `method` fail with `err`. Queued failures are
    /// consumed in order.
    pub fn fail_next(&self, method: &'static str, err: SlackError) {
        self.state
            .lock()
            .failures
            .entry(method)
            .or_default()
            .push_back(err);
    }

    pub fn calls(&self) -> Vec<SlackCall> {
        self.state.lock().calls.clone()
    }

    pub fn mutations(&self) -> Vec<SlackCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    pub fn mutation_count(&self) -> usize {
        self.state.lock().calls.iter().filter(|c| c.is_mutation()).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn user_group(&self, id: &str) -> Option<UserGroup> {
        self.state.lock().groups.iter().find(|g| g.id == id).cloned()
    }

    pub fn user_group_by_name(&self, team_id: &str, name: &str) -> Option<UserGroup> {
        self.state
            .lock()
            .groups
            .iter()
            .find(|g| g.team_id == team_id && g.name == name)
            .cloned()
    }
}

#[async_trait]
impl SlackApi for FakeSlackApi {
    async fn list_teams(&self, _limit: u32) -> SlackResult<Vec<Workspace>> {
        let mut state = self.state.lock();
        state.record(SlackCall::ListTeams)?;
        Ok(state.workspaces.clone())
    }

    async fn create_user_group(
        &self,
        team_id: &str,
        name: &str,
        handle: &str,
        description: Option<&str>,
    ) -> SlackResult<UserGroup> {
        let mut state = self.state.lock();
        state.record(SlackCall::CreateUserGroup {
            team_id: team_id.to_string(),
            name: name.to_string(),
            handle: handle.to_string(),
            description: description.map(str::to_string),
        })?;

        if !state.has_team(team_id) {
            return Err(SlackError::Api(CODE_TEAM_NOT_FOUND.to_string()));
        }
        if state.groups.iter().any(|g| g.team_id == team_id && g.name == name) {
            return Err(SlackError::Api(CODE_NAME_ALREADY_EXISTS.to_string()));
        }

        state.next_group += 1;
        let ug = UserGroup {
            id: format!("S{:04}", state.next_group),
            team_id: team_id.to_string(),
            name: name.to_string(),
            handle: handle.to_string(),
            description: description.unwrap_or_default().to_string(),
            ..Default::default()
        };
        state.groups.push(ug.clone());
        Ok(ug)
    }

    async fn update_user_group(
        &self,
        group_id: &str,
        _team_id: &str,
        req: &UserGroupReq,
    ) -> SlackResult<UserGroup> {
        let mut state = self.state.lock();
        state.record(SlackCall::UpdateUserGroup {
            group_id: group_id.to_string(),
            req: req.clone(),
        })?;

        let ug = state.group_mut(group_id)?;
        if let Some(name) = &req.name {
            ug.name = name.clone();
        }
        if let Some(handle) = &req.handle {
            ug.handle = handle.clone();
        }
        if let Some(description) = &req.description {
            ug.description = description.clone();
        }
        Ok(ug.clone())
    }

    async fn disable_user_group(&self, group_id: &str, _team_id: &str) -> SlackResult<UserGroup> {
        let mut state = self.state.lock();
        state.record(SlackCall::DisableUserGroup {
            group_id: group_id.to_string(),
        })?;

        state.clock += 1;
        let now = state.clock;
        let ug = state.group_mut(group_id)?;
        ug.date_delete = now;
        Ok(ug.clone())
    }

    async fn enable_user_group(&self, group_id: &str, _team_id: &str) -> SlackResult<UserGroup> {
        let mut state = self.state.lock();
        state.record(SlackCall::EnableUserGroup {
            group_id: group_id.to_string(),
        })?;

        let ug = state.group_mut(group_id)?;
        ug.date_delete = 0;
        Ok(ug.clone())
    }

    async fn list_user_groups(
        &self,
        team_id: &str,
        include_disabled: bool,
    ) -> SlackResult<Vec<UserGroup>> {
        let mut state = self.state.lock();
        state.record(SlackCall::ListUserGroups {
            team_id: team_id.to_string(),
            include_disabled,
        })?;

        if !state.has_team(team_id) {
            return Err(SlackError::Api(CODE_TEAM_NOT_FOUND.to_string()));
        }

        Ok(state
            .groups
            .iter()
            .filter(|g| g.team_id == team_id && (include_disabled || !g.is_disabled()))
            .cloned()
            .collect())
    }

    async fn list_user_group_members(
        &self,
        group_id: &str,
        _team_id: &str,
        _include_disabled: bool,
    ) -> SlackResult<Vec<String>> {
        let mut state = self.state.lock();
        state.record(SlackCall::ListUserGroupMembers {
            group_id: group_id.to_string(),
        })?;

        Ok(state.group_mut(group_id)?.users.clone())
    }

    async fn update_user_group_members(
        &self,
        group_id: &str,
        _team_id: &str,
        users: &str,
    ) -> SlackResult<UserGroup> {
        let mut state = self.state.lock();
        state.record(SlackCall::UpdateUserGroupMembers {
            group_id: group_id.to_string(),
            users: users.to_string(),
        })?;

        let ug = state.group_mut(group_id)?;
        ug.users = users.split(',').map(str::to_string).collect();
        ug.user_count = ug.users.len() as u64;
        Ok(ug.clone())
    }

    async fn user_info(&self, user_id: &str) -> SlackResult<SlackUser> {
        let mut state = self.state.lock();
        state.record(SlackCall::UserInfo {
            user_id: user_id.to_string(),
        })?;

        state
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| SlackError::Api(CODE_USERS_NOT_FOUND.to_string()))
    }

    async fn lookup_user_by_email(&self, email: &str) -> SlackResult<SlackUser> {
        let mut state = self.state.lock();
        state.record(SlackCall::LookupUserByEmail {
            email: email.to_string(),
        })?;

        state
            .users
            .iter()
            .find(|u| u.profile.email.eq_ignore_ascii_case(email))
            .cloned()
            .ok_or_else(|| SlackError::Api(CODE_USER_NOT_FOUND.to_string()))
    }
}
