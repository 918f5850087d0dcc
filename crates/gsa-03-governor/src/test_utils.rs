//! In-memory Governor for tests.
//!
//! Applications, types, groups and users are seeded through builder
//! methods; group member listings are derived from the seeded users so a
//! test only has to describe each group's member ids once.
//! Enable with the `test-utils` feature flag.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{Application, ApplicationType, Group, GroupMember, User, UserStatus};

use crate::error::{GovernorError, GovernorResult};
use crate::ports::GovernorApi;

#[derive(Default)]
struct State {
    types: Vec<ApplicationType>,
    applications: Vec<Application>,
    groups: Vec<Group>,
    users: Vec<User>,
    failures: HashMap<&'static str, VecDeque<GovernorError>>,
}

impl State {
    fn fail(&mut self, op: &'static str) -> GovernorResult<()> {
        match self.failures.get_mut(op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// [`GovernorApi`] over in-memory records.
pub struct InMemoryGovernor {
    url: String,
    state: Mutex<State>,
}

impl Default for InMemoryGovernor {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGovernor {
    pub fn new() -> Self {
        Self {
            url: "https://governor.example.com".to_string(),
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_application_type(self, id: &str, slug: &str) -> Self {
        self.state.lock().types.push(ApplicationType {
            id: id.to_string(),
            name: slug.to_string(),
            slug: slug.to_string(),
        });
        self
    }

    /// Seed an application. The expanded `type` is filled from seeded types.
    pub fn with_application(self, id: &str, name: &str, type_id: &str) -> Self {
        {
            let mut state = self.state.lock();
            let app_type = state.types.iter().find(|t| t.id == type_id).cloned();
            state.applications.push(Application {
                id: id.to_string(),
                name: name.to_string(),
                slug: name.to_lowercase().replace(' ', "-"),
                type_id: Some(type_id.to_string()).filter(|t| !t.is_empty()),
                app_type,
            });
        }
        self
    }

    pub fn with_group(self, group: Group) -> Self {
        self.state.lock().groups.push(group);
        self
    }

    pub fn with_user(self, id: &str, email: &str, status: UserStatus) -> Self {
        self.state.lock().users.push(User {
            id: id.to_string(),
            name: id.to_string(),
            email: email.to_string(),
            status: Some(status),
        });
        self
    }

    /// Replace a group's member ids.
    pub fn set_group_members(&self, group_id: &str, members: &[&str]) {
        if let Some(group) = self.state.lock().groups.iter_mut().find(|g| g.id == group_id) {
            group.members = members.iter().map(|m| m.to_string()).collect();
        }
    }

    /// Make the next call of `op` (the trait method name) fail.
    pub fn fail_next(&self, op: &'static str, err: GovernorError) {
        self.state.lock().failures.entry(op).or_default().push_back(err);
    }
}

#[async_trait]
impl GovernorApi for InMemoryGovernor {
    async fn application(&self, id: &str) -> GovernorResult<Application> {
        let mut state = self.state.lock();
        state.fail("application")?;
        state
            .applications
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or(GovernorError::NotFound)
    }

    async fn applications(&self) -> GovernorResult<Vec<Application>> {
        let mut state = self.state.lock();
        state.fail("applications")?;
        Ok(state.applications.clone())
    }

    async fn application_types(&self) -> GovernorResult<Vec<ApplicationType>> {
        let mut state = self.state.lock();
        state.fail("application_types")?;
        Ok(state.types.clone())
    }

    async fn application_groups(&self, id: &str) -> GovernorResult<Vec<Group>> {
        let mut state = self.state.lock();
        state.fail("application_groups")?;
        Ok(state
            .groups
            .iter()
            .filter(|g| g.applications.iter().any(|a| a == id))
            .cloned()
            .collect())
    }

    async fn group(&self, id: &str, _deleted: bool) -> GovernorResult<Group> {
        let mut state = self.state.lock();
        state.fail("group")?;
        state
            .groups
            .iter()
            .find(|g| g.id == id)
            .cloned()
            .ok_or(GovernorError::NotFound)
    }

    async fn group_members(&self, id: &str) -> GovernorResult<Vec<GroupMember>> {
        let mut state = self.state.lock();
        state.fail("group_members")?;

        let group = state
            .groups
            .iter()
            .find(|g| g.id == id)
            .ok_or(GovernorError::NotFound)?;

        Ok(group
            .members
            .iter()
            .filter_map(|m| state.users.iter().find(|u| &u.id == m))
            .map(|u| GroupMember {
                id: u.id.clone(),
                name: u.name.clone(),
                email: u.email.clone(),
                status: u.status,
            })
            .collect())
    }

    async fn user(&self, id: &str, _deleted: bool) -> GovernorResult<User> {
        let mut state = self.state.lock();
        state.fail("user")?;
        state
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(GovernorError::NotFound)
    }

    fn url(&self) -> &str {
        &self.url
    }
}
