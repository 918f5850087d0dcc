//! Slack records as returned by the Web API

use serde::{Deserialize, Serialize};

/// A Slack workspace ("team" in the Web API).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
}

/// A Slack user group ("subteam").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroup {
    pub id: String,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub description: String,
    /// Unix timestamp of when the group was disabled; zero while enabled.
    #[serde(default)]
    pub date_delete: i64,
    /// Member user ids. Only populated when listed with users included.
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub user_count: u64,
}

impl UserGroup {
    pub fn is_disabled(&self) -> bool {
        self.date_delete != 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackUserProfile {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub real_name: String,
}

/// A Slack user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackUser {
    pub id: String,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub profile: SlackUserProfile,
}

/// Fields for creating or updating a user group. `None` leaves a field
/// untouched on update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserGroupReq {
    pub name: Option<String>,
    pub handle: Option<String>,
    pub description: Option<String>,
}

impl UserGroupReq {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.handle.is_none() && self.description.is_none()
    }
}
