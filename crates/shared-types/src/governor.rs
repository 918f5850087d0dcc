//! # Governor Records
//!
//! Snapshots of the Governor `v1alpha1` API resources the reconciler reads.
//! Unknown fields are ignored; optional fields default so partially populated
//! payloads (e.g. a group fetched without members) still decode.

use serde::{Deserialize, Serialize};

/// An application registered in Governor (e.g. one Slack workspace).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    /// Identifier of the application type, `null` for untyped applications.
    #[serde(default)]
    pub type_id: Option<String>,
    /// Expanded application type, when the API includes it.
    #[serde(default, rename = "type")]
    pub app_type: Option<ApplicationType>,
}

impl Application {
    /// Slug of the expanded application type, if any.
    pub fn type_slug(&self) -> Option<&str> {
        self.app_type.as_ref().map(|t| t.slug.as_str())
    }
}

/// An application type (`slack`, `github`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationType {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

/// A Governor group: the source of truth for membership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    /// Governor user ids of the members.
    #[serde(default)]
    pub members: Vec<String>,
    /// Ids of the applications the group is linked to.
    #[serde(default)]
    pub applications: Vec<String>,
}

impl Group {
    /// Whether the given Governor user id is listed as a member.
    pub fn has_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m == user_id)
    }
}

/// A member entry as returned by the group members endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub status: Option<UserStatus>,
}

impl GroupMember {
    pub fn is_pending(&self) -> bool {
        self.status == Some(UserStatus::Pending)
    }
}

/// Lifecycle status of a Governor user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Pending,
    Suspended,
    #[serde(other)]
    Unknown,
}

/// A Governor user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub status: Option<UserStatus>,
}

impl User {
    /// Pending users have not accepted their invitation and are never synced.
    pub fn is_pending(&self) -> bool {
        self.status == Some(UserStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_decodes_type() {
        let app: Application = serde_json::from_str(
            r#"{"id": "101", "name": "Test Slack workspace", "slug": "test-slack-workspace",
                "type_id": "t-1", "type": {"id": "t-1", "name": "Slack", "slug": "slack"}}"#,
        )
        .unwrap();

        assert_eq!(app.name, "Test Slack workspace");
        assert_eq!(app.type_slug(), Some("slack"));
    }

    #[test]
    fn test_application_without_type() {
        let app: Application =
            serde_json::from_str(r#"{"id": "103", "name": "github-org", "type_id": null}"#).unwrap();

        assert_eq!(app.type_id, None);
        assert_eq!(app.type_slug(), None);
    }

    #[test]
    fn test_group_membership() {
        let group: Group = serde_json::from_str(
            r#"{"id": "g1", "name": "Ops", "slug": "ops", "members": ["u1", "u2"]}"#,
        )
        .unwrap();

        assert!(group.has_member("u1"));
        assert!(!group.has_member("u3"));
        assert!(group.applications.is_empty());
    }

    #[test]
    fn test_user_status() {
        let pending: User =
            serde_json::from_str(r#"{"id": "u1", "email": "a@x.com", "status": "pending"}"#).unwrap();
        let active: User =
            serde_json::from_str(r#"{"id": "u2", "email": "b@x.com", "status": "active"}"#).unwrap();
        let odd: User =
            serde_json::from_str(r#"{"id": "u3", "email": "c@x.com", "status": "frozen"}"#).unwrap();
        let missing: User = serde_json::from_str(r#"{"id": "u4", "email": "d@x.com"}"#).unwrap();

        assert!(pending.is_pending());
        assert!(!active.is_pending());
        assert_eq!(odd.status, Some(UserStatus::Unknown));
        assert!(!missing.is_pending());
    }

    #[test]
    fn test_group_member_status() {
        let members: Vec<GroupMember> = serde_json::from_str(
            r#"[{"id": "u1", "email": "a@x.com", "status": "pending"},
                {"id": "u2", "email": "b@x.com"}]"#,
        )
        .unwrap();

        assert!(members[0].is_pending());
        assert!(!members[1].is_pending());
    }
}
