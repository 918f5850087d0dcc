//! Governor change events and the subjects they arrive on.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, DispatchResult};

pub const SUFFIX_APPS: &str = "apps";
pub const SUFFIX_GROUPS: &str = "groups";
pub const SUFFIX_MEMBERS: &str = "members";

pub const ACTION_CREATE: &str = "CREATE";
pub const ACTION_DELETE: &str = "DELETE";

/// A Governor `v1alpha1` event payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernorEvent {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub group_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub application_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_id: Option<String>,
}

impl GovernorEvent {
    /// Decode and validate a payload. Every family needs a group id.
    pub fn decode(payload: &[u8]) -> DispatchResult<Self> {
        let event: GovernorEvent = serde_json::from_slice(payload)?;

        if event.group_id.is_empty() {
            return Err(DispatchError::EventMissingGroupID);
        }

        Ok(event)
    }

    pub fn action(&self) -> EventAction {
        match self.action.as_str() {
            ACTION_CREATE => EventAction::Create,
            ACTION_DELETE => EventAction::Delete,
            _ => EventAction::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    Create,
    Delete,
    Unknown,
}

/// Event family, taken from the last subject token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventFamily {
    /// A group was linked to or unlinked from an application.
    Applications,
    /// A group was created, updated or deleted.
    Groups,
    /// A user joined or left a group.
    Members,
}

impl EventFamily {
    pub const ALL: [EventFamily; 3] = [
        EventFamily::Applications,
        EventFamily::Groups,
        EventFamily::Members,
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            EventFamily::Applications => SUFFIX_APPS,
            EventFamily::Groups => SUFFIX_GROUPS,
            EventFamily::Members => SUFFIX_MEMBERS,
        }
    }

    /// Subject for this family under `prefix`.
    pub fn subject(&self, prefix: &str) -> String {
        format!("{}.{}", prefix, self.suffix())
    }

    pub fn from_subject(subject: &str) -> DispatchResult<Self> {
        match subject.rsplit('.').next() {
            Some(SUFFIX_APPS) => Ok(EventFamily::Applications),
            Some(SUFFIX_GROUPS) => Ok(EventFamily::Groups),
            Some(SUFFIX_MEMBERS) => Ok(EventFamily::Members),
            _ => Err(DispatchError::UnknownSubject(subject.to_string())),
        }
    }
}

/// A delivered bus message, independent of the bus client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub subject: String,
    pub payload: Bytes,
}

impl InboundMessage {
    pub fn new(subject: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            subject: subject.into(),
            payload: payload.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_application_event() {
        let event = GovernorEvent::decode(
            br#"{"version": "v1alpha1", "action": "CREATE", "group_id": "g1",
                 "application_id": "a1", "audit_id": "aud-1"}"#,
        )
        .unwrap();

        assert_eq!(event.action(), EventAction::Create);
        assert_eq!(event.group_id, "g1");
        assert_eq!(event.application_id, "a1");
        assert_eq!(event.user_id, "");
        assert_eq!(event.audit_id.as_deref(), Some("aud-1"));
    }

    #[test]
    fn test_decode_requires_group_id() {
        assert_eq!(
            GovernorEvent::decode(br#"{"version": "v1alpha1", "action": "CREATE", "user_id": "u1"}"#),
            Err(DispatchError::EventMissingGroupID)
        );
        assert_eq!(
            GovernorEvent::decode(br#"{"action": "DELETE", "group_id": ""}"#),
            Err(DispatchError::EventMissingGroupID)
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            GovernorEvent::decode(b"not json"),
            Err(DispatchError::Decode(_))
        ));
    }

    #[test]
    fn test_unknown_action() {
        let event = GovernorEvent::decode(br#"{"action": "UPDATE", "group_id": "g1"}"#).unwrap();
        assert_eq!(event.action(), EventAction::Unknown);

        let event = GovernorEvent::decode(br#"{"action": "create", "group_id": "g1"}"#).unwrap();
        assert_eq!(event.action(), EventAction::Unknown);
    }

    #[test]
    fn test_family_from_subject() {
        assert_eq!(EventFamily::from_subject("governor.events.apps"), Ok(EventFamily::Applications));
        assert_eq!(EventFamily::from_subject("governor.events.groups"), Ok(EventFamily::Groups));
        assert_eq!(EventFamily::from_subject("members"), Ok(EventFamily::Members));
        assert_eq!(
            EventFamily::from_subject("governor.events.users"),
            Err(DispatchError::UnknownSubject("governor.events.users".into()))
        );
    }

    #[test]
    fn test_family_subjects() {
        let subjects: Vec<_> = EventFamily::ALL.iter().map(|f| f.subject("governor.events")).collect();

        assert_eq!(
            subjects,
            vec!["governor.events.apps", "governor.events.groups", "governor.events.members"]
        );
    }
}
