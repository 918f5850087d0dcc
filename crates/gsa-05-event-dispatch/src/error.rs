//! Error types for event dispatch

use thiserror::Error;

/// Reasons a delivered message is discarded before reaching the engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("event missing group ID")]
    EventMissingGroupID,

    /// Payload is not a Governor event
    #[error("unable to unmarshal governor payload: {0}")]
    Decode(String),

    /// Subject does not end in a known event family
    #[error("unknown subject: {0}")]
    UnknownSubject(String),
}

impl From<serde_json::Error> for DispatchError {
    fn from(e: serde_json::Error) -> Self {
        DispatchError::Decode(e.to_string())
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
