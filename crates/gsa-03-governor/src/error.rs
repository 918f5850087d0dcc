//! Error types for the Governor client

use thiserror::Error;

/// Governor client errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GovernorError {
    /// Empty identifier passed to a lookup
    #[error("bad parameters in request")]
    BadParameter,

    /// The requested resource does not exist (HTTP 404)
    #[error("governor resource not found")]
    NotFound,

    /// Token request failed or the API rejected the token
    #[error("governor authentication failed: {0}")]
    Auth(String),

    /// Any other non-success HTTP status
    #[error("governor api returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("governor transport error: {0}")]
    Transport(String),

    #[error("failed to decode governor response: {0}")]
    Decode(String),
}

/// Result type for Governor operations
pub type GovernorResult<T> = Result<T, GovernorError>;
