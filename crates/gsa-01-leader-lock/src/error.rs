//! Error types for the leader lock

use thiserror::Error;

/// Leader lock errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockError {
    /// Nil holder id or empty bucket parameters
    #[error("bad parameters in request")]
    BadParameter,

    /// The backing key-value store failed
    #[error("lock store error: {0}")]
    Store(String),
}

/// Result type for lock operations
pub type LockResult<T> = Result<T, LockError>;
