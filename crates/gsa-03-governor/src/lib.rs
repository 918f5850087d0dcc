//! # gsa-03-governor
//!
//! Read-only client for the Governor API: applications, application types,
//! groups, group members and users.
//!
//! The reconciler depends only on the [`GovernorApi`] trait. The HTTP
//! implementation authenticates with the OAuth2 client credentials grant
//! and caches the access token until shortly before it expires.

pub mod adapters;
pub mod auth;
pub mod error;
pub mod ports;

/// In-memory `GovernorApi`.
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::http::HttpGovernorClient;
pub use auth::{ClientCredentials, TokenSource, DEFAULT_SCOPES};
pub use error::{GovernorError, GovernorResult};
pub use ports::GovernorApi;
