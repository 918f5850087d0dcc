//! # gsa-02-slack
//!
//! Typed access to the Slack Web API for the addon: workspaces, user
//! groups and users.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────────┐     ┌──────────────────┐
//! │  reconciler  │────→│     SlackClient      │────→│  dyn SlackApi    │
//! └──────────────┘     │  validate params     │     │  (HttpSlackApi / │
//!                      │  normalize codes     │     │   FakeSlackApi)  │
//!                      │  retry user lookups  │     └──────────────────┘
//!                      └──────────────────────┘
//! ```
//!
//! ## Error normalization
//!
//! | Web API code                           | Error                 |
//! |----------------------------------------|-----------------------|
//! | `name_already_exists`                  | `GroupAlreadyExists`  |
//! | `no_such_subteam`, `subteam_not_found` | `GroupNotFound`       |
//! | `team_not_found`                       | `WorkspaceNotFound`   |
//! | `user_not_found`, `users_not_found`    | `UserNotFound`        |
//!
//! Only `users.info` and `users.lookupByEmail` are retried, and only on
//! HTTP 503. Mutations are never retried.

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod retry;
pub mod service;

/// Recording in-memory `SlackApi`.
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::http::{HttpSlackApi, DEFAULT_API_URL};
pub use domain::{SlackUser, SlackUserProfile, UserGroup, UserGroupReq, Workspace};
pub use error::{SlackError, SlackResult};
pub use ports::SlackApi;
pub use retry::RetryPolicy;
pub use service::SlackClient;
