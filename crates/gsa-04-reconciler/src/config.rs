//! Reconciler configuration

use std::time::Duration;

/// Default user group name prefix.
pub const DEFAULT_USER_GROUP_PREFIX: &str = "[Governor] ";

/// Default Governor application type slug for Slack workspaces.
pub const DEFAULT_APPLICATION_TYPE: &str = "slack";

/// Default sweep interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3600);

/// Settings for the engine and the sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Prepended to Governor group names to form user group names.
    pub user_group_prefix: String,
    /// Governor application type slug identifying Slack workspaces.
    pub application_type: String,
    /// Log intended mutations without calling Slack's write APIs.
    pub dry_run: bool,
    /// Time between sweeps.
    pub interval: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            user_group_prefix: DEFAULT_USER_GROUP_PREFIX.to_string(),
            application_type: DEFAULT_APPLICATION_TYPE.to_string(),
            dry_run: false,
            interval: DEFAULT_INTERVAL,
        }
    }
}
