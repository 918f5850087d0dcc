//! Driven port: read-only Governor access used by the reconciler

use async_trait::async_trait;
use shared_types::{Application, ApplicationType, Group, GroupMember, User};

use crate::error::GovernorResult;

#[async_trait]
pub trait GovernorApi: Send + Sync {
    async fn application(&self, id: &str) -> GovernorResult<Application>;

    async fn applications(&self) -> GovernorResult<Vec<Application>>;

    async fn application_types(&self) -> GovernorResult<Vec<ApplicationType>>;

    /// Groups linked to an application.
    async fn application_groups(&self, id: &str) -> GovernorResult<Vec<Group>>;

    /// A group; `deleted` also finds soft-deleted groups.
    async fn group(&self, id: &str, deleted: bool) -> GovernorResult<Group>;

    async fn group_members(&self, id: &str) -> GovernorResult<Vec<GroupMember>>;

    /// A user; `deleted` also finds soft-deleted users.
    async fn user(&self, id: &str, deleted: bool) -> GovernorResult<User>;

    /// Base URL of the API, for logs and audit records.
    fn url(&self) -> &str;
}
