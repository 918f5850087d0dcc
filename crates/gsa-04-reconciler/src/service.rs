//! Reconciliation engine
//!
//! Every operation re-reads Governor and Slack before deciding anything, so
//! operations are safe to repeat and to run concurrently: two racing calls
//! on the same group only race on the final member list write, and the next
//! event or sweep corrects a stale result.
//!
//! ```text
//! create_user_group ──→ app is slack? ──→ workspace id ──→ governor group ──→ usergroups.create
//! delete_user_group ──→ app is slack? ──→ governor group (deleted ok) ──→ resolve user group
//!                        ──→ rename (timestamped) ──→ disable ──✗──→ restore original name
//! add/remove member ──→ governor group + user ──→ staleness guard ──→ per slack app:
//!                        resolve workspace, user group, slack user ──→ usergroups.users.update
//! update members    ──→ governor members ──→ emails → slack ids ──→ differs? ──→ replace list
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use gsa_02_slack::{SlackClient, SlackError, UserGroup, UserGroupReq};
use gsa_03_governor::GovernorApi;
use shared_types::{AuditContext, AuditEventType, AuditSink, DiscardAuditSink, Group, User};
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

use crate::config::ReconcilerConfig;
use crate::domain::membership::{contains, equal, remove};
use crate::error::{ReconcileError, ReconcileResult};
use crate::resolver::{team_id_from_name, user_group_from_name, NameResolver, TargetGroupResolver};

fn target(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn deletion_timestamp() -> String {
    chrono::Utc::now().timestamp().to_string()
}

/// Slack side of one membership change.
struct MemberTarget {
    workspace: String,
    team_id: String,
    user_group: UserGroup,
    slack_user_id: String,
}

/// The reconciliation engine.
pub struct Reconciler {
    id: Uuid,
    config: ReconcilerConfig,
    slack: SlackClient,
    governor: Arc<dyn GovernorApi>,
    resolver: Arc<dyn TargetGroupResolver>,
    audit: Arc<dyn AuditSink>,
}

impl Reconciler {
    /// Create an engine with a fresh identity, name based resolution and no
    /// audit log.
    pub fn new(config: ReconcilerConfig, slack: SlackClient, governor: Arc<dyn GovernorApi>) -> Self {
        let resolver = Arc::new(NameResolver::new(config.user_group_prefix.clone()));
        let id = Uuid::new_v4();

        debug!(reconciler_id = %id, "creating new reconciler");

        Self {
            id,
            config,
            slack,
            governor,
            resolver,
            audit: Arc::new(DiscardAuditSink),
        }
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn TargetGroupResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Process-unique identity, used as the leader lock token.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn slack(&self) -> &SlackClient {
        &self.slack
    }

    pub fn governor(&self) -> &dyn GovernorApi {
        self.governor.as_ref()
    }

    /// Whether the application is a Slack workspace, with its name.
    ///
    /// The application name is the Slack workspace name. When Governor
    /// returns only `type_id`, the type is looked up among application types.
    pub async fn is_slack_application(&self, app_id: &str) -> ReconcileResult<(bool, String)> {
        let app = self.governor.application(app_id).await?;

        if app.name.is_empty() {
            return Err(ReconcileError::AppNameEmpty);
        }

        let wanted = self.config.application_type.as_str();
        let is_slack = match (app.type_slug(), app.type_id.as_deref()) {
            (Some(slug), _) => slug == wanted,
            (None, Some(type_id)) => {
                debug!(governor_app_id = app_id, type_id, "application type not expanded, listing types");
                self.governor
                    .application_types()
                    .await?
                    .iter()
                    .any(|t| t.id == type_id && t.slug == wanted)
            }
            (None, None) => false,
        };

        Ok((is_slack, app.name))
    }

    /// Id of the workspace named exactly `name`.
    pub async fn team_id_from_name(&self, name: &str) -> ReconcileResult<String> {
        team_id_from_name(&self.slack, name).await
    }

    /// The user group named exactly `name` in workspace `team_id`.
    pub async fn user_group_from_name(
        &self,
        name: &str,
        team_id: &str,
        include_disabled: bool,
    ) -> ReconcileResult<UserGroup> {
        user_group_from_name(&self.slack, name, team_id, include_disabled).await
    }

    /// Create the user group for a group newly linked to an application.
    ///
    /// [`SlackError::GroupAlreadyExists`] is returned as is; callers decide
    /// whether it matters.
    #[instrument(skip(self, audit), fields(audit_id = %audit.id()))]
    pub async fn create_user_group(
        &self,
        audit: &AuditContext,
        group_id: &str,
        app_id: &str,
    ) -> ReconcileResult<()> {
        if group_id.is_empty() || app_id.is_empty() {
            return Err(ReconcileError::BadParameter);
        }

        let Some(workspace) = self.slack_workspace(app_id).await? else {
            return Ok(());
        };

        let team_id = self.team_id_from_name(&workspace).await?;

        let group = self.governor.group(group_id, false).await.map_err(|e| {
            error!(slack_workspace_name = %workspace, error = %e, "error getting governor group");
            e
        })?;

        let req = self.resolver.create_request(&group);
        let name = req.name.clone().unwrap_or_default();

        if self.config.dry_run {
            info!(slack_workspace_name = %workspace, slack_usergroup_name = %name, "SKIP creating slack user group");
            return Ok(());
        }

        let ug = match self.slack.create_user_group(&team_id, &req).await {
            Ok(ug) => ug,
            Err(e) => {
                if e != SlackError::GroupAlreadyExists {
                    error!(
                        slack_workspace_name = %workspace,
                        slack_usergroup_name = %name,
                        error = %e,
                        "failed to create user group"
                    );
                }
                return Err(e.into());
            }
        };

        info!(
            slack_workspace_name = %workspace,
            slack_usergroup_name = %ug.name,
            slack_usergroup_id = %ug.id,
            "created user group"
        );

        self.write_audit(
            audit,
            AuditEventType::UserGroupCreate,
            target(&[
                ("slack.workspace.name", &workspace),
                ("slack.usergroup.name", &ug.name),
                ("slack.usergroup.id", &ug.id),
                ("governor.app.id", app_id),
                ("governor.group.id", group_id),
            ]),
        );

        Ok(())
    }

    /// Retire the user group of a group unlinked from an application.
    ///
    /// Slack cannot delete user groups. The group is renamed with a deletion
    /// timestamp (so the name and handle are free for re-creation) and then
    /// disabled. A failed disable restores the original name, handle and
    /// description.
    #[instrument(skip(self, audit), fields(audit_id = %audit.id()))]
    pub async fn delete_user_group(
        &self,
        audit: &AuditContext,
        group_id: &str,
        app_id: &str,
    ) -> ReconcileResult<()> {
        if group_id.is_empty() || app_id.is_empty() {
            return Err(ReconcileError::BadParameter);
        }

        let Some(workspace) = self.slack_workspace(app_id).await? else {
            return Ok(());
        };

        let group = self.governor.group(group_id, true).await.map_err(|e| {
            error!(slack_workspace_name = %workspace, error = %e, "error getting governor group");
            e
        })?;

        let team_id = self.team_id_from_name(&workspace).await?;
        let ug = self.resolver.resolve(&self.slack, &team_id, &group).await?;

        if self.config.dry_run {
            info!(slack_workspace_name = %workspace, slack_usergroup_id = %ug.id, slack_usergroup_name = %ug.name, "SKIP deleting slack user group");
            return Ok(());
        }

        let ts = deletion_timestamp();
        let renamed = UserGroupReq {
            name: Some(format!("{} (deleted {})", ug.name, ts)),
            handle: Some(format!("{}-deleted-{}", ug.handle, ts)),
            description: Some(format!("{} (deleted by gov-slack-addon {})", ug.description, ts)),
        };

        if let Err(e) = self.slack.update_user_group(&ug.id, &team_id, &renamed).await {
            error!(slack_workspace_name = %workspace, slack_usergroup_name = ?renamed.name, error = %e, "failed to rename user group");
            return Err(e.into());
        }

        if let Err(e) = self.slack.disable_user_group(&ug.id, &team_id).await {
            error!(slack_workspace_name = %workspace, slack_usergroup_id = %ug.id, error = %e, "failed to disable user group");

            let original = UserGroupReq {
                name: Some(ug.name.clone()),
                handle: Some(ug.handle.clone()),
                description: Some(ug.description.clone()),
            };

            if let Err(restore) = self.slack.update_user_group(&ug.id, &team_id, &original).await {
                error!(slack_usergroup_name = %ug.name, error = %restore, "failed to restore user group name");
            }

            return Err(e.into());
        }

        info!(slack_workspace_name = %workspace, slack_usergroup_id = %ug.id, slack_usergroup_name = %ug.name, "deleted user group");

        self.write_audit(
            audit,
            AuditEventType::UserGroupDelete,
            target(&[
                ("slack.workspace.name", &workspace),
                ("slack.usergroup.name", &ug.name),
                ("slack.usergroup.id", &ug.id),
                ("governor.app.id", app_id),
                ("governor.group.id", group_id),
            ]),
        );

        Ok(())
    }

    /// Add a Governor group member to the group's user group in every
    /// linked Slack workspace.
    ///
    /// No-op when Governor no longer lists the user as a member (the event
    /// is stale) or the user is still pending. Per-workspace lookup failures
    /// are logged and skipped; a failed member update aborts.
    #[instrument(skip(self, audit), fields(audit_id = %audit.id()))]
    pub async fn add_user_group_member(
        &self,
        audit: &AuditContext,
        group_id: &str,
        user_id: &str,
    ) -> ReconcileResult<()> {
        let Some((group, user)) = self.membership_subject(group_id, user_id).await? else {
            return Ok(());
        };

        if !group.has_member(&user.id) {
            error!(
                governor_group_id = %group.id,
                governor_user_id = %user.id,
                "governor group does not contain requested membership"
            );
            return Ok(());
        }

        if user.is_pending() {
            debug!(governor_user_id = %user.id, governor_user_email = %user.email, "skipping pending user");
            return Ok(());
        }

        for app_id in &group.applications {
            let span = info_span!(
                "slack_application",
                governor_app_id = %app_id,
                governor_group_id = %group.id,
                governor_group_slug = %group.slug,
                governor_user_id = %user.id,
            );
            self.add_member_in_app(audit, &group, &user, app_id)
                .instrument(span)
                .await?;
        }

        Ok(())
    }

    /// Remove a former Governor group member from the group's user group in
    /// every linked Slack workspace.
    ///
    /// Mirror of [`add_user_group_member`](Self::add_user_group_member): a
    /// no-op while Governor still lists the user. Removing the last member
    /// fails with [`SlackError::EmptyUserGroupMembers`] since Slack cannot
    /// empty a group.
    #[instrument(skip(self, audit), fields(audit_id = %audit.id()))]
    pub async fn remove_user_group_member(
        &self,
        audit: &AuditContext,
        group_id: &str,
        user_id: &str,
    ) -> ReconcileResult<()> {
        let Some((group, user)) = self.membership_subject(group_id, user_id).await? else {
            return Ok(());
        };

        if group.has_member(&user.id) {
            error!(
                governor_group_id = %group.id,
                governor_user_id = %user.id,
                "governor group contains requested membership"
            );
            return Ok(());
        }

        if user.is_pending() {
            debug!(governor_user_id = %user.id, governor_user_email = %user.email, "skipping pending user");
            return Ok(());
        }

        for app_id in &group.applications {
            let span = info_span!(
                "slack_application",
                governor_app_id = %app_id,
                governor_group_id = %group.id,
                governor_group_slug = %group.slug,
                governor_user_id = %user.id,
            );
            self.remove_member_in_app(audit, &group, &user, app_id)
                .instrument(span)
                .await?;
        }

        Ok(())
    }

    /// Replace the user group's members with the Governor group's members.
    ///
    /// Pending members and members without a Slack account are skipped; any
    /// other lookup failure aborts so a partial list never replaces a valid
    /// one. Nothing is written when the member sets already match.
    #[instrument(skip(self, audit), fields(audit_id = %audit.id()))]
    pub async fn update_user_group_members(
        &self,
        audit: &AuditContext,
        group_id: &str,
        app_id: &str,
    ) -> ReconcileResult<()> {
        if group_id.is_empty() || app_id.is_empty() {
            return Err(ReconcileError::BadParameter);
        }

        let Some(workspace) = self.slack_workspace(app_id).await? else {
            return Ok(());
        };

        let group = self.governor.group(group_id, false).await.map_err(|e| {
            error!(slack_workspace_name = %workspace, error = %e, "error getting governor group");
            e
        })?;

        let members = self.governor.group_members(group_id).await.map_err(|e| {
            error!(slack_workspace_name = %workspace, error = %e, "error getting governor group members");
            e
        })?;

        let emails: Vec<String> = members
            .iter()
            .filter(|m| {
                if m.is_pending() {
                    debug!(governor_user_id = %m.id, "skipping pending governor user");
                }
                !m.is_pending()
            })
            .map(|m| m.email.to_lowercase())
            .collect();
        debug!(governor_members = ?emails, "got governor group members");

        let team_id = self.team_id_from_name(&workspace).await?;
        let ug = self.resolver.resolve(&self.slack, &team_id, &group).await?;

        let mut new_users = Vec::with_capacity(emails.len());
        for email in &emails {
            match self.slack.get_user_by_email(email).await {
                Ok(user) => new_users.push(user.id),
                Err(SlackError::UserNotFound) => {
                    info!(user_email = %email, "didn't find slack user");
                }
                Err(e) => {
                    info!(user_email = %email, error = %e, "didn't find slack user");
                    return Err(e.into());
                }
            }
        }

        if equal(&ug.users, &new_users) {
            debug!(slack_usergroup_existing = ?ug.users, slack_usergroup_new = ?new_users, "no need to update members");
            return Ok(());
        }

        debug!(slack_usergroup_existing = ?ug.users, slack_usergroup_new = ?new_users, "updating user group members");

        if self.config.dry_run {
            info!(slack_workspace_name = %workspace, slack_usergroup_id = %ug.id, "SKIP updating slack user group members");
            return Ok(());
        }

        let updated = self
            .slack
            .update_user_group_members(&ug.id, &team_id, &new_users)
            .await
            .map_err(|e| {
                error!(slack_usergroup_name = %ug.name, error = %e, "failed to update user group");
                e
            })?;

        info!(
            slack_workspace_name = %workspace,
            slack_usergroup_name = %updated.name,
            slack_usergroup_users = ?updated.users,
            "updated user group members"
        );

        self.write_audit(
            audit,
            AuditEventType::UserGroupUpdateMembers,
            target(&[
                ("slack.workspace.name", &workspace),
                ("slack.usergroup.name", &ug.name),
                ("slack.usergroup.id", &ug.id),
                ("slack.user.old", &ug.users.join(",")),
                ("slack.user.new", &updated.users.join(",")),
                ("governor.app.id", app_id),
                ("governor.group.id", &group.id),
                ("governor.group.slug", &group.slug),
            ]),
        );

        Ok(())
    }

    /// Workspace name when `app_id` is a Slack application, `None` otherwise.
    async fn slack_workspace(&self, app_id: &str) -> ReconcileResult<Option<String>> {
        let (is_slack, workspace) = self.is_slack_application(app_id).await.map_err(|e| {
            error!(governor_app_id = app_id, error = %e, "failed to get application from governor");
            e
        })?;

        if !is_slack {
            debug!(governor_app_id = app_id, governor_app_name = %workspace, "not a slack application, skipping");
            return Ok(None);
        }

        Ok(Some(workspace))
    }

    /// Fresh group and user for a membership event; `None` when the group
    /// isn't linked to any application.
    async fn membership_subject(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> ReconcileResult<Option<(Group, User)>> {
        if group_id.is_empty() || user_id.is_empty() {
            return Err(ReconcileError::BadParameter);
        }

        let group = self.governor.group(group_id, false).await.map_err(|e| {
            error!(governor_group_id = group_id, error = %e, "error getting governor group");
            e
        })?;

        if group.applications.is_empty() {
            debug!(governor_group_id = group_id, "no applications linked to group");
            return Ok(None);
        }

        let user = self.governor.user(user_id, false).await.map_err(|e| {
            error!(governor_user_id = user_id, error = %e, "error getting governor user");
            e
        })?;

        Ok(Some((group, user)))
    }

    /// Resolve the Slack side of a membership change in one application.
    /// Failures are logged and yield `None` so the next application is tried.
    async fn member_target(&self, group: &Group, user: &User, app_id: &str) -> Option<MemberTarget> {
        let workspace = match self.is_slack_application(app_id).await {
            Ok((true, workspace)) => workspace,
            Ok((false, name)) => {
                debug!(governor_app_name = %name, "not a slack application, skipping");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "failed to get application from governor");
                return None;
            }
        };

        let team_id = match self.team_id_from_name(&workspace).await {
            Ok(id) => id,
            Err(e) => {
                error!(slack_workspace_name = %workspace, error = %e, "failed to get workspace id");
                return None;
            }
        };

        let user_group = match self.resolver.resolve(&self.slack, &team_id, group).await {
            Ok(ug) => ug,
            Err(e) => {
                error!(slack_workspace_name = %workspace, error = %e, "failed to get slack user group");
                return None;
            }
        };

        let slack_user_id = match self.slack.get_user_by_email(&user.email).await {
            Ok(u) => u.id,
            Err(e) => {
                error!(slack_workspace_name = %workspace, governor_user_email = %user.email, error = %e, "failed to get slack user");
                return None;
            }
        };

        Some(MemberTarget {
            workspace,
            team_id,
            user_group,
            slack_user_id,
        })
    }

    async fn add_member_in_app(
        &self,
        audit: &AuditContext,
        group: &Group,
        user: &User,
        app_id: &str,
    ) -> ReconcileResult<()> {
        let Some(t) = self.member_target(group, user, app_id).await else {
            return Ok(());
        };
        let ug = &t.user_group;

        if contains(&ug.users, &t.slack_user_id) {
            info!(slack_workspace_name = %t.workspace, "user already in group, skipping");
            return Ok(());
        }

        let mut new_users = ug.users.clone();
        new_users.push(t.slack_user_id.clone());

        debug!(slack_usergroup_existing = ?ug.users, slack_usergroup_new = ?new_users, "updating user group members");

        if self.config.dry_run {
            info!(slack_usergroup_id = %ug.id, slack_usergroup_name = %ug.name, "SKIP adding user to group");
            return Ok(());
        }

        if let Err(e) = self
            .slack
            .update_user_group_members(&ug.id, &t.team_id, &new_users)
            .await
        {
            error!(slack_usergroup_name = %ug.name, error = %e, "failed to add user to group");
            return Err(e.into());
        }

        info!(slack_workspace_name = %t.workspace, slack_usergroup_name = %ug.name, "added user to group");

        self.write_audit(
            audit,
            AuditEventType::UserGroupAddMember,
            self.member_audit_target(&t, group, user, app_id),
        );

        Ok(())
    }

    async fn remove_member_in_app(
        &self,
        audit: &AuditContext,
        group: &Group,
        user: &User,
        app_id: &str,
    ) -> ReconcileResult<()> {
        let Some(t) = self.member_target(group, user, app_id).await else {
            return Ok(());
        };
        let ug = &t.user_group;

        if !contains(&ug.users, &t.slack_user_id) {
            info!(slack_workspace_name = %t.workspace, "user not in group, skipping");
            return Ok(());
        }

        let new_users = remove(&ug.users, &t.slack_user_id);

        debug!(slack_usergroup_existing = ?ug.users, slack_usergroup_new = ?new_users, "updating user group members");

        if self.config.dry_run {
            info!(slack_usergroup_id = %ug.id, slack_usergroup_name = %ug.name, "SKIP removing user from group");
            return Ok(());
        }

        if let Err(e) = self
            .slack
            .update_user_group_members(&ug.id, &t.team_id, &new_users)
            .await
        {
            error!(slack_usergroup_name = %ug.name, error = %e, "failed to remove user from group");
            return Err(e.into());
        }

        info!(slack_workspace_name = %t.workspace, slack_usergroup_name = %ug.name, "removed user from group");

        self.write_audit(
            audit,
            AuditEventType::UserGroupRemoveMember,
            self.member_audit_target(&t, group, user, app_id),
        );

        Ok(())
    }

    fn member_audit_target(
        &self,
        t: &MemberTarget,
        group: &Group,
        user: &User,
        app_id: &str,
    ) -> BTreeMap<String, String> {
        target(&[
            ("slack.workspace.name", &t.workspace),
            ("slack.usergroup.name", &t.user_group.name),
            ("slack.usergroup.id", &t.user_group.id),
            ("slack.user.id", &t.slack_user_id),
            ("governor.app.id", app_id),
            ("governor.group.id", &group.id),
            ("governor.group.slug", &group.slug),
            ("governor.user.id", &user.id),
        ])
    }

    fn write_audit(
        &self,
        audit: &AuditContext,
        event_type: AuditEventType,
        target: BTreeMap<String, String>,
    ) {
        if let Err(e) = self.audit.write(&audit.record(event_type, target)) {
            error!(audit_id = %audit.id(), event_type = %event_type, error = %e, "error writing audit event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsa_02_slack::test_utils::{FakeSlackApi, SlackCall};
    use gsa_03_governor::test_utils::InMemoryGovernor;
    use gsa_03_governor::GovernorError;
    use shared_types::{MemoryAuditSink, UserStatus};

    const PREFIX: &str = "[Governor] ";

    fn governor() -> InMemoryGovernor {
        InMemoryGovernor::new()
            .with_application_type("t-slack", "slack")
            .with_application_type("t-github", "github")
            .with_application("a1", "Acme", "t-slack")
            .with_application("a2", "acme-gh", "t-github")
            .with_application("a3", "", "t-slack")
            .with_user("u1", "Alice@Example.com", UserStatus::Active)
            .with_user("u2", "bob@example.com", UserStatus::Active)
            .with_user("u3", "carol@example.com", UserStatus::Pending)
            .with_group(Group {
                id: "g1".into(),
                name: "Ops".into(),
                slug: "ops".into(),
                description: "Operations".into(),
                members: vec!["u1".into(), "u2".into()],
                applications: vec!["a1".into()],
            })
    }

    fn slack() -> Arc<FakeSlackApi> {
        Arc::new(
            FakeSlackApi::new()
                .with_workspace("T1", "Acme")
                .with_user("U1", "alice@example.com")
                .with_user("U2", "bob@example.com")
                .with_user("U3", "carol@example.com"),
        )
    }

    struct Harness {
        reconciler: Reconciler,
        slack: Arc<FakeSlackApi>,
        governor: Arc<InMemoryGovernor>,
        audit: Arc<MemoryAuditSink>,
    }

    fn harness(governor: InMemoryGovernor, dry_run: bool) -> Harness {
        let slack = slack();
        let governor = Arc::new(governor);
        let audit = Arc::new(MemoryAuditSink::new());
        let config = ReconcilerConfig {
            user_group_prefix: PREFIX.to_string(),
            dry_run,
            ..Default::default()
        };

        let reconciler = Reconciler::new(config, SlackClient::new(slack.clone()), governor.clone())
            .with_audit_sink(audit.clone());

        Harness {
            reconciler,
            slack,
            governor,
            audit,
        }
    }

    fn ctx() -> AuditContext {
        AuditContext::from_bus_message(Some("audit-1"), "nats://nats:4222", "governor.events.apps", "q")
    }

    #[tokio::test]
    async fn test_is_slack_application() {
        let h = harness(governor(), false);

        assert_eq!(h.reconciler.is_slack_application("a1").await, Ok((true, "Acme".to_string())));
        assert_eq!(h.reconciler.is_slack_application("a2").await, Ok((false, "acme-gh".to_string())));
        assert_eq!(h.reconciler.is_slack_application("a3").await, Err(ReconcileError::AppNameEmpty));

        h.governor.fail_next("application", GovernorError::Transport("boom".into()));
        assert_eq!(
            h.reconciler.is_slack_application("a1").await,
            Err(ReconcileError::Governor(GovernorError::Transport("boom".into())))
        );
    }

    #[tokio::test]
    async fn test_is_slack_application_by_type_id() {
        // Types seeded after the applications leave `type` unexpanded.
        let gov = InMemoryGovernor::new()
            .with_application("a1", "Acme", "t-slack")
            .with_application("a2", "acme-gh", "t-github")
            .with_application_type("t-slack", "slack")
            .with_application_type("t-github", "github");
        let h = harness(gov, false);

        assert_eq!(h.reconciler.is_slack_application("a1").await, Ok((true, "Acme".to_string())));
        assert_eq!(h.reconciler.is_slack_application("a2").await, Ok((false, "acme-gh".to_string())));

        h.governor.fail_next("application_types", GovernorError::Transport("boom".into()));
        assert_eq!(
            h.reconciler.is_slack_application("a1").await,
            Err(ReconcileError::Governor(GovernorError::Transport("boom".into())))
        );
    }

    #[tokio::test]
    async fn test_create_user_group() {
        let h = harness(governor(), false);

        h.reconciler.create_user_group(&ctx(), "g1", "a1").await.unwrap();

        let ug = h.slack.user_group_by_name("T1", "[Governor] Ops").unwrap();
        assert_eq!(ug.handle, "ops");
        assert_eq!(ug.description, "Operations");

        let records = h.audit.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event_type, AuditEventType::UserGroupCreate);
        assert_eq!(records[0].id, "audit-1");
        assert_eq!(records[0].target["slack.usergroup.id"], ug.id);
    }

    #[tokio::test]
    async fn test_create_existing_group_propagates() {
        let h = harness(governor(), false);
        h.slack.add_user_group("T1", "[Governor] Ops", "ops", &[]);

        let err = h.reconciler.create_user_group(&ctx(), "g1", "a1").await.unwrap_err();

        assert!(err.is_group_already_exists());
        assert!(h.audit.is_empty());
    }

    #[tokio::test]
    async fn test_create_skips_non_slack_application() {
        let h = harness(governor(), false);

        h.reconciler.create_user_group(&ctx(), "g1", "a2").await.unwrap();

        assert!(h.slack.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_dry_run() {
        let h = harness(governor(), true);

        h.reconciler.create_user_group(&ctx(), "g1", "a1").await.unwrap();

        assert_eq!(h.slack.mutation_count(), 0);
        assert!(h.audit.is_empty());
    }

    #[tokio::test]
    async fn test_bad_parameters() {
        let h = harness(governor(), false);
        let ctx = ctx();

        assert_eq!(h.reconciler.create_user_group(&ctx, "", "a1").await, Err(ReconcileError::BadParameter));
        assert_eq!(h.reconciler.delete_user_group(&ctx, "g1", "").await, Err(ReconcileError::BadParameter));
        assert_eq!(h.reconciler.add_user_group_member(&ctx, "g1", "").await, Err(ReconcileError::BadParameter));
        assert_eq!(h.reconciler.remove_user_group_member(&ctx, "", "u1").await, Err(ReconcileError::BadParameter));
        assert_eq!(h.reconciler.update_user_group_members(&ctx, "", "").await, Err(ReconcileError::BadParameter));
    }

    #[tokio::test]
    async fn test_delete_renames_then_disables() {
        let h = harness(governor(), false);
        let id = h.slack.add_user_group("T1", "[Governor] Ops", "ops", &["U1"]);

        h.reconciler.delete_user_group(&ctx(), "g1", "a1").await.unwrap();

        let ug = h.slack.user_group(&id).unwrap();
        assert!(ug.name.starts_with("[Governor] Ops (deleted "));
        assert!(ug.handle.starts_with("ops-deleted-"));
        assert!(ug.description.contains("(deleted by gov-slack-addon "));
        assert!(ug.is_disabled());

        let records = h.audit.records();
        assert_eq!(records[0].event_type, AuditEventType::UserGroupDelete);
        assert_eq!(records[0].target["slack.usergroup.name"], "[Governor] Ops");
    }

    #[tokio::test]
    async fn test_delete_missing_user_group() {
        let h = harness(governor(), false);

        assert_eq!(
            h.reconciler.delete_user_group(&ctx(), "g1", "a1").await,
            Err(ReconcileError::SlackUserGroupNotFound)
        );
        assert_eq!(h.slack.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_missing_workspace() {
        let gov = governor().with_application("a4", "Elsewhere", "t-slack");
        let h = harness(gov, false);

        assert_eq!(
            h.reconciler.delete_user_group(&ctx(), "g1", "a4").await,
            Err(ReconcileError::SlackWorkspaceNotFound)
        );
    }

    #[tokio::test]
    async fn test_delete_rename_failure_stops() {
        let h = harness(governor(), false);
        let id = h.slack.add_user_group("T1", "[Governor] Ops", "ops", &["U1"]);
        h.slack.fail_next("usergroups.update", SlackError::Api("invalid_auth".into()));

        assert!(h.reconciler.delete_user_group(&ctx(), "g1", "a1").await.is_err());

        let ug = h.slack.user_group(&id).unwrap();
        assert_eq!(ug.name, "[Governor] Ops");
        assert!(!ug.is_disabled());
        assert!(!h.slack.calls().iter().any(|c| matches!(c, SlackCall::DisableUserGroup { .. })));
    }

    #[tokio::test]
    async fn test_add_member() {
        let h = harness(governor(), false);
        let id = h.slack.add_user_group("T1", "[Governor] Ops", "ops", &["U2"]);

        h.reconciler.add_user_group_member(&ctx(), "g1", "u1").await.unwrap();

        assert_eq!(h.slack.user_group(&id).unwrap().users, vec!["U2".to_string(), "U1".to_string()]);

        let records = h.audit.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event_type, AuditEventType::UserGroupAddMember);
        assert_eq!(records[0].target["slack.user.id"], "U1");
        assert_eq!(records[0].target["governor.user.id"], "u1");
    }

    #[tokio::test]
    async fn test_add_member_already_present() {
        let h = harness(governor(), false);
        h.slack.add_user_group("T1", "[Governor] Ops", "ops", &["U1", "U2"]);

        h.reconciler.add_user_group_member(&ctx(), "g1", "u1").await.unwrap();

        assert_eq!(h.slack.mutation_count(), 0);
        assert!(h.audit.is_empty());
    }

    #[tokio::test]
    async fn test_add_member_stale_event() {
        let h = harness(governor(), false);
        h.slack.add_user_group("T1", "[Governor] Ops", "ops", &[]);
        h.governor.set_group_members("g1", &["u2"]);

        h.reconciler.add_user_group_member(&ctx(), "g1", "u1").await.unwrap();

        assert_eq!(h.slack.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_add_member_group_without_applications() {
        let gov = governor().with_group(Group {
            id: "g2".into(),
            name: "Loose".into(),
            members: vec!["u1".into()],
            ..Default::default()
        });
        let h = harness(gov, false);

        h.reconciler.add_user_group_member(&ctx(), "g2", "u1").await.unwrap();

        assert!(h.slack.calls().is_empty());
    }

    #[tokio::test]
    async fn test_add_member_lookup_failure_skips_application() {
        let h = harness(governor(), false);
        h.slack.add_user_group("T1", "[Governor] Ops", "ops", &[]);
        h.slack.fail_next("users.lookupByEmail", SlackError::Api("user_not_found".into()));

        h.reconciler.add_user_group_member(&ctx(), "g1", "u1").await.unwrap();

        assert_eq!(h.slack.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_add_member_update_failure_aborts() {
        let h = harness(governor(), false);
        h.slack.add_user_group("T1", "[Governor] Ops", "ops", &[]);
        h.slack.fail_next("usergroups.users.update", SlackError::Api("invalid_users".into()));

        let err = h.reconciler.add_user_group_member(&ctx(), "g1", "u1").await.unwrap_err();

        assert_eq!(err, ReconcileError::Slack(SlackError::Api("invalid_users".into())));
        assert!(h.audit.is_empty());
    }

    #[tokio::test]
    async fn test_remove_member() {
        let h = harness(governor(), false);
        let id = h.slack.add_user_group("T1", "[Governor] Ops", "ops", &["U1", "U2"]);
        h.governor.set_group_members("g1", &["u2"]);

        h.reconciler.remove_user_group_member(&ctx(), "g1", "u1").await.unwrap();

        assert_eq!(h.slack.user_group(&id).unwrap().users, vec!["U2".to_string()]);
        assert_eq!(h.audit.records()[0].event_type, AuditEventType::UserGroupRemoveMember);
    }

    #[tokio::test]
    async fn test_remove_member_still_in_governor() {
        let h = harness(governor(), false);
        h.slack.add_user_group("T1", "[Governor] Ops", "ops", &["U1", "U2"]);

        h.reconciler.remove_user_group_member(&ctx(), "g1", "u1").await.unwrap();

        assert_eq!(h.slack.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_remove_last_member_is_rejected() {
        let h = harness(governor(), false);
        let id = h.slack.add_user_group("T1", "[Governor] Ops", "ops", &["U1"]);
        h.governor.set_group_members("g1", &[]);

        assert_eq!(
            h.reconciler.remove_user_group_member(&ctx(), "g1", "u1").await,
            Err(ReconcileError::Slack(SlackError::EmptyUserGroupMembers))
        );
        assert_eq!(h.slack.user_group(&id).unwrap().users, vec!["U1".to_string()]);
        assert!(h.audit.is_empty());
    }

    #[tokio::test]
    async fn test_update_members_lowercases_and_syncs() {
        let h = harness(governor(), false);
        let id = h.slack.add_user_group("T1", "[Governor] Ops", "ops", &["U9"]);

        h.reconciler.update_user_group_members(&ctx(), "g1", "a1").await.unwrap();

        assert_eq!(
            h.slack.user_group(&id).unwrap().users,
            vec!["U1".to_string(), "U2".to_string()]
        );
        assert!(h
            .slack
            .calls()
            .contains(&SlackCall::LookupUserByEmail { email: "alice@example.com".into() }));

        let record = &h.audit.records()[0];
        assert_eq!(record.event_type, AuditEventType::UserGroupUpdateMembers);
        assert_eq!(record.target["slack.user.old"], "U9");
        assert_eq!(record.target["slack.user.new"], "U1,U2");
    }

    #[tokio::test]
    async fn test_update_members_is_idempotent() {
        let h = harness(governor(), false);
        h.slack.add_user_group("T1", "[Governor] Ops", "ops", &[]);

        h.reconciler.update_user_group_members(&ctx(), "g1", "a1").await.unwrap();
        h.reconciler.update_user_group_members(&ctx(), "g1", "a1").await.unwrap();

        assert_eq!(h.slack.mutation_count(), 1);
    }

    #[tokio::test]
    async fn test_update_members_same_set_other_order() {
        let h = harness(governor(), false);
        h.slack.add_user_group("T1", "[Governor] Ops", "ops", &["U2", "U1"]);

        h.reconciler.update_user_group_members(&ctx(), "g1", "a1").await.unwrap();

        assert_eq!(h.slack.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_update_members_skips_unknown_slack_users() {
        let gov = governor().with_user("u4", "dave@example.com", UserStatus::Active);
        gov.set_group_members("g1", &["u1", "u4"]);
        let h = harness(gov, false);
        let id = h.slack.add_user_group("T1", "[Governor] Ops", "ops", &[]);

        h.reconciler.update_user_group_members(&ctx(), "g1", "a1").await.unwrap();

        assert_eq!(h.slack.user_group(&id).unwrap().users, vec!["U1".to_string()]);
    }

    #[tokio::test]
    async fn test_update_members_aborts_on_lookup_error() {
        let h = harness(governor(), false);
        let id = h.slack.add_user_group("T1", "[Governor] Ops", "ops", &["U1", "U2", "U3"]);
        h.slack.fail_next("users.lookupByEmail", SlackError::Api("ratelimited".into()));

        assert!(h.reconciler.update_user_group_members(&ctx(), "g1", "a1").await.is_err());
        assert_eq!(h.slack.user_group(&id).unwrap().users.len(), 3);
        assert_eq!(h.slack.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_update_members_dry_run() {
        let h = harness(governor(), true);
        h.slack.add_user_group("T1", "[Governor] Ops", "ops", &[]);

        h.reconciler.update_user_group_members(&ctx(), "g1", "a1").await.unwrap();

        assert_eq!(h.slack.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_audit_failure_is_not_fatal() {
        let slack = slack();
        let reconciler = Reconciler::new(
            ReconcilerConfig::default(),
            SlackClient::new(slack.clone()),
            Arc::new(governor()),
        )
        .with_audit_sink(Arc::new(MemoryAuditSink::failing()));

        reconciler.create_user_group(&ctx(), "g1", "a1").await.unwrap();

        assert_eq!(slack.mutation_count(), 1);
    }
}
