//! Recording `ReconcileActions` for dispatcher tests.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use gsa_04_reconciler::{ReconcileError, ReconcileResult};
use parking_lot::Mutex;
use shared_types::AuditContext;

use crate::ports::ReconcileActions;

#[derive(Default)]
pub struct RecordingActions {
    ops: Mutex<Vec<String>>,
    audits: Mutex<Vec<AuditContext>>,
    failing: Mutex<HashSet<&'static str>>,
    delay: Option<Duration>,
}

impl RecordingActions {
    /// Every call sleeps for `delay` before recording.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn fail(&self, op: &'static str) {
        self.failing.lock().insert(op);
    }

    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().clone()
    }

    pub fn audits(&self) -> Vec<AuditContext> {
        self.audits.lock().clone()
    }

    async fn record(&self, op: &'static str, audit: &AuditContext, a: &str, b: &str) -> ReconcileResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.ops.lock().push(format!("{op} {a} {b}"));
        self.audits.lock().push(audit.clone());

        if self.failing.lock().contains(op) {
            return Err(ReconcileError::SlackUserGroupNotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ReconcileActions for RecordingActions {
    async fn create_user_group(&self, audit: &AuditContext, group_id: &str, app_id: &str) -> ReconcileResult<()> {
        self.record("create", audit, group_id, app_id).await
    }

    async fn update_user_group_members(&self, audit: &AuditContext, group_id: &str, app_id: &str) -> ReconcileResult<()> {
        self.record("update", audit, group_id, app_id).await
    }

    async fn delete_user_group(&self, audit: &AuditContext, group_id: &str, app_id: &str) -> ReconcileResult<()> {
        self.record("delete", audit, group_id, app_id).await
    }

    async fn add_user_group_member(&self, audit: &AuditContext, group_id: &str, user_id: &str) -> ReconcileResult<()> {
        self.record("add", audit, group_id, user_id).await
    }

    async fn remove_user_group_member(&self, audit: &AuditContext, group_id: &str, user_id: &str) -> ReconcileResult<()> {
        self.record("remove", audit, group_id, user_id).await
    }
}
