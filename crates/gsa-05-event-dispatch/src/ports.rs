//! The engine operations events trigger.

use async_trait::async_trait;
use gsa_04_reconciler::{ReconcileResult, Reconciler};
use shared_types::AuditContext;

/// Reconciliation operations driven by bus events.
#[async_trait]
pub trait ReconcileActions: Send + Sync {
    async fn create_user_group(&self, audit: &AuditContext, group_id: &str, app_id: &str) -> ReconcileResult<()>;

    async fn update_user_group_members(&self, audit: &AuditContext, group_id: &str, app_id: &str) -> ReconcileResult<()>;

    async fn delete_user_group(&self, audit: &AuditContext, group_id: &str, app_id: &str) -> ReconcileResult<()>;

    async fn add_user_group_member(&self, audit: &AuditContext, group_id: &str, user_id: &str) -> ReconcileResult<()>;

    async fn remove_user_group_member(&self, audit: &AuditContext, group_id: &str, user_id: &str) -> ReconcileResult<()>;
}

#[async_trait]
impl ReconcileActions for Reconciler {
    async fn create_user_group(&self, audit: &AuditContext, group_id: &str, app_id: &str) -> ReconcileResult<()> {
        Reconciler::create_user_group(self, audit, group_id, app_id).await
    }

    async fn update_user_group_members(&self, audit: &AuditContext, group_id: &str, app_id: &str) -> ReconcileResult<()> {
        Reconciler::update_user_group_members(self, audit, group_id, app_id).await
    }

    async fn delete_user_group(&self, audit: &AuditContext, group_id: &str, app_id: &str) -> ReconcileResult<()> {
        Reconciler::delete_user_group(self, audit, group_id, app_id).await
    }

    async fn add_user_group_member(&self, audit: &AuditContext, group_id: &str, user_id: &str) -> ReconcileResult<()> {
        Reconciler::add_user_group_member(self, audit, group_id, user_id).await
    }

    async fn remove_user_group_member(&self, audit: &AuditContext, group_id: &str, user_id: &str) -> ReconcileResult<()> {
        Reconciler::remove_user_group_member(self, audit, group_id, user_id).await
    }
}
