//! Routes one decoded event to the engine.
//!
//! | Subject     | Action   | Engine calls                                    |
//! |-------------|----------|-------------------------------------------------|
//! | `*.apps`    | `CREATE` | create user group, then sync its members        |
//! | `*.apps`    | `DELETE` | delete (rename + disable) user group            |
//! | `*.members` | `CREATE` | add member                                      |
//! | `*.members` | `DELETE` | remove member                                   |
//! | `*.groups`  | any      | none, logged                                    |
//!
//! Each message gets one attempt. Failures are logged and the message is
//! dropped; the sweep converges whatever was missed.

use std::sync::Arc;

use shared_types::AuditContext;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::domain::{EventAction, EventFamily, GovernorEvent, InboundMessage};
use crate::error::{DispatchError, DispatchResult};
use crate::ports::ReconcileActions;

/// What happened to a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Every engine call succeeded.
    Applied,
    /// An engine call failed; the error was logged.
    Failed,
    /// Valid event that needs no reconciliation.
    Ignored,
    /// Undecodable payload, missing group id or unknown subject.
    Discarded,
}

pub struct EventDispatcher {
    actions: Arc<dyn ReconcileActions>,
    server: String,
    queue_group: String,
}

impl EventDispatcher {
    /// `server` is the bus URL recorded in audit records, already redacted.
    pub fn new(
        actions: Arc<dyn ReconcileActions>,
        server: impl Into<String>,
        queue_group: impl Into<String>,
    ) -> Self {
        Self {
            actions,
            server: server.into(),
            queue_group: queue_group.into(),
        }
    }

    /// Handle a message, logging why it was discarded if it was.
    pub async fn handle(&self, msg: &InboundMessage) -> Disposition {
        match self.dispatch(msg).await {
            Ok(disposition) => disposition,
            Err(e @ DispatchError::EventMissingGroupID) => {
                error!(nats_subject = %msg.subject, error = %e, "bad event payload");
                Disposition::Discarded
            }
            Err(e) => {
                warn!(nats_subject = %msg.subject, error = %e, "unable to handle governor message");
                Disposition::Discarded
            }
        }
    }

    pub async fn dispatch(&self, msg: &InboundMessage) -> DispatchResult<Disposition> {
        debug!(
            nats_subject = %msg.subject,
            nats_data = %String::from_utf8_lossy(&msg.payload),
            "received a message"
        );

        let family = EventFamily::from_subject(&msg.subject)?;
        let event = GovernorEvent::decode(&msg.payload)?;

        let disposition = match family {
            EventFamily::Applications => {
                let span = info_span!("application_event", governor_group_id = %event.group_id);
                self.on_application(&msg.subject, &event).instrument(span).await
            }
            EventFamily::Members => {
                let span = info_span!(
                    "member_event",
                    governor_group_id = %event.group_id,
                    governor_user_id = %event.user_id,
                );
                self.on_member(&msg.subject, &event).instrument(span).await
            }
            EventFamily::Groups => {
                info!(
                    governor_group_id = %event.group_id,
                    governor_action = %event.action,
                    "group event, nothing to reconcile"
                );
                Disposition::Ignored
            }
        };

        Ok(disposition)
    }

    async fn on_application(&self, subject: &str, event: &GovernorEvent) -> Disposition {
        match event.action() {
            EventAction::Create => {
                info!("create application link event");
                let audit = self.audit_context(subject, event);

                if let Err(e) = self
                    .actions
                    .create_user_group(&audit, &event.group_id, &event.application_id)
                    .await
                {
                    error!(error = %e, "error creating user group");
                    return Disposition::Failed;
                }

                if let Err(e) = self
                    .actions
                    .update_user_group_members(&audit, &event.group_id, &event.application_id)
                    .await
                {
                    error!(error = %e, "error setting user group members");
                    return Disposition::Failed;
                }

                Disposition::Applied
            }
            EventAction::Delete => {
                info!("delete application link event");
                let audit = self.audit_context(subject, event);

                if let Err(e) = self
                    .actions
                    .delete_user_group(&audit, &event.group_id, &event.application_id)
                    .await
                {
                    error!(error = %e, "error deleting user group");
                    return Disposition::Failed;
                }

                Disposition::Applied
            }
            EventAction::Unknown => {
                warn!(governor_action = %event.action, "unexpected action in governor event");
                Disposition::Ignored
            }
        }
    }

    async fn on_member(&self, subject: &str, event: &GovernorEvent) -> Disposition {
        let result = match event.action() {
            EventAction::Create => {
                info!("create group member event");
                let audit = self.audit_context(subject, event);
                self.actions
                    .add_user_group_member(&audit, &event.group_id, &event.user_id)
                    .await
                    .map_err(|e| error!(error = %e, "error adding user group member"))
            }
            EventAction::Delete => {
                info!("delete group member event");
                let audit = self.audit_context(subject, event);
                self.actions
                    .remove_user_group_member(&audit, &event.group_id, &event.user_id)
                    .await
                    .map_err(|e| error!(error = %e, "error removing user group member"))
            }
            EventAction::Unknown => {
                warn!(governor_action = %event.action, "unexpected action in governor event");
                return Disposition::Ignored;
            }
        };

        match result {
            Ok(()) => Disposition::Applied,
            Err(()) => Disposition::Failed,
        }
    }

    fn audit_context(&self, subject: &str, event: &GovernorEvent) -> AuditContext {
        AuditContext::from_bus_message(
            event.audit_id.as_deref(),
            &self.server,
            subject,
            &self.queue_group,
        )
    }
}
