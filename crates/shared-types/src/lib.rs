//! # Shared Types Crate
//!
//! Records observed from the Governor API and the audit trail types shared
//! by the reconciliation engine, the event dispatcher and the runtime.
//!
//! ## Design Principles
//!
//! - **Read-only snapshots**: Governor records are deserialized straight from
//!   the API and never mutated by the addon.
//! - **Explicit audit origin**: the logical operation an audit record belongs
//!   to travels as an [`AuditContext`] argument, not as ambient state.

pub mod audit;
pub mod governor;

pub use audit::{
    AuditContext, AuditError, AuditEventType, AuditRecord, AuditSink, AuditSource,
    DiscardAuditSink, JsonLinesAuditWriter, MemoryAuditSink, AUDIT_COMPONENT,
};
pub use governor::{Application, ApplicationType, Group, GroupMember, User, UserStatus};

/// Name the addon reports itself as (NATS connection name, audit component, logs).
pub const APP_NAME: &str = "gov-slack-addon";
