//! # Audit Trail
//!
//! One structured record per successful mutating operation. The origin of
//! the logical operation (a bus message or the reconcile loop) is captured in
//! an [`AuditContext`] when the operation starts; the engine completes it with
//! an event type and a target map and hands it to an [`AuditSink`].
//!
//! Writing is fire-and-forget from the caller's point of view: failures are
//! reported as [`AuditError`] and logged, never retried.

use std::collections::BTreeMap;
use std::io::Write;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Component name stamped on every record.
pub const AUDIT_COMPONENT: &str = "gov-slack-addon";

/// Outcome recorded for completed operations.
const OUTCOME_SUCCEEDED: &str = "succeeded";

/// Errors from writing audit records.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Record could not be serialized.
    #[error("failed to encode audit record: {0}")]
    Encode(#[from] serde_json::Error),

    /// Underlying writer failed.
    #[error("failed to write audit record: {0}")]
    Io(#[from] std::io::Error),
}

/// Kinds of mutating operations that produce an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditEventType {
    UserGroupCreate,
    UserGroupDelete,
    UserGroupAddMember,
    UserGroupRemoveMember,
    UserGroupUpdateMembers,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::UserGroupCreate => "UserGroupCreate",
            AuditEventType::UserGroupDelete => "UserGroupDelete",
            AuditEventType::UserGroupAddMember => "UserGroupAddMember",
            AuditEventType::UserGroupRemoveMember => "UserGroupRemoveMember",
            AuditEventType::UserGroupUpdateMembers => "UserGroupUpdateMembers",
        }
    }
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the operation originated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// The origin of one logical operation, captured before any work is done.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditContext {
    id: String,
    source: AuditSource,
    subjects: BTreeMap<String, String>,
}

impl AuditContext {
    /// Context for an operation triggered by a bus message.
    ///
    /// The message's own audit id is reused so records can be correlated with
    /// the Governor request that caused them; a fresh id is minted otherwise.
    pub fn from_bus_message(
        audit_id: Option<&str>,
        server: &str,
        subject: &str,
        queue_group: &str,
    ) -> Self {
        let id = match audit_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };

        let mut extra = BTreeMap::new();
        extra.insert("nats.subject".to_string(), subject.into());
        extra.insert("nats.queuegroup".to_string(), queue_group.into());

        Self {
            id,
            source: AuditSource {
                kind: "NATS".to_string(),
                value: server.to_string(),
                extra,
            },
            subjects: BTreeMap::from([("event".to_string(), "governor".to_string())]),
        }
    }

    /// Context for one pass of the periodic reconcile loop.
    pub fn reconcile_loop(governor_url: &str) -> Self {
        let mut extra = BTreeMap::new();
        extra.insert("governor.url".to_string(), governor_url.into());

        Self {
            id: Uuid::new_v4().to_string(),
            source: AuditSource {
                kind: "local".to_string(),
                value: "ReconcileLoop".to_string(),
                extra,
            },
            subjects: BTreeMap::from([("event".to_string(), "reconciler".to_string())]),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &AuditSource {
        &self.source
    }

    /// Complete the context into a record for a finished operation.
    pub fn record(
        &self,
        event_type: AuditEventType,
        target: BTreeMap<String, String>,
    ) -> AuditRecord {
        AuditRecord {
            id: self.id.clone(),
            event_type,
            source: self.source.clone(),
            outcome: OUTCOME_SUCCEEDED.to_string(),
            subjects: self.subjects.clone(),
            component: AUDIT_COMPONENT.to_string(),
            target,
            logged_at: Utc::now(),
        }
    }
}

/// A completed audit record, serialized as one JSON line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: AuditEventType,
    pub source: AuditSource,
    pub outcome: String,
    pub subjects: BTreeMap<String, String>,
    pub component: String,
    pub target: BTreeMap<String, String>,
    pub logged_at: DateTime<Utc>,
}

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    /// Append one record.
    fn write(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// Writes each record as a JSON line to the wrapped writer (usually the
/// audit log file), flushing after every record.
pub struct JsonLinesAuditWriter<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesAuditWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consume the writer, returning the inner sink.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> AuditSink for JsonLinesAuditWriter<W> {
    fn write(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut writer = self.writer.lock();
        writer.write_all(&line)?;
        writer.flush()?;
        Ok(())
    }
}

/// Drops every record. Used when no audit log is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardAuditSink;

impl AuditSink for DiscardAuditSink {
    fn write(&self, _record: &AuditRecord) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Keeps records in memory; optionally rejects writes.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
    fail: bool,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every write fails with an I/O error.
    pub fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl AuditSink for MemoryAuditSink {
    fn write(&self, record: &AuditRecord) -> Result<(), AuditError> {
        if self.fail {
            return Err(AuditError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "audit sink rejected write",
            )));
        }
        self.records.lock().push(record.clone());
        Ok(())
    }
}
