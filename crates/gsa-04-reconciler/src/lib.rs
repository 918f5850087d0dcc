//! # gsa-04-reconciler
//!
//! Converges Slack user groups onto Governor group membership.
//!
//! ## Architecture
//!
//! ```text
//!   bus events ──────────────┐
//!                            ▼
//! ┌─────────────┐    ┌──────────────┐    ┌───────────────┐
//! │ SweepDriver │───→│  Reconciler  │───→│  SlackClient  │
//! │ (leader     │    │  (engine)    │    └───────────────┘
//! │  only)      │    │              │───→ dyn GovernorApi
//! └─────────────┘    │              │───→ dyn AuditSink
//!                    └──────────────┘───→ dyn TargetGroupResolver
//! ```
//!
//! Governor is the source of truth. Each operation re-reads current state
//! from both sides and converges, so a dropped or duplicated event is
//! corrected by the next sweep.
//!
//! ## Naming
//!
//! The user group mirroring Governor group `G` in a workspace is named
//! `prefix + G.name` with handle `G.slug`. The workspace of a Governor
//! application is the Slack workspace whose name equals the application name.

pub mod config;
pub mod domain;
pub mod error;
pub mod resolver;
pub mod service;
pub mod sweep;

pub use config::{ReconcilerConfig, DEFAULT_APPLICATION_TYPE, DEFAULT_INTERVAL, DEFAULT_USER_GROUP_PREFIX};
pub use error::{ReconcileError, ReconcileResult};
pub use resolver::{NameResolver, TargetGroupResolver};
pub use service::Reconciler;
pub use sweep::{SweepDriver, SweepStats, TickOutcome};
