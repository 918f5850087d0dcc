//! # gsa-05-event-dispatch
//!
//! Turns Governor change events from the message bus into reconciler calls.
//!
//! ```text
//! ┌────────────────┐   InboundMessage   ┌──────────────────┐
//! │ bus subscriber │──────────────────→│  run_delivery    │── one task per message
//! │ (apps, groups, │                    └────────┬─────────┘
//! │  members)      │                             ▼
//! └────────────────┘                    ┌──────────────────┐     ┌──────────────────────┐
//!                                       │ EventDispatcher  │────→│ dyn ReconcileActions │
//!                                       │ decode, validate │     │ (Reconciler)         │
//!                                       │ route by subject │     └──────────────────────┘
//!                                       └──────────────────┘
//! ```
//!
//! Delivery is at most once: a message that fails decoding or reconciliation
//! is logged and dropped. Event handling is never gated by the leader lock.

pub mod delivery;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod ports;

#[cfg(test)]
mod testing;

pub use delivery::{run_delivery, DeliveryStats};
pub use dispatcher::{Disposition, EventDispatcher};
pub use domain::{EventAction, EventFamily, GovernorEvent, InboundMessage};
pub use error::{DispatchError, DispatchResult};
pub use ports::ReconcileActions;
