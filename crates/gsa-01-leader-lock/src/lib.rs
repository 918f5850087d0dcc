//! # gsa-01-leader-lock
//!
//! TTL-backed mutual exclusion so only one addon replica runs the periodic
//! reconcile sweep at a time.
//!
//! ## Overview
//!
//! The lock is a single key in a key-value bucket whose entries expire after
//! a TTL. The value is the holder's reconciler id (a UUID minted once per
//! process). The holder re-writes the key on every tick, which keeps it alive
//! as long as the TTL is longer than the sweep interval.
//!
//! ```text
//!                 ┌──── absent ────→ write id ──→ LEADER (even if write fails)
//! acquire(id) ──→ ├──── == id ─────→ refresh  ──→ LEADER (refresh failure logged)
//!                 ├──── != id ─────→            FOLLOWER
//!                 ├──── garbage ───→ overwrite ─→ LEADER
//!                 └──── read error ─────────────→ Err (skip this cycle)
//! ```
//!
//! Event-driven reconciliation is never gated by the lock; it only guards
//! the sweep.

pub mod adapters;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::memory::MemoryLockStore;
pub use error::{LockError, LockResult};
pub use ports::LockStore;
pub use service::{lock_ttl, LeaderLock, DEFAULT_LOCK_KEY, DEFAULT_TTL_MARGIN};
