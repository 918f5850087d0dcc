//! Lock store adapters
//!
//! The NATS JetStream key-value adapter lives in the runtime crate next to
//! the connection it shares; this crate only ships the in-process store.

pub mod memory;
