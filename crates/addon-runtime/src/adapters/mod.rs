//! Adapters onto NATS: the event subscriptions and the JetStream KV lock store.

pub mod kv_lock;
pub mod nats;

pub use kv_lock::JetStreamLockStore;
pub use nats::{connect, redact_url, subscribe, EventStream};
