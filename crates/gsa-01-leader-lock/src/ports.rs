//! Driven port for the key-value store backing the lock

use std::time::Duration;

use async_trait::async_trait;

use crate::error::LockResult;

/// A key-value bucket whose entries expire after the bucket TTL.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Read a key. `Ok(None)` means the key does not exist (or expired).
    async fn get(&self, key: &str) -> LockResult<Option<Vec<u8>>>;

    /// Write a key, resetting its age.
    async fn put(&self, key: &str, value: Vec<u8>) -> LockResult<()>;

    /// Remove a key and its history.
    async fn purge(&self, key: &str) -> LockResult<()>;

    /// Bucket name.
    fn bucket(&self) -> &str;

    /// Entry TTL configured on the bucket.
    async fn ttl(&self) -> LockResult<Duration>;
}
