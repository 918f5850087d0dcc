//! In-memory lock store
//!
//! Expiry follows tokio's clock so paused-time tests can step past the TTL.
//! Failure switches let tests exercise the error branches of the lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::time::Instant;

use crate::error::{LockError, LockResult};
use crate::ports::LockStore;

struct Entry {
    value: Vec<u8>,
    written_at: Instant,
}

/// Single-process [`LockStore`] with per-entry TTL.
pub struct MemoryLockStore {
    bucket: String,
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
    puts: AtomicUsize,
    fail_gets: AtomicBool,
    fail_puts: AtomicBool,
    fail_purges: AtomicBool,
    fail_status: AtomicBool,
}

impl MemoryLockStore {
    pub fn new(bucket: impl Into<String>, ttl: Duration) -> Self {
        Self {
            bucket: bucket.into(),
            ttl,
            entries: RwLock::new(HashMap::new()),
            puts: AtomicUsize::new(0),
            fail_gets: AtomicBool::new(false),
            fail_puts: AtomicBool::new(false),
            fail_purges: AtomicBool::new(false),
            fail_status: AtomicBool::new(false),
        }
    }

    /// Current live value of a key, bypassing the failure switches.
    pub fn value(&self, key: &str) -> Option<Vec<u8>> {
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|e| !self.expired(e))
            .map(|e| e.value.clone())
    }

    /// Store a value without going through `put` (e.g. a corrupt record).
    pub fn insert_raw(&self, key: &str, value: Vec<u8>) {
        self.entries.write().insert(
            key.to_string(),
            Entry {
                value,
                written_at: Instant::now(),
            },
        );
    }

    /// Number of successful `put` calls.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_purges(&self, fail: bool) {
        self.fail_purges.store(fail, Ordering::SeqCst);
    }

    pub fn fail_status(&self, fail: bool) {
        self.fail_status.store(fail, Ordering::SeqCst);
    }

    fn expired(&self, entry: &Entry) -> bool {
        !self.ttl.is_zero() && entry.written_at.elapsed() >= self.ttl
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn get(&self, key: &str) -> LockResult<Option<Vec<u8>>> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(LockError::Store("get failed".to_string()));
        }

        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|e| self.expired(e)) {
            entries.remove(key);
        }

        Ok(entries.get(key).map(|e| e.value.clone()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> LockResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(LockError::Store("put failed".to_string()));
        }

        self.insert_raw(key, value);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn purge(&self, key: &str) -> LockResult<()> {
        if self.fail_purges.load(Ordering::SeqCst) {
            return Err(LockError::Store("purge failed".to_string()));
        }

        self.entries.write().remove(key);
        Ok(())
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn ttl(&self) -> LockResult<Duration> {
        if self.fail_status.load(Ordering::SeqCst) {
            return Err(LockError::Store("status failed".to_string()));
        }
        Ok(self.ttl)
    }
}
