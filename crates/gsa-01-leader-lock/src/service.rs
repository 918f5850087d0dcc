//! Leader lock service

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{LockError, LockResult};
use crate::ports::LockStore;

/// Key holding the current leader id.
pub const DEFAULT_LOCK_KEY: &str = "leader";

/// How much longer than the sweep interval the lock lives.
pub const DEFAULT_TTL_MARGIN: Duration = Duration::from_secs(10);

/// TTL for a lock guarding a sweep that runs every `interval`.
///
/// The margin keeps a live leader's lock from expiring between two ticks.
pub fn lock_ttl(interval: Duration, margin: Duration) -> Duration {
    interval.saturating_add(margin)
}

/// Distributed leader lock over a [`LockStore`].
#[derive(Clone)]
pub struct LeaderLock {
    store: Arc<dyn LockStore>,
    key: String,
}

impl LeaderLock {
    /// Create a lock using the default key.
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        Self::with_key(store, DEFAULT_LOCK_KEY)
    }

    /// Create a lock on a specific key.
    pub fn with_key(store: Arc<dyn LockStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Try to become (or stay) the leader.
    ///
    /// Returns `Ok(true)` when `id` holds the lock after the call and
    /// `Ok(false)` when another holder owns it. A read failure other than
    /// "not found" is returned as an error; callers skip the cycle.
    pub async fn acquire_lead(&self, id: Uuid) -> LockResult<bool> {
        if id.is_nil() {
            return Err(LockError::BadParameter);
        }

        let entry = match self.store.get(&self.key).await {
            Ok(entry) => entry,
            Err(e) => {
                error!(key = %self.key, error = %e, "error getting lock key from kv store");
                return Err(e);
            }
        };

        let Some(value) = entry else {
            // No lock yet: take it. A failed write is still a win since nobody
            // else holds the lock.
            if let Err(e) = self.store.put(&self.key, id.to_string().into_bytes()).await {
                warn!(id = %id, error = %e, "unable to create leader lock, still proceeding as lead");
                return Ok(true);
            }

            info!(id = %id, "obtained leader lock");
            return Ok(true);
        };

        debug!(key = %self.key, value = %String::from_utf8_lossy(&value), "got key value");

        let holder = match std::str::from_utf8(&value)
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
        {
            Some(holder) => holder,
            None => {
                warn!(key = %self.key, "unable to parse uuid lock value, will try to update the lock");

                if let Err(e) = self.store.put(&self.key, id.to_string().into_bytes()).await {
                    error!(error = %e, "error updating lock");
                    return Err(e);
                }

                return Ok(true);
            }
        };

        if holder != id {
            info!(id = %id, value = %holder, "existing lock found (someone else is the leader)");
            return Ok(false);
        }

        info!(id = %id, value = %holder, "existing lock found (i am the leader)");

        // refresh so the ttl doesn't expire
        if let Err(e) = self.store.put(&self.key, id.to_string().into_bytes()).await {
            warn!(id = %id, error = %e, "unable to update lock");
        }

        Ok(true)
    }

    /// Release the lock if `id` currently holds it.
    ///
    /// Every "nothing to release" situation (nil id, missing or unreadable
    /// record, another holder) is a silent no-op.
    pub async fn release_lead(&self, id: Uuid) -> LockResult<()> {
        if id.is_nil() {
            return Ok(());
        }

        let value = match self.store.get(&self.key).await {
            Ok(Some(value)) => value,
            Ok(None) | Err(_) => return Ok(()),
        };

        debug!(key = %self.key, value = %String::from_utf8_lossy(&value), "got key value");

        let holder = std::str::from_utf8(&value)
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok());

        if holder != Some(id) {
            return Ok(());
        }

        self.store.purge(&self.key).await?;
        info!(id = %id, "released leader lock");
        Ok(())
    }

    /// Name of the backing bucket.
    pub fn name(&self) -> &str {
        self.store.bucket()
    }

    /// TTL of the backing bucket; zero when it can't be read.
    pub async fn ttl(&self) -> Duration {
        match self.store.ttl().await {
            Ok(ttl) => ttl,
            Err(e) => {
                error!(error = %e, "unable to read lock bucket status");
                Duration::ZERO
            }
        }
    }
}
