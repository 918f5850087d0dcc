//! Leader lock store over a NATS JetStream key-value bucket.
//!
//! The bucket's `max_age` is the lock TTL, so a crashed leader's key
//! expires on its own.

use std::time::Duration;

use async_nats::jetstream::{self, kv};
use async_trait::async_trait;
use gsa_01_leader_lock::{LockError, LockResult, LockStore};
use tracing::info;

pub struct JetStreamLockStore {
    store: kv::Store,
    bucket: String,
}

impl JetStreamLockStore {
    /// Bind to `bucket`, creating it with `ttl` when it doesn't exist.
    pub async fn open(js: &jetstream::Context, bucket: &str, ttl: Duration) -> anyhow::Result<Self> {
        let store = match js.get_key_value(bucket).await {
            Ok(store) => store,
            Err(_) => {
                info!(bucket, ttl = ?ttl, "creating leader lock bucket");
                js.create_key_value(kv::Config {
                    bucket: bucket.to_string(),
                    description: "gov-slack-addon leader election".to_string(),
                    history: 1,
                    max_age: ttl,
                    ..Default::default()
                })
                .await?
            }
        };

        Ok(Self {
            store,
            bucket: bucket.to_string(),
        })
    }
}

fn store_err(e: impl std::fmt::Display) -> LockError {
    LockError::Store(e.to_string())
}

#[async_trait]
impl LockStore for JetStreamLockStore {
    async fn get(&self, key: &str) -> LockResult<Option<Vec<u8>>> {
        let value = self.store.get(key).await.map_err(store_err)?;
        Ok(value.map(|v| v.to_vec()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> LockResult<()> {
        self.store.put(key, value.into()).await.map_err(store_err)?;
        Ok(())
    }

    async fn purge(&self, key: &str) -> LockResult<()> {
        self.store.purge(key).await.map_err(store_err)
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn ttl(&self) -> LockResult<Duration> {
        let status = self.store.status().await.map_err(store_err)?;
        Ok(status.max_age())
    }
}
