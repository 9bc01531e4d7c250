//! Shared buffer store: ordered per-conversation fragment lists with expiry.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::error::Result;

/// Ordered, expiring fragment storage shared by every process instance.
///
/// Per-key operations must be atomic in the store itself; callers do no
/// locking around them. The only in-process locking in the system is the
/// scheduler's timer table.
#[async_trait]
pub trait BufferStore: Send + Sync {
    /// Append a value to the end of the list at `key`, creating it if absent.
    async fn append(&self, key: &str, value: &str) -> Result<()>;

    /// Reset the expiry of `key` to `ttl` from now.
    async fn set_expiry(&self, key: &str, ttl: Duration) -> Result<()>;

    /// Read the whole list at `key`, oldest first. A missing key reads as
    /// an empty list.
    async fn read_all(&self, key: &str) -> Result<Vec<String>>;

    /// Delete `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Redis-backed store (RPUSH / EXPIRE / LRANGE / DEL).
///
/// The connection manager multiplexes one connection and reconnects on
/// failure; cloning it per call is cheap.
#[derive(Clone)]
pub struct RedisBufferStore {
    connection: ConnectionManager,
}

impl RedisBufferStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl BufferStore for RedisBufferStore {
    async fn append(&self, key: &str, value: &str) -> Result<()> {
        let mut connection = self.connection.clone();
        let _: i64 = connection.rpush(key, value).await?;
        Ok(())
    }

    async fn set_expiry(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut connection = self.connection.clone();
        let _: bool = connection.expire(key, ttl.as_secs() as i64).await?;
        Ok(())
    }

    async fn read_all(&self, key: &str) -> Result<Vec<String>> {
        let mut connection = self.connection.clone();
        let values: Vec<String> = connection.lrange(key, 0, -1).await?;
        Ok(values)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut connection = self.connection.clone();
        let _: i64 = connection.del(key).await?;
        Ok(())
    }
}
