//! Redis storage implementation
//!
//! This module provides the durable [`KvStore`] backend. A single
//! [`ConnectionManager`] is multiplexed across every worker; cloning it is
//! cheap and each call borrows its own handle.

use crate::store::traits::{KvStore, StoreResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Redis storage backend
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connects to the Redis server at `url`
    ///
    /// # Arguments
    ///
    /// * `url` - Connection URL such as `redis://127.0.0.1:6379/`
    ///
    /// # Returns
    ///
    /// * `Ok(RedisStore)` - Connected and ready for use
    /// * `Err(StoreError)` - The URL is invalid or the server is unreachable
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::debug!("Connected to Redis at {}", url);
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn set_pop(&self, key: &str) -> StoreResult<Option<u64>> {
        let mut conn = self.conn.clone();
        let member: Option<u64> = conn.spop(key).await?;
        Ok(member)
    }

    async fn set_add(&self, key: &str, members: &[u64]) -> StoreResult<()> {
        if members.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let _: () = conn.sadd(key, members).await?;
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: u64) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.srem(key, member).await?;
        Ok(())
    }

    async fn set_move(&self, src: &str, dst: &str, member: u64) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let moved: bool = conn.smove(src, dst, member).await?;
        Ok(moved)
    }

    async fn set_members(&self, key: &str) -> StoreResult<Vec<u64>> {
        let mut conn = self.conn.clone();
        let members: Vec<u64> = conn.smembers(key).await?;
        Ok(members)
    }

    async fn set_len(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.conn.clone();
        let len: u64 = conn.scard(key).await?;
        Ok(len)
    }

    async fn set_contains(&self, key: &str, member: u64) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let found: bool = conn.sismember(key, member).await?;
        Ok(found)
    }

    async fn delete_key(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn hash_fill_absent(
        &self,
        key: &str,
        fields: &[String],
        value: &str,
    ) -> StoreResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        // One round trip per batch instead of one per field
        let mut pipe = redis::pipe();
        for field in fields {
            pipe.hset_nx(key, field, value).ignore();
        }
        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn hash_keys(&self, key: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let fields: Vec<String> = conn.hkeys(key).await?;
        Ok(fields)
    }

    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.hget(key, field).await?;
        Ok(value)
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.hset(key, field, value).await?;
        Ok(())
    }

    async fn hash_delete(&self, key: &str, field: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.hdel(key, field).await?;
        Ok(())
    }

    async fn hash_exists(&self, key: &str, field: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.hexists(key, field).await?;
        Ok(exists)
    }

    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        let mut conn = self.conn.clone();
        let value: i64 = conn.hincr(key, field, delta).await?;
        Ok(value)
    }
}
