//! Storage traits and error types
//!
//! This module defines the primitive operations every key-value backend must
//! provide. The durable queue and the batch store are layered on top of these;
//! nothing above this trait relies on multi-command atomicity.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Value in {key}/{field} is not a counter")]
    NotACounter { key: String, field: String },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Primitive set and hash operations of a key-value store
///
/// Every method is individually atomic at the store level. Sets hold batch ids;
/// hashes map a member id (as a string field) to a string value.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Whether data written here survives a process restart
    fn is_persistent(&self) -> bool;

    // ===== Sets =====

    /// Removes and returns one arbitrary member of the set
    async fn set_pop(&self, key: &str) -> StoreResult<Option<u64>>;

    /// Adds members to the set
    async fn set_add(&self, key: &str, members: &[u64]) -> StoreResult<()>;

    /// Removes a member from the set
    async fn set_remove(&self, key: &str, member: u64) -> StoreResult<()>;

    /// Moves a member from `src` to `dst`; returns false if it was not in `src`
    async fn set_move(&self, src: &str, dst: &str, member: u64) -> StoreResult<bool>;

    /// Lists all members of the set
    async fn set_members(&self, key: &str) -> StoreResult<Vec<u64>>;

    /// Number of members in the set
    async fn set_len(&self, key: &str) -> StoreResult<u64>;

    /// Checks membership
    async fn set_contains(&self, key: &str, member: u64) -> StoreResult<bool>;

    /// Deletes a key of any type
    async fn delete_key(&self, key: &str) -> StoreResult<()>;

    // ===== Hashes =====

    /// Sets `value` on every listed field that does not already exist
    async fn hash_fill_absent(&self, key: &str, fields: &[String], value: &str)
        -> StoreResult<()>;

    /// Lists the field names of a hash
    async fn hash_keys(&self, key: &str) -> StoreResult<Vec<String>>;

    /// Reads one field
    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>>;

    /// Writes one field
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()>;

    /// Removes one field
    async fn hash_delete(&self, key: &str, field: &str) -> StoreResult<()>;

    /// Checks whether a field exists
    async fn hash_exists(&self, key: &str, field: &str) -> StoreResult<bool>;

    /// Atomically adds `delta` to an integer field, returning the new value
    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64>;
}
