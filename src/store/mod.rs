//! Store module for the key-value backends
//!
//! This module handles the primitive storage layer, including:
//! - The [`KvStore`] trait of atomic set and hash operations
//! - The Redis backend used for durable crawls
//! - An in-process backend used by the SQLite writer's queue and by tests
//! - The key layout shared by the queue and the batch store

mod keys;
mod memory;
mod redis_store;
mod traits;

pub use keys::{batch_key, hash_location, Counter, CrawlKind, Table};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use traits::{KvStore, StoreError, StoreResult};
