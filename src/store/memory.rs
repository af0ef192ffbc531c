//! In-process store
//!
//! Holds sets and hashes in memory behind a single mutex. Nothing survives the
//! process, so it backs the queue of the SQLite backend and the test suite.

use crate::store::traits::{KvStore, StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    sets: HashMap<String, HashSet<u64>>,
    hashes: HashMap<String, HashMap<String, String>>,
}

/// Memory-backed implementation of [`KvStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    persistent: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that reports itself persistent
    ///
    /// Lets a single process play both halves of an interrupted and a resumed
    /// run against the same store.
    pub fn persistent() -> Self {
        Self {
            persistent: true,
            ..Self::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking test thread must not wedge every other caller
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of a whole hash, for inspection
    pub fn hash_snapshot(&self, key: &str) -> HashMap<String, String> {
        self.lock().hashes.get(key).cloned().unwrap_or_default()
    }

    /// Names of all hashes whose key starts with `prefix`
    pub fn hash_keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .lock()
            .hashes
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    fn is_persistent(&self) -> bool {
        self.persistent
    }

    async fn set_pop(&self, key: &str) -> StoreResult<Option<u64>> {
        let mut inner = self.lock();
        let Some(set) = inner.sets.get_mut(key) else {
            return Ok(None);
        };
        let member = set.iter().next().copied();
        if let Some(m) = member {
            set.remove(&m);
        }
        Ok(member)
    }

    async fn set_add(&self, key: &str, members: &[u64]) -> StoreResult<()> {
        if members.is_empty() {
            return Ok(());
        }
        let mut inner = self.lock();
        inner
            .sets
            .entry(key.to_string())
            .or_default()
            .extend(members.iter().copied());
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: u64) -> StoreResult<()> {
        if let Some(set) = self.lock().sets.get_mut(key) {
            set.remove(&member);
        }
        Ok(())
    }

    async fn set_move(&self, src: &str, dst: &str, member: u64) -> StoreResult<bool> {
        let mut inner = self.lock();
        let removed = inner
            .sets
            .get_mut(src)
            .map(|set| set.remove(&member))
            .unwrap_or(false);
        if removed {
            inner.sets.entry(dst.to_string()).or_default().insert(member);
        }
        Ok(removed)
    }

    async fn set_members(&self, key: &str) -> StoreResult<Vec<u64>> {
        Ok(self
            .lock()
            .sets
            .get(key)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn set_len(&self, key: &str) -> StoreResult<u64> {
        Ok(self.lock().sets.get(key).map_or(0, |set| set.len() as u64))
    }

    async fn set_contains(&self, key: &str, member: u64) -> StoreResult<bool> {
        Ok(self
            .lock()
            .sets
            .get(key)
            .is_some_and(|set| set.contains(&member)))
    }

    async fn delete_key(&self, key: &str) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.sets.remove(key);
        inner.hashes.remove(key);
        Ok(())
    }

    async fn hash_fill_absent(
        &self,
        key: &str,
        fields: &[String],
        value: &str,
    ) -> StoreResult<()> {
        let mut inner = self.lock();
        let hash = inner.hashes.entry(key.to_string()).or_default();
        for field in fields {
            hash.entry(field.clone())
                .or_insert_with(|| value.to_string());
        }
        Ok(())
    }

    async fn hash_keys(&self, key: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .lock()
            .hashes
            .get(key)
            .map(|hash| hash.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        Ok(self
            .lock()
            .hashes
            .get(key)
            .and_then(|hash| hash.get(field).cloned()))
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        self.lock()
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hash_delete(&self, key: &str, field: &str) -> StoreResult<()> {
        if let Some(hash) = self.lock().hashes.get_mut(key) {
            hash.remove(field);
        }
        Ok(())
    }

    async fn hash_exists(&self, key: &str, field: &str) -> StoreResult<bool> {
        Ok(self
            .lock()
            .hashes
            .get(key)
            .is_some_and(|hash| hash.contains_key(field)))
    }

    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        let mut inner = self.lock();
        let slot = inner
            .hashes
            .entry(key.to_string())
            .or_default()
            .entry(field.to_string())
            .or_insert_with(|| "0".to_string());
        let current: i64 = slot.parse().map_err(|_| StoreError::NotACounter {
            key: key.to_string(),
            field: field.to_string(),
        })?;
        let next = current + delta;
        *slot = next.to_string();
        Ok(next)
    }
}
