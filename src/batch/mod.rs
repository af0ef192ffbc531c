//! Batch store
//!
//! The id-space is partitioned into batches of 1000 consecutive ids. Each
//! batch is one hash in the store with the member id as field name, so a whole
//! batch can be enumerated with a single field listing and a sparse id-space
//! costs nothing for the ids that were never written.
//!
//! A member holding [`SENTINEL`] has not been resolved yet. The first write of
//! a real value is the "first-seen" transition that gates one-time side
//! effects such as counter increments.

use crate::store::{batch_key, hash_location, Counter, KvStore, StoreResult, Table};
use std::ops::RangeInclusive;
use std::sync::Arc;

/// Index of a batch: `id / BATCH_SIZE`
pub type BatchId = u64;

/// Number of consecutive ids per batch
pub const BATCH_SIZE: u64 = 1000;

/// Placeholder value of an unresolved member
pub const SENTINEL: &str = "null";

/// Batch that owns `id`
pub fn batch_of(id: u64) -> BatchId {
    id / BATCH_SIZE
}

/// Member ids of `batch` inside the id-space `1..=max_id`
///
/// Returns `None` when the batch lies entirely outside the id-space.
pub fn batch_range(batch: BatchId, max_id: u64) -> Option<RangeInclusive<u64>> {
    let start = batch.saturating_mul(BATCH_SIZE).max(1);
    let end = batch
        .saturating_mul(BATCH_SIZE)
        .saturating_add(BATCH_SIZE - 1)
        .min(max_id);
    (start <= end).then_some(start..=end)
}

/// Every non-empty batch of the id-space `1..=max_id`, lazily
pub fn batches_for(max_id: u64) -> impl Iterator<Item = BatchId> {
    let last = if max_id == 0 { None } else { Some(batch_of(max_id)) };
    last.into_iter().flat_map(|last| 0..=last)
}

/// Whether a stored value still marks an unresolved member
pub fn is_unresolved(value: Option<&str>) -> bool {
    matches!(value, None | Some("") | Some(SENTINEL))
}

/// Batch-sharded record map over a [`KvStore`]
#[derive(Clone)]
pub struct BatchStore {
    store: Arc<dyn KvStore>,
}

impl BatchStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Writes the sentinel into every member field of `range` that has no value
    ///
    /// Members already holding a record keep it, so a fresh run never erases
    /// earlier results or re-opens their first-seen gate.
    pub async fn init_batch(
        &self,
        table: Table,
        batch: BatchId,
        range: RangeInclusive<u64>,
    ) -> StoreResult<()> {
        let fields: Vec<String> = range.map(|id| id.to_string()).collect();
        self.store
            .hash_fill_absent(&batch_key(table.prefix(), batch), &fields, SENTINEL)
            .await
    }

    /// Lists the member ids currently present in a batch, in store order
    pub async fn member_ids(&self, table: Table, batch: BatchId) -> StoreResult<Vec<u64>> {
        let key = batch_key(table.prefix(), batch);
        let fields = self.store.hash_keys(&key).await?;
        let mut ids = Vec::with_capacity(fields.len());
        for field in fields {
            match field.parse::<u64>() {
                Ok(id) => ids.push(id),
                Err(_) => tracing::warn!("Skipping non-numeric field '{}' in {}", field, key),
            }
        }
        Ok(ids)
    }

    /// Whether the member still has a field (it was not deleted by an earlier pass)
    pub async fn exists(&self, table: Table, id: u64) -> StoreResult<bool> {
        let (key, field) = hash_location(table.prefix(), id);
        self.store.hash_exists(&key, &field).await
    }

    pub async fn get(&self, table: Table, id: u64) -> StoreResult<Option<String>> {
        let (key, field) = hash_location(table.prefix(), id);
        self.store.hash_get(&key, &field).await
    }

    pub async fn set(&self, table: Table, id: u64, value: &str) -> StoreResult<()> {
        let (key, field) = hash_location(table.prefix(), id);
        self.store.hash_set(&key, &field, value).await
    }

    pub async fn delete(&self, table: Table, id: u64) -> StoreResult<()> {
        let (key, field) = hash_location(table.prefix(), id);
        self.store.hash_delete(&key, &field).await
    }

    /// True while the member is absent or still holds the sentinel
    ///
    /// This is a plain read; the caller's later write is not atomic with it.
    pub async fn first_seen(&self, table: Table, id: u64) -> StoreResult<bool> {
        let value = self.get(table, id).await?;
        Ok(is_unresolved(value.as_deref()))
    }

    /// Adds `by` to the counter of entity `id`
    pub async fn increment(&self, counter: Counter, id: u64, by: i64) -> StoreResult<i64> {
        let (key, field) = hash_location(counter.prefix(), id);
        self.store.hash_incr(&key, &field, by).await
    }

    /// Current value of the counter of entity `id`
    pub async fn count(&self, counter: Counter, id: u64) -> StoreResult<i64> {
        let (key, field) = hash_location(counter.prefix(), id);
        let value = self.store.hash_get(&key, &field).await?;
        Ok(value.and_then(|v| v.parse().ok()).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn batch_store() -> BatchStore {
        BatchStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_batch_range_bounds() {
        assert_eq!(batch_range(0, 2500), Some(1..=999));
        assert_eq!(batch_range(1, 2500), Some(1000..=1999));
        assert_eq!(batch_range(2, 2500), Some(2000..=2500));
        assert_eq!(batch_range(3, 2500), None);
        assert_eq!(batch_range(0, 0), None);
    }

    #[test]
    fn test_batches_for() {
        assert_eq!(batches_for(2500).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(batches_for(1000).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(batches_for(999).collect::<Vec<_>>(), vec![0]);
        assert_eq!(batches_for(0).count(), 0);

        let total: u64 = batches_for(2500)
            .filter_map(|b| batch_range(b, 2500))
            .map(|r| r.count() as u64)
            .sum();
        assert_eq!(total, 2500);
    }

    #[test]
    fn test_is_unresolved() {
        assert!(is_unresolved(None));
        assert!(is_unresolved(Some("")));
        assert!(is_unresolved(Some(SENTINEL)));
        assert!(!is_unresolved(Some("{\"id\":1}")));
    }

    #[tokio::test]
    async fn test_init_batch_lists_every_member() {
        let store = batch_store();
        store.init_batch(Table::TrackMeta, 1, 1000..=1999).await.unwrap();

        let mut ids = store.member_ids(Table::TrackMeta, 1).await.unwrap();
        ids.sort();
        assert_eq!(ids.len(), 1000);
        assert_eq!(ids.first(), Some(&1000));
        assert_eq!(ids.last(), Some(&1999));
        assert!(store.first_seen(Table::TrackMeta, 1500).await.unwrap());
    }

    #[tokio::test]
    async fn test_init_batch_preserves_resolved_members() {
        let store = batch_store();
        store.init_batch(Table::TrackMeta, 0, 1..=10).await.unwrap();
        store.set(Table::TrackMeta, 5, "{\"id\":5}").await.unwrap();

        store.init_batch(Table::TrackMeta, 0, 1..=10).await.unwrap();

        assert!(!store.first_seen(Table::TrackMeta, 5).await.unwrap());
        assert!(store.first_seen(Table::TrackMeta, 6).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_removes_member() {
        let store = batch_store();
        store.init_batch(Table::PlaylistTracks, 0, 1..=3).await.unwrap();
        store.delete(Table::PlaylistTracks, 2).await.unwrap();

        assert!(!store.exists(Table::PlaylistTracks, 2).await.unwrap());
        let mut ids = store.member_ids(Table::PlaylistTracks, 0).await.unwrap();
        ids.sort();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_counters() {
        let store = batch_store();
        assert_eq!(store.count(Counter::Playlists, 42).await.unwrap(), 0);
        store.increment(Counter::Playlists, 42, 1).await.unwrap();
        store.increment(Counter::Playlists, 42, 1).await.unwrap();
        assert_eq!(store.count(Counter::Playlists, 42).await.unwrap(), 2);
    }
}
