//! Durable work queue of batch ids
//!
//! Two sets per crawl kind live in the store:
//! - pending (`crawlTracks`): batch ids not yet claimed
//! - in-flight (`crawlTracksTodo`): batch ids claimed but not yet completed
//!
//! A batch is done once it has left both sets. Claiming relies on the store's
//! single atomic pop, so two claimers can never receive the same batch; no
//! locking is layered on top. After a crash, [`DurableQueue::recover`] moves
//! whatever was left in-flight back into pending.

use crate::batch::BatchId;
use crate::store::{CrawlKind, KvStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

/// Errors that can occur during queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Pending/in-flight queue layered over a [`KvStore`]
#[derive(Clone)]
pub struct DurableQueue {
    store: Arc<dyn KvStore>,
}

impl DurableQueue {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Whether queue state survives a restart
    pub fn is_durable(&self) -> bool {
        self.store.is_persistent()
    }

    /// Adds batch ids to the pending set
    pub async fn seed(&self, kind: CrawlKind, batches: &[BatchId]) -> QueueResult<()> {
        self.store.set_add(kind.pending_key(), batches).await?;
        Ok(())
    }

    /// Clears the pending set for a from-scratch run
    #[instrument(skip(self))]
    pub async fn reset(&self, kind: CrawlKind) -> QueueResult<()> {
        self.store.delete_key(kind.pending_key()).await?;
        Ok(())
    }

    /// Forgets every claimed batch
    ///
    /// Only for a from-scratch run, which reseeds every batch id anyway.
    #[instrument(skip(self))]
    pub async fn clear_in_flight(&self, kind: CrawlKind) -> QueueResult<()> {
        self.store.delete_key(kind.in_flight_key()).await?;
        Ok(())
    }

    /// Moves every in-flight batch id back into pending
    ///
    /// Each id is moved with one atomic store operation, so it is never a
    /// member of both sets. Returns the number of ids moved.
    #[instrument(skip(self))]
    pub async fn recover(&self, kind: CrawlKind) -> QueueResult<usize> {
        let stranded = self.store.set_members(kind.in_flight_key()).await?;
        let mut moved = 0;
        for batch in stranded {
            if self
                .store
                .set_move(kind.in_flight_key(), kind.pending_key(), batch)
                .await?
            {
                moved += 1;
            }
        }
        Ok(moved)
    }

    /// Claims one arbitrary pending batch and records it as in-flight
    ///
    /// Returns `None` once the pending set is empty.
    pub async fn claim_next(&self, kind: CrawlKind) -> QueueResult<Option<BatchId>> {
        let Some(batch) = self.store.set_pop(kind.pending_key()).await? else {
            return Ok(None);
        };
        self.store.set_add(kind.in_flight_key(), &[batch]).await?;
        Ok(Some(batch))
    }

    /// Marks a claimed batch as fully processed
    pub async fn release(&self, kind: CrawlKind, batch: BatchId) -> QueueResult<()> {
        self.store.set_remove(kind.in_flight_key(), batch).await?;
        Ok(())
    }

    pub async fn pending_len(&self, kind: CrawlKind) -> QueueResult<u64> {
        Ok(self.store.set_len(kind.pending_key()).await?)
    }

    pub async fn in_flight_len(&self, kind: CrawlKind) -> QueueResult<u64> {
        Ok(self.store.set_len(kind.in_flight_key()).await?)
    }

    pub async fn is_pending(&self, kind: CrawlKind, batch: BatchId) -> QueueResult<bool> {
        Ok(self.store.set_contains(kind.pending_key(), batch).await?)
    }

    pub async fn is_in_flight(&self, kind: CrawlKind, batch: BatchId) -> QueueResult<bool> {
        Ok(self.store.set_contains(kind.in_flight_key(), batch).await?)
    }

    /// Both sets are empty
    pub async fn is_drained(&self, kind: CrawlKind) -> QueueResult<bool> {
        Ok(self.pending_len(kind).await? == 0 && self.in_flight_len(kind).await? == 0)
    }
}
