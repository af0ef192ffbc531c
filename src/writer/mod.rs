//! Record writers
//!
//! The crawl core hands every resolved or unresolvable member to a
//! [`RecordWriter`]. Two implementations exist:
//! - [`BatchRecordWriter`]: batch-sharded hashes with sentinels, first-seen
//!   user snapshots, relationship lists and counters
//! - [`SqliteRecordWriter`]: upsert-by-id into SQLite with a persistent
//!   "unresolvable" marker; no relationship lists and no counters

mod batch_writer;
mod schema;
mod sqlite;

pub use batch_writer::BatchRecordWriter;
pub use sqlite::{SqliteCounts, SqliteRecordWriter};

use crate::api::{Playlist, Track};
use crate::batch::BatchId;
use crate::store::{CrawlKind, StoreError};
use async_trait::async_trait;
use std::ops::RangeInclusive;
use thiserror::Error;

/// Errors that can occur while writing records
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for writer operations
pub type WriterResult<T> = Result<T, WriterError>;

/// Everything learned about one track during a crawl
#[derive(Debug, Clone, Default)]
pub struct CrawledTrack {
    pub track: Track,
    /// Distinct commenter ids, in first-seen order
    pub commenters: Vec<u64>,
    /// Distinct favoriter ids, in first-seen order
    pub favoriters: Vec<u64>,
}

/// Destination of crawl results
#[async_trait]
pub trait RecordWriter: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Whether comment and favoriter listings should be fetched for tracks
    fn tracks_relations(&self) -> bool;

    /// Prepares a batch for a fresh pass
    async fn init_batch(
        &self,
        kind: CrawlKind,
        batch: BatchId,
        range: RangeInclusive<u64>,
    ) -> WriterResult<()>;

    /// Ids to visit in a claimed batch; `range` is the batch's slice of the id-space
    async fn member_ids(
        &self,
        kind: CrawlKind,
        batch: BatchId,
        range: RangeInclusive<u64>,
    ) -> WriterResult<Vec<u64>>;

    /// False if an earlier pass already gave up on this id
    async fn should_crawl(&self, kind: CrawlKind, id: u64) -> WriterResult<bool>;

    async fn write_track(&self, crawled: &CrawledTrack) -> WriterResult<()>;

    /// Stores a playlist with its distinct, non-empty member track ids
    async fn write_playlist(&self, playlist: &Playlist, track_ids: &[u64]) -> WriterResult<()>;

    /// Gives up on an id that could not be resolved
    async fn discard(&self, kind: CrawlKind, id: u64) -> WriterResult<()>;
}

/// Joins ids the way relationship lists are stored: `1,2,3`
pub fn join_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Removes repeated ids, keeping the first occurrence of each
pub fn dedup_ids(ids: impl IntoIterator<Item = u64>) -> Vec<u64> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
