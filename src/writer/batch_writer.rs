//! Batch-store record writer
//!
//! Writes into the batch-sharded hashes of a [`KvStore`](crate::store::KvStore):
//! - `trackMeta` holds the serialized track with its `last_crawl` time
//! - `userMeta` holds the first snapshot ever seen of each uploader
//! - `trackCommenters`, `trackFavoriters` and `playlistTracks` hold joined id lists
//! - counters are bumped only on the first-seen transition of the list they derive from

use crate::api::{Playlist, Track};
use crate::batch::{BatchId, BatchStore};
use crate::store::{Counter, CrawlKind, Table};
use crate::writer::{join_ids, CrawledTrack, RecordWriter, WriterResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::ops::RangeInclusive;

/// Track record as stored in `trackMeta`
#[derive(Serialize)]
struct StoredTrack<'a> {
    #[serde(flatten)]
    track: &'a Track,
    last_crawl: DateTime<Utc>,
}

/// [`RecordWriter`] over a [`BatchStore`]
#[derive(Clone)]
pub struct BatchRecordWriter {
    batches: BatchStore,
}

impl BatchRecordWriter {
    pub fn new(batches: BatchStore) -> Self {
        Self { batches }
    }

    /// Stores `ids` as the relation list of `track_id`
    ///
    /// The counter is incremented by the number of ids only when the list is
    /// written for the first time, so re-crawling a track never double-counts.
    async fn write_relation(
        &self,
        table: Table,
        counter: Counter,
        track_id: u64,
        ids: &[u64],
    ) -> WriterResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        if self.batches.first_seen(table, track_id).await? {
            self.batches
                .increment(counter, track_id, ids.len() as i64)
                .await?;
        }
        self.batches.set(table, track_id, &join_ids(ids)).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordWriter for BatchRecordWriter {
    fn name(&self) -> &'static str {
        "batch-store"
    }

    fn tracks_relations(&self) -> bool {
        true
    }

    async fn init_batch(
        &self,
        kind: CrawlKind,
        batch: BatchId,
        range: RangeInclusive<u64>,
    ) -> WriterResult<()> {
        self.batches
            .init_batch(kind.record_table(), batch, range)
            .await?;
        Ok(())
    }

    async fn member_ids(
        &self,
        kind: CrawlKind,
        batch: BatchId,
        _range: RangeInclusive<u64>,
    ) -> WriterResult<Vec<u64>> {
        Ok(self.batches.member_ids(kind.record_table(), batch).await?)
    }

    async fn should_crawl(&self, kind: CrawlKind, id: u64) -> WriterResult<bool> {
        Ok(self.batches.exists(kind.record_table(), id).await?)
    }

    async fn write_track(&self, crawled: &CrawledTrack) -> WriterResult<()> {
        let track = &crawled.track;

        if let Some(user) = track.user_preview() {
            if self.batches.first_seen(Table::UserMeta, user.id).await? {
                let snapshot = serde_json::to_string(user)?;
                self.batches.set(Table::UserMeta, user.id, &snapshot).await?;
            }
        }

        self.write_relation(
            Table::TrackCommenters,
            Counter::Commenters,
            track.id,
            &crawled.commenters,
        )
        .await?;
        self.write_relation(
            Table::TrackFavoriters,
            Counter::Favoriters,
            track.id,
            &crawled.favoriters,
        )
        .await?;

        let record = serde_json::to_string(&StoredTrack {
            track,
            last_crawl: Utc::now(),
        })?;
        self.batches.set(Table::TrackMeta, track.id, &record).await?;
        Ok(())
    }

    async fn write_playlist(&self, playlist: &Playlist, track_ids: &[u64]) -> WriterResult<()> {
        if self
            .batches
            .first_seen(Table::PlaylistTracks, playlist.id)
            .await?
        {
            for track_id in track_ids {
                self.batches
                    .increment(Counter::Playlists, *track_id, 1)
                    .await?;
            }
        }
        self.batches
            .set(Table::PlaylistTracks, playlist.id, &join_ids(track_ids))
            .await?;
        Ok(())
    }

    async fn discard(&self, kind: CrawlKind, id: u64) -> WriterResult<()> {
        self.batches.delete(kind.record_table(), id).await?;
        Ok(())
    }
}
