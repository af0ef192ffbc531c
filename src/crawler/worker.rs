//! Batch workers
//!
//! Each worker takes batch ids off the shared channel until it is closed and
//! resolves every member of the batch:
//! - tracks: the record, the uploader snapshot, commenters and favoriters
//! - playlists: the member track list
//!
//! Fetch failures never stop a worker. The member is discarded and the next
//! one is processed. Store failures keep the batch in-flight.

use crate::api::FetchError;
use crate::batch::{batch_range, BatchId};
use crate::crawler::paginate::collect_pages;
use crate::crawler::CrawlContext;
use crate::store::CrawlKind;
use crate::writer::{dedup_ids, CrawledTrack, WriterResult};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Receiving end of a phase's distribution channel, shared by all workers
pub type BatchReceiver = Arc<Mutex<mpsc::Receiver<BatchId>>>;

/// Drains batch ids from `batches` until the channel is closed and empty
pub async fn run_worker(
    worker_id: usize,
    kind: CrawlKind,
    ctx: CrawlContext,
    batches: BatchReceiver,
    max_id: u64,
) {
    tracing::debug!("Worker {} started on {} batches", worker_id, kind);

    loop {
        let next = batches.lock().await.recv().await;
        let Some(batch) = next else {
            break;
        };
        process_batch(&ctx, kind, batch, max_id).await;
    }

    tracing::debug!("Worker {} finished {} batches", worker_id, kind);
}

/// Resolves every member of one batch, then releases it from the in-flight set
///
/// If the member listing cannot be read, or any member could not be checked
/// or stored, the batch stays in-flight so the next resume picks it up again.
pub async fn process_batch(ctx: &CrawlContext, kind: CrawlKind, batch: BatchId, max_id: u64) {
    #[allow(clippy::reversed_empty_ranges)]
    let range = batch_range(batch, max_id).unwrap_or(1..=0);

    let ids = match ctx.writer.member_ids(kind, batch, range).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!("Failed to list members of {} batch {}: {}", kind, batch, e);
            return;
        }
    };

    tracing::debug!("Processing {} batch {} ({} members)", kind, batch, ids.len());

    let mut store_failures = 0;
    for id in ids {
        match ctx.writer.should_crawl(kind, id).await {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                tracing::warn!("Failed to check {} {}: {}", kind, id, e);
                store_failures += 1;
                continue;
            }
        }

        let result = match kind {
            CrawlKind::Track => crawl_track(ctx, id).await,
            CrawlKind::Playlist => crawl_playlist(ctx, id).await,
        };
        if let Err(e) = result {
            tracing::warn!("Failed to store {} {}: {}", kind, id, e);
            store_failures += 1;
        }
    }

    if store_failures > 0 {
        tracing::error!(
            "{} batch {} left in-flight after {} store failures",
            kind,
            batch,
            store_failures
        );
        return;
    }

    if let Err(e) = ctx.queue.release(kind, batch).await {
        tracing::error!("Failed to release {} batch {}: {}", kind, batch, e);
    }
}

async fn crawl_track(ctx: &CrawlContext, id: u64) -> WriterResult<()> {
    let track = match ctx.api.fetch_track(id).await {
        Ok(track) if track.id == id => track,
        Ok(track) => {
            let e = FetchError::Malformed {
                resource: format!("/tracks/{}", id),
                message: format!("response carries id {}", track.id),
            };
            return discard(ctx, CrawlKind::Track, id, e).await;
        }
        Err(e) => return discard(ctx, CrawlKind::Track, id, e).await,
    };
    ctx.backoff.reset();

    let mut crawled = CrawledTrack {
        track,
        ..Default::default()
    };

    if ctx.writer.tracks_relations() {
        let comments = collect_pages(ctx, &format!("comments of track {}", id), |offset| {
            ctx.api.fetch_comments(id, offset)
        })
        .await;
        let favoriters = collect_pages(ctx, &format!("favoriters of track {}", id), |offset| {
            ctx.api.fetch_favoriters(id, offset)
        })
        .await;

        crawled.commenters = dedup_ids(comments.iter().map(|c| c.user_id).filter(|u| *u > 0));
        crawled.favoriters = dedup_ids(favoriters.iter().map(|f| f.id).filter(|u| *u > 0));
    }

    ctx.writer.write_track(&crawled).await?;
    ctx.stats.record_found(CrawlKind::Track, id);
    Ok(())
}

async fn crawl_playlist(ctx: &CrawlContext, id: u64) -> WriterResult<()> {
    let playlist = match ctx.api.fetch_playlist(id).await {
        Ok(playlist) => playlist,
        Err(e) => return discard(ctx, CrawlKind::Playlist, id, e).await,
    };
    ctx.backoff.reset();

    let track_ids = dedup_ids(playlist.tracks.iter().map(|t| t.id).filter(|t| *t > 0));
    if track_ids.is_empty() {
        tracing::debug!("Playlist {} has no tracks", id);
        ctx.writer.discard(CrawlKind::Playlist, id).await?;
        ctx.stats.record_discarded(CrawlKind::Playlist, id);
        return Ok(());
    }

    ctx.writer.write_playlist(&playlist, &track_ids).await?;
    ctx.stats.record_found(CrawlKind::Playlist, id);
    Ok(())
}

async fn discard(
    ctx: &CrawlContext,
    kind: CrawlKind,
    id: u64,
    error: FetchError,
) -> WriterResult<()> {
    tracing::debug!("Discarding {} {}: {}", kind, id, error);
    ctx.writer.discard(kind, id).await?;
    ctx.stats.record_discarded(kind, id);

    if error.is_transient() {
        ctx.back_off().await;
    }
    Ok(())
}
