//! Crawler module for id-space crawling
//!
//! This module contains the core crawling logic, including:
//! - Phase coordination over the durable queue
//! - The worker pool and per-record policy
//! - Pagination of relation listings and the shared backoff
//! - Cooperative shutdown on termination signals

mod backoff;
mod context;
mod coordinator;
mod paginate;
mod shutdown;
mod stats;
mod worker;

pub use backoff::{Backoff, DEFAULT_FACTOR, DEFAULT_MAX_DELAY, DEFAULT_MIN_DELAY};
pub use context::CrawlContext;
pub use coordinator::{Coordinator, CrawlOptions, CrawlSummary};
pub use paginate::{collect_pages, SHORT_PAGE};
pub use shutdown::spawn_signal_listener;
pub use stats::{CrawlStats, StatsSnapshot, PROGRESS_INTERVAL};
pub use worker::{process_batch, run_worker, BatchReceiver};

use crate::SweepError;

/// Runs a complete crawl: tracks, then playlists
///
/// # Arguments
///
/// * `ctx` - Queue, record writer, API client and shutdown token of the crawl
/// * `options` - Start mode, id-space bounds and worker count
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl completed or was stopped by a signal
/// * `Err(SweepError)` - Crawl failed
pub async fn crawl(ctx: CrawlContext, options: CrawlOptions) -> Result<CrawlSummary, SweepError> {
    Coordinator::new(ctx, options).run().await
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-process API double for crawler tests

    use super::{Backoff, CrawlContext};
    use crate::api::{
        ApiClient, Comment, Favoriter, FetchError, Playlist, Track, TrackRef, UserPreview,
    };
    use crate::batch::BatchStore;
    use crate::queue::DurableQueue;
    use crate::store::{CrawlKind, KvStore, MemoryStore};
    use crate::writer::{BatchRecordWriter, RecordWriter};
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    /// Resolves every id unless told otherwise and records fetch order
    #[derive(Default)]
    pub struct MockApi {
        missing_tracks: HashSet<u64>,
        commenters: HashMap<u64, Vec<u64>>,
        favoriters: HashMap<u64, Vec<u64>>,
        playlists: HashMap<u64, Vec<u64>>,
        cancel_after: Option<(usize, CancellationToken)>,
        calls: Mutex<Vec<(CrawlKind, u64)>>,
    }

    impl MockApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn missing_track(mut self, id: u64) -> Self {
            self.missing_tracks.insert(id);
            self
        }

        pub fn with_commenters(mut self, id: u64, users: Vec<u64>) -> Self {
            self.commenters.insert(id, users);
            self
        }

        pub fn with_favoriters(mut self, id: u64, users: Vec<u64>) -> Self {
            self.favoriters.insert(id, users);
            self
        }

        pub fn with_playlist(mut self, id: u64, tracks: Vec<u64>) -> Self {
            self.playlists.insert(id, tracks);
            self
        }

        /// Cancels `token` once `fetches` tracks have been fetched
        pub fn cancel_after(mut self, fetches: usize, token: CancellationToken) -> Self {
            self.cancel_after = Some((fetches, token));
            self
        }

        pub fn calls(&self) -> Vec<(CrawlKind, u64)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn fetched_tracks(&self) -> Vec<u64> {
            self.calls()
                .into_iter()
                .filter(|(kind, _)| *kind == CrawlKind::Track)
                .map(|(_, id)| id)
                .collect()
        }

        fn page(list: Option<&Vec<u64>>, offset: u64) -> Vec<u64> {
            list.map(|ids| {
                ids.iter()
                    .skip(offset as usize)
                    .take(crate::api::PAGE_LIMIT as usize)
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
        }
    }

    #[async_trait]
    impl ApiClient for MockApi {
        async fn high_track_id(&self) -> Result<u64, FetchError> {
            Ok(1000)
        }

        async fn fetch_track(&self, id: u64) -> Result<Track, FetchError> {
            let fetched = {
                let mut calls = self.calls.lock().unwrap();
                calls.push((CrawlKind::Track, id));
                calls.iter().filter(|(kind, _)| *kind == CrawlKind::Track).count()
            };
            if let Some((after, token)) = &self.cancel_after {
                if fetched == *after {
                    token.cancel();
                }
            }
            if self.missing_tracks.contains(&id) {
                return Err(FetchError::NotFound {
                    resource: format!("/tracks/{}", id),
                    status: 404,
                });
            }
            Ok(Track {
                id,
                title: Some(format!("Track {}", id)),
                user: Some(UserPreview {
                    id: id % 10 + 1,
                    ..Default::default()
                }),
                ..Default::default()
            })
        }

        async fn fetch_playlist(&self, id: u64) -> Result<Playlist, FetchError> {
            self.calls.lock().unwrap().push((CrawlKind::Playlist, id));
            let tracks = self.playlists.get(&id).cloned().unwrap_or_else(|| vec![id]);
            Ok(Playlist {
                id,
                user: None,
                tracks: tracks
                    .into_iter()
                    .map(|id| TrackRef { id, user_id: None })
                    .collect(),
            })
        }

        async fn fetch_comments(
            &self,
            track_id: u64,
            offset: u64,
        ) -> Result<Vec<Comment>, FetchError> {
            Ok(Self::page(self.commenters.get(&track_id), offset)
                .into_iter()
                .enumerate()
                .map(|(n, user_id)| Comment {
                    id: offset + n as u64,
                    user_id,
                    ..Default::default()
                })
                .collect())
        }

        async fn fetch_favoriters(
            &self,
            track_id: u64,
            offset: u64,
        ) -> Result<Vec<Favoriter>, FetchError> {
            Ok(Self::page(self.favoriters.get(&track_id), offset)
                .into_iter()
                .map(|id| Favoriter {
                    id,
                    ..Default::default()
                })
                .collect())
        }
    }

    /// Context over the given parts with a zero-delay backoff
    pub fn context_with(
        store: Arc<dyn KvStore>,
        writer: Arc<dyn RecordWriter>,
        api: Arc<dyn ApiClient>,
    ) -> CrawlContext {
        CrawlContext::new(DurableQueue::new(store), writer, api, CancellationToken::new())
            .with_backoff(Backoff::new(Duration::ZERO, Duration::ZERO, 2))
    }

    /// Context over a fresh memory store and a default [`MockApi`]
    pub fn test_context() -> CrawlContext {
        let store = Arc::new(MemoryStore::new());
        let writer = Arc::new(BatchRecordWriter::new(BatchStore::new(store.clone())));
        context_with(store, writer, Arc::new(MockApi::new()))
    }
}
