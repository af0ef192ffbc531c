//! Crawler coordinator - phase orchestration
//!
//! A crawl runs two phases in strict order, tracks then playlists. Each phase
//! goes through the same steps:
//! - Seeding: recover the in-flight set (resume) or reset and initialize every
//!   batch of the id-space (fresh run)
//! - Draining: claim batch ids from the durable queue and feed them to the
//!   worker pool over a bounded channel
//! - Barrier: close the channel and wait for every worker to return
//!
//! A shutdown stops seeding and claiming. Batches already handed to the
//! channel are still processed, the phase reaches its barrier without
//! counting as completed, and the next phase is not started.

use crate::batch::{batch_range, batches_for};
use crate::crawler::stats::StatsSnapshot;
use crate::crawler::worker::{run_worker, BatchReceiver};
use crate::crawler::CrawlContext;
use crate::store::CrawlKind;
use crate::SweepError;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// How a crawl should start and how large the id-spaces are
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlOptions {
    /// Reset the queue and re-initialize every batch
    pub fresh: bool,
    /// Move batches left in-flight by an interrupted run back to pending
    pub restart: bool,
    /// Highest track id to crawl
    pub max_track_id: u64,
    /// Highest playlist id to crawl
    pub max_playlist_id: u64,
    /// Number of concurrent workers per phase
    pub workers: usize,
}

impl CrawlOptions {
    fn max_id(&self, kind: CrawlKind) -> u64 {
        match kind {
            CrawlKind::Track => self.max_track_id,
            CrawlKind::Playlist => self.max_playlist_id,
        }
    }
}

/// Outcome of a whole crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Phases that drained completely
    pub phases_completed: Vec<CrawlKind>,
    /// Batch ids handed to workers, over all phases
    pub batches_dispatched: u64,
    pub stats: StatsSnapshot,
    /// Whether the crawl stopped because of a shutdown request
    pub interrupted: bool,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    ctx: CrawlContext,
    options: CrawlOptions,
}

impl Coordinator {
    pub fn new(ctx: CrawlContext, options: CrawlOptions) -> Self {
        Self { ctx, options }
    }

    /// Runs both phases
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSummary)` - Both phases finished, or shutdown was requested
    /// * `Err(SweepError)` - Seeding or claiming failed, or a worker panicked
    pub async fn run(&self) -> Result<CrawlSummary, SweepError> {
        tracing::info!(
            "Starting crawl with {} workers using the {} writer",
            self.options.workers,
            self.ctx.writer.name()
        );

        let mut phases_completed = Vec::new();
        let mut batches_dispatched = 0;

        for kind in CrawlKind::PHASES {
            if self.ctx.is_shutting_down() {
                break;
            }
            batches_dispatched += self.run_phase(kind).await?;
            if self.ctx.is_shutting_down() {
                break;
            }
            phases_completed.push(kind);
        }

        let stats = self.ctx.stats.snapshot();
        let interrupted = self.ctx.is_shutting_down();
        if interrupted {
            tracing::info!(
                "Crawl interrupted after {} ids in {:.0?}; resume with --restart true --empty false",
                stats.crawled,
                stats.elapsed
            );
        } else {
            tracing::info!(
                "Crawl completed: {} ids crawled ({} found, {} discarded) in {:.0?}",
                stats.crawled,
                stats.found,
                stats.discarded,
                stats.elapsed
            );
        }

        Ok(CrawlSummary {
            phases_completed,
            batches_dispatched,
            stats,
            interrupted,
        })
    }

    /// Seeds, drains and joins one phase; returns the number of batches dispatched
    async fn run_phase(&self, kind: CrawlKind) -> Result<u64, SweepError> {
        tracing::info!("Phase {}: seeding", kind);
        self.seed(kind).await?;

        tracing::info!(
            "Phase {}: draining {} batches",
            kind,
            self.ctx.queue.pending_len(kind).await?
        );
        let workers = self.options.workers.max(1);
        let (tx, rx) = mpsc::channel(workers);
        let rx: BatchReceiver = Arc::new(Mutex::new(rx));
        let max_id = self.options.max_id(kind);

        let handles: Vec<JoinHandle<()>> = (0..workers)
            .map(|n| tokio::spawn(run_worker(n, kind, self.ctx.clone(), rx.clone(), max_id)))
            .collect();
        drop(rx);

        let dispatched = self.dispatch(kind, tx).await;

        tracing::info!("Phase {}: waiting for {} workers", kind, handles.len());
        for handle in handles {
            handle.await?;
        }

        let dispatched = dispatched?;
        tracing::info!("Phase {}: barrier reached after {} batches", kind, dispatched);
        Ok(dispatched)
    }

    /// Prepares the pending set of a phase
    ///
    /// A fresh run (or any run over a non-durable queue) empties both sets
    /// and initializes every batch before seeding its id, so a batch is
    /// never claimable before its members exist. A restart moves the
    /// in-flight set back to pending. Otherwise the pending set is drained
    /// as it is.
    async fn seed(&self, kind: CrawlKind) -> Result<(), SweepError> {
        let queue = &self.ctx.queue;

        if self.options.fresh || !queue.is_durable() {
            queue.reset(kind).await?;
            queue.clear_in_flight(kind).await?;

            let max_id = self.options.max_id(kind);
            let mut seeded = 0u64;
            for batch in batches_for(max_id) {
                if self.ctx.is_shutting_down() {
                    tracing::info!("Seeding of {} batches stopped after {}", kind, seeded);
                    return Ok(());
                }
                let Some(range) = batch_range(batch, max_id) else {
                    continue;
                };
                self.ctx.writer.init_batch(kind, batch, range).await?;
                queue.seed(kind, &[batch]).await?;
                seeded += 1;
            }
            tracing::info!("Seeded {} {} batches up to id {}", seeded, kind, max_id);
        } else if self.options.restart {
            let recovered = queue.recover(kind).await?;
            tracing::info!("Recovered {} in-flight {} batches", recovered, kind);
        } else {
            tracing::info!("Continuing with the existing {} queue", kind);
        }

        Ok(())
    }

    /// Claims batch ids and pushes them to the workers until the pending set
    /// is empty or shutdown is requested; consumes the sender so the channel
    /// closes on return
    async fn dispatch(&self, kind: CrawlKind, tx: mpsc::Sender<u64>) -> Result<u64, SweepError> {
        let mut dispatched = 0;

        loop {
            if self.ctx.is_shutting_down() {
                tracing::info!("Stopped dispatching {} batches", kind);
                break;
            }

            let Some(batch) = self.ctx.queue.claim_next(kind).await? else {
                break;
            };

            tokio::select! {
                biased;
                _ = self.ctx.shutdown.cancelled() => {
                    tracing::info!(
                        "Stopped dispatching {} batches; batch {} stays in-flight",
                        kind,
                        batch
                    );
                    break;
                }
                sent = tx.send(batch) => {
                    if sent.is_err() {
                        tracing::error!(
                            "All {} workers exited; batch {} stays in-flight",
                            kind,
                            batch
                        );
                        break;
                    }
                }
            }
            dispatched += 1;
        }

        Ok(dispatched)
    }
}
