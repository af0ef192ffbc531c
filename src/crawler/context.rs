//! Handles shared by the coordinator and every worker

use crate::api::ApiClient;
use crate::crawler::backoff::Backoff;
use crate::crawler::stats::CrawlStats;
use crate::queue::DurableQueue;
use crate::writer::RecordWriter;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything a crawl task needs, passed explicitly at spawn time
#[derive(Clone)]
pub struct CrawlContext {
    pub queue: DurableQueue,
    pub writer: Arc<dyn RecordWriter>,
    pub api: Arc<dyn ApiClient>,
    pub backoff: Arc<Backoff>,
    pub stats: Arc<CrawlStats>,
    pub shutdown: CancellationToken,
}

impl CrawlContext {
    pub fn new(
        queue: DurableQueue,
        writer: Arc<dyn RecordWriter>,
        api: Arc<dyn ApiClient>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            queue,
            writer,
            api,
            backoff: Arc::new(Backoff::default()),
            stats: Arc::new(CrawlStats::new()),
            shutdown,
        }
    }

    /// Replaces the default backoff policy
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = Arc::new(backoff);
        self
    }

    /// Waits out the backoff delay, cut short by shutdown
    pub async fn back_off(&self) {
        tokio::select! {
            _ = self.backoff.wait() => {}
            _ = self.shutdown.cancelled() => {}
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
