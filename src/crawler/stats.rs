//! Crawl progress counters

use crate::store::CrawlKind;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Ids between two progress lines
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Shared counters of one crawl, updated by every worker
#[derive(Debug)]
pub struct CrawlStats {
    started: Instant,
    crawled: AtomicU64,
    found: AtomicU64,
    discarded: AtomicU64,
}

/// Point-in-time copy of [`CrawlStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub crawled: u64,
    pub found: u64,
    pub discarded: u64,
    pub elapsed: Duration,
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            crawled: AtomicU64::new(0),
            found: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    /// Counts a resolved id
    pub fn record_found(&self, kind: CrawlKind, id: u64) {
        self.found.fetch_add(1, Ordering::Relaxed);
        self.record_crawled(kind, id);
    }

    /// Counts an id that could not be resolved
    pub fn record_discarded(&self, kind: CrawlKind, id: u64) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
        self.record_crawled(kind, id);
    }

    fn record_crawled(&self, kind: CrawlKind, id: u64) {
        let crawled = self.crawled.fetch_add(1, Ordering::Relaxed) + 1;
        if crawled % PROGRESS_INTERVAL == 0 {
            let snapshot = self.snapshot();
            let rate = snapshot.crawled as f64 / snapshot.elapsed.as_secs_f64().max(0.001);
            tracing::info!(
                "Progress: {} ids crawled ({} found, {} discarded) in {:.0?}, {:.1} ids/sec, at {} {}",
                snapshot.crawled,
                snapshot.found,
                snapshot.discarded,
                snapshot.elapsed,
                rate,
                kind,
                id
            );
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            crawled: self.crawled.load(Ordering::Relaxed),
            found: self.found.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            elapsed: self.started.elapsed(),
        }
    }
}
