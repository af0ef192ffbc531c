//! Statistics from the crawl store
//!
//! This module provides functionality for extracting and displaying
//! queue and record statistics for `--stats`.

use crate::crawler::CrawlSummary;
use crate::queue::DurableQueue;
use crate::store::CrawlKind;
use crate::writer::{SqliteCounts, SqliteRecordWriter};
use crate::SweepError;

/// Queue sizes of one crawl kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStatistics {
    pub kind: CrawlKind,
    /// Batch ids waiting to be claimed
    pub pending: u64,
    /// Batch ids claimed by a run that has not completed them
    pub in_flight: u64,
}

/// Everything `--stats` reports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepStatistics {
    /// Queue sizes, only for a durable queue
    pub queues: Vec<QueueStatistics>,

    /// Row counts of the SQLite backend
    pub records: Option<SqliteCounts>,
}

/// Loads statistics from the queue and, if given, the SQLite backend
///
/// # Arguments
///
/// * `queue` - The work queue to inspect
/// * `sqlite` - The SQLite record writer, when that backend is configured
///
/// # Returns
///
/// * `Ok(SweepStatistics)` - Successfully loaded statistics
/// * `Err(SweepError)` - Failed to query the store or the database
pub async fn load_statistics(
    queue: &DurableQueue,
    sqlite: Option<&SqliteRecordWriter>,
) -> Result<SweepStatistics, SweepError> {
    let mut queues = Vec::new();
    if queue.is_durable() {
        for kind in CrawlKind::PHASES {
            queues.push(QueueStatistics {
                kind,
                pending: queue.pending_len(kind).await?,
                in_flight: queue.in_flight_len(kind).await?,
            });
        }
    }

    let records = sqlite.map(|writer| writer.counts()).transpose()?;

    Ok(SweepStatistics { queues, records })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &SweepStatistics) {
    println!("=== Crawl Statistics ===\n");

    if !stats.queues.is_empty() {
        println!("Queues:");
        for queue in &stats.queues {
            println!(
                "  {}: {} pending, {} in-flight",
                queue.kind, queue.pending, queue.in_flight
            );
        }
        let unfinished: u64 = stats.queues.iter().map(|q| q.in_flight).sum();
        if unfinished > 0 {
            println!(
                "  {} batches were left in-flight; resume with --restart true --empty false",
                unfinished
            );
        }
        println!();
    }

    if let Some(records) = &stats.records {
        println!("Records:");
        println!(
            "  Tracks: {} resolved, {} unresolvable, {} snapshots",
            records.tracks, records.ignored_tracks, records.track_crawls
        );
        println!(
            "  Playlists: {} resolved, {} unresolvable",
            records.playlists, records.ignored_playlists
        );
        println!();
    }
}

/// Prints the outcome of a finished crawl
pub fn print_crawl_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");
    let phases: Vec<&str> = summary.phases_completed.iter().map(|k| k.as_str()).collect();
    println!("  Phases completed: {}", phases.join(", "));
    println!("  Batches dispatched: {}", summary.batches_dispatched);
    println!(
        "  Ids crawled: {} ({} found, {} discarded)",
        summary.stats.crawled, summary.stats.found, summary.stats.discarded
    );
    println!("  Elapsed: {:.0?}", summary.stats.elapsed);
    if summary.interrupted {
        println!("  Interrupted: resume with --restart true --empty false");
    }
}
