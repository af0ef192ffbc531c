//! Output module for crawl reports
//!
//! This module handles:
//! - Loading queue and record statistics for `--stats`
//! - Printing the summary of a finished crawl

pub mod stats;

pub use stats::{
    load_statistics, print_crawl_summary, print_statistics, QueueStatistics, SweepStatistics,
};
