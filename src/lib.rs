//! Sonar-Sweep: a resumable id-space crawler
//!
//! This crate walks the full numeric id-space of a paginated content API
//! (tracks first, then playlists), storing records, derived relationship
//! lists and first-seen counters in a key-value store. Progress lives in a
//! durable pending/in-flight queue so an interrupted crawl can resume.

pub mod api;
pub mod batch;
pub mod config;
pub mod crawler;
pub mod output;
pub mod queue;
pub mod store;
pub mod writer;

use thiserror::Error;

/// Main error type for Sonar-Sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] queue::QueueError),

    #[error("Record writer error: {0}")]
    Writer(#[from] writer::WriterError),

    #[error("API error: {0}")]
    Fetch(#[from] api::FetchError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

// Re-export commonly used types
pub use batch::{BatchId, BatchStore, SENTINEL};
pub use config::Config;
pub use crawler::{CrawlContext, CrawlOptions, Coordinator};
pub use queue::DurableQueue;
pub use store::{CrawlKind, KvStore, MemoryStore, RedisStore};
