//! Remote API boundary
//!
//! This module contains everything the crawler knows about the content API:
//! - The [`ApiClient`] fetch contract the crawl core depends on
//! - The reqwest-backed [`HttpApiClient`]
//! - The records it returns and the error classification

mod http;
mod models;

pub use http::{build_http_client, HttpApiClient};
pub use models::{Comment, CreatedWith, Favoriter, Playlist, Track, TrackRef, UserPreview};

use async_trait::async_trait;
use thiserror::Error;

/// Entries requested per page of a paginated listing
pub const PAGE_LIMIT: u64 = 200;

/// Classified failure of a single fetch
#[derive(Debug, Error)]
pub enum FetchError {
    /// The resource does not exist or is not accessible (HTTP 4xx)
    #[error("{resource} not found (HTTP {status})")]
    NotFound { resource: String, status: u16 },

    /// The response body could not be decoded into the expected record
    #[error("Malformed payload from {resource}: {message}")]
    Malformed { resource: String, message: String },

    /// Network failure, timeout, rate limiting or a server error
    #[error("Transient failure fetching {resource}: {message}")]
    Transient { resource: String, message: String },
}

impl FetchError {
    /// Whether the caller should back off before the next request
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Fetch contract of the content API
///
/// Each call is a single request; retries and pagination are the caller's
/// concern.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Id of the most recently created track
    async fn high_track_id(&self) -> Result<u64, FetchError>;

    async fn fetch_track(&self, id: u64) -> Result<Track, FetchError>;

    async fn fetch_playlist(&self, id: u64) -> Result<Playlist, FetchError>;

    /// One page of up to [`PAGE_LIMIT`] comments starting at `offset`
    async fn fetch_comments(&self, track_id: u64, offset: u64) -> Result<Vec<Comment>, FetchError>;

    /// One page of up to [`PAGE_LIMIT`] favoriters starting at `offset`
    async fn fetch_favoriters(
        &self,
        track_id: u64,
        offset: u64,
    ) -> Result<Vec<Favoriter>, FetchError>;
}
