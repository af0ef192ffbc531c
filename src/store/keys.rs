//! Key layout of the store
//!
//! Records are sharded into hashes of 1000 members: `{prefix}:{id / 1000}`
//! with the id itself as the field name.

use crate::batch::{batch_of, BatchId};
use std::fmt;

/// The two id-spaces that are crawled, in phase order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlKind {
    Track,
    Playlist,
}

impl CrawlKind {
    /// Phase order of a full crawl
    pub const PHASES: [CrawlKind; 2] = [CrawlKind::Track, CrawlKind::Playlist];

    /// Set of batch ids waiting to be claimed
    pub fn pending_key(&self) -> &'static str {
        match self {
            Self::Track => "crawlTracks",
            Self::Playlist => "crawlPlaylists",
        }
    }

    /// Set of batch ids claimed but not yet completed
    pub fn in_flight_key(&self) -> &'static str {
        match self {
            Self::Track => "crawlTracksTodo",
            Self::Playlist => "crawlPlaylistsTodo",
        }
    }

    /// Hash table holding this kind's member values
    pub fn record_table(&self) -> Table {
        match self {
            Self::Track => Table::TrackMeta,
            Self::Playlist => Table::PlaylistTracks,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Playlist => "playlist",
        }
    }
}

impl fmt::Display for CrawlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Batch-sharded value tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// Serialized track records
    TrackMeta,
    /// First-seen user snapshots
    UserMeta,
    /// Comma-joined commenter ids per track
    TrackCommenters,
    /// Comma-joined favoriter ids per track
    TrackFavoriters,
    /// Comma-joined member track ids per playlist
    PlaylistTracks,
}

impl Table {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::TrackMeta => "trackMeta",
            Self::UserMeta => "userMeta",
            Self::TrackCommenters => "trackCommenters",
            Self::TrackFavoriters => "trackFavoriters",
            Self::PlaylistTracks => "playlistTracks",
        }
    }
}

/// Batch-sharded counter tables, keyed by the counted track id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    /// Distinct users that commented on a track
    Commenters,
    /// Distinct users that favorited a track
    Favoriters,
    /// Distinct playlists a track appears in
    Playlists,
}

impl Counter {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Commenters => "trackCountCommenters",
            Self::Favoriters => "trackCountFavoriters",
            Self::Playlists => "trackCountPlaylist",
        }
    }
}

/// Hash key of a whole batch
pub fn batch_key(prefix: &str, batch: BatchId) -> String {
    format!("{}:{}", prefix, batch)
}

/// Hash key and field name of a single id
pub fn hash_location(prefix: &str, id: u64) -> (String, String) {
    (batch_key(prefix, batch_of(id)), id.to_string())
}
