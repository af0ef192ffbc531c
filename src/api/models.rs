//! Records returned by the remote API
//!
//! The API is loose about nulls, so nearly every field is optional.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Track {
    pub id: u64,
    pub created_at: Option<String>,
    pub user_id: Option<u64>,
    pub duration: Option<u64>,
    pub commentable: Option<bool>,
    pub state: Option<String>,
    pub sharing: Option<String>,
    pub tag_list: Option<String>,
    pub permalink: Option<String>,
    pub description: Option<String>,
    pub streamable: Option<bool>,
    pub downloadable: Option<bool>,
    pub genre: Option<String>,
    pub purchase_url: Option<String>,
    pub label_name: Option<String>,
    pub isrc: Option<String>,
    pub video_url: Option<String>,
    pub track_type: Option<String>,
    pub key_signature: Option<String>,
    pub bpm: Option<f32>,
    pub title: Option<String>,
    pub release_year: Option<u32>,
    pub release_month: Option<u32>,
    pub release_day: Option<u32>,
    pub original_format: Option<String>,
    pub original_content_size: Option<u64>,
    pub license: Option<String>,
    pub uri: Option<String>,
    pub permalink_url: Option<String>,
    pub artwork_url: Option<String>,
    pub waveform_url: Option<String>,
    pub user: Option<UserPreview>,
    pub stream_url: Option<String>,
    pub download_url: Option<String>,
    pub playback_count: Option<u64>,
    pub download_count: Option<u64>,
    pub favoritings_count: Option<u64>,
    pub comment_count: Option<u64>,
    pub created_with: Option<CreatedWith>,
    pub attachments_uri: Option<String>,
}

impl Track {
    /// Id of the uploading user, if the API attached one
    pub fn user_preview(&self) -> Option<&UserPreview> {
        self.user.as_ref().filter(|u| u.id > 0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreview {
    pub id: u64,
    pub permalink: Option<String>,
    pub username: Option<String>,
    pub uri: Option<String>,
    pub permalink_url: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatedWith {
    pub id: u64,
    pub name: Option<String>,
    pub uri: Option<String>,
    pub permalink_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Playlist {
    pub id: u64,
    pub user: Option<UserPreview>,
    pub tracks: Vec<TrackRef>,
}

/// Track entry inside a playlist; other fields change type between calls
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackRef {
    pub id: u64,
    pub user_id: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Comment {
    pub id: u64,
    pub user_id: u64,
    pub track_id: Option<u64>,
    pub timestamp: Option<i64>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Favoriter {
    pub id: u64,
    pub username: Option<String>,
    pub track_count: Option<u64>,
    pub playlist_count: Option<u64>,
    pub public_favorites_count: Option<u64>,
    pub followers_count: Option<u64>,
    pub followings_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_tolerates_nulls_and_missing_fields() {
        let track: Track = serde_json::from_str(
            r#"{"id": 12, "title": null, "bpm": null, "user": {"id": 7, "username": "dj"}}"#,
        )
        .unwrap();
        assert_eq!(track.id, 12);
        assert_eq!(track.title, None);
        assert_eq!(track.user_preview().map(|u| u.id), Some(7));
    }

    #[test]
    fn test_user_preview_ignores_zero_id() {
        let track: Track = serde_json::from_str(r#"{"id": 3, "user": {"id": 0}}"#).unwrap();
        assert!(track.user_preview().is_none());
    }

    #[test]
    fn test_playlist_tracks() {
        let playlist: Playlist =
            serde_json::from_str(r#"{"id": 9, "tracks": [{"id": 1}, {"id": 2, "user_id": 5}]}"#)
                .unwrap();
        assert_eq!(playlist.tracks.len(), 2);
        assert_eq!(playlist.tracks[1].user_id, Some(5));
    }
}
