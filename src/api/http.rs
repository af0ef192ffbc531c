//! HTTP client for the content API
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building one shared HTTP client with a generous idle pool
//! - Typed GET requests for tracks, playlists and paginated listings
//! - Error classification into [`FetchError`]

use crate::api::{ApiClient, Comment, Favoriter, FetchError, Playlist, Track, PAGE_LIMIT};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Builds the HTTP client shared by every worker
///
/// One client is reused for all requests so connections are pooled; the
/// timeout is the only per-request deadline the crawler enforces.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("sonar-sweep/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(120))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(500)
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`ApiClient`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    client: Client,
    base: String,
    client_id: String,
}

impl HttpApiClient {
    /// Creates a client for the API at `base` (e.g. `http://api.soundcloud.com`)
    pub fn new(client: Client, base: &str, client_id: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
        }
    }

    /// Sends a GET request and decodes the JSON body
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | HTTP 2xx, decodable body | `Ok` |
    /// | HTTP 2xx, undecodable body | `Malformed` |
    /// | HTTP 429 or 5xx | `Transient` |
    /// | other HTTP 4xx | `NotFound` |
    /// | timeout, connection or body read failure | `Transient` |
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base, path);

        let response = self
            .client
            .get(&url)
            .query(&[("client_id", self.client_id.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| transient(path, &e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(FetchError::Transient {
                resource: path.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }
        if !status.is_success() {
            return Err(FetchError::NotFound {
                resource: path.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| transient(path, &e))?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Malformed {
            resource: path.to_string(),
            message: e.to_string(),
        })
    }

    fn page_query(offset: u64) -> [(&'static str, String); 2] {
        [("limit", PAGE_LIMIT.to_string()), ("offset", offset.to_string())]
    }
}

fn transient(path: &str, error: &reqwest::Error) -> FetchError {
    let message = if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else {
        error.to_string()
    };
    FetchError::Transient {
        resource: path.to_string(),
        message,
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    /// Listing without a search term, newest first, one result
    async fn high_track_id(&self) -> Result<u64, FetchError> {
        let tracks: Vec<Track> = self
            .get_json(
                "/tracks",
                &[("limit", "1".to_string()), ("created_at[from]", String::new())],
            )
            .await?;

        tracks
            .first()
            .map(|t| t.id)
            .ok_or_else(|| FetchError::Malformed {
                resource: "/tracks".to_string(),
                message: "empty track listing".to_string(),
            })
    }

    async fn fetch_track(&self, id: u64) -> Result<Track, FetchError> {
        self.get_json(&format!("/tracks/{}", id), &[]).await
    }

    async fn fetch_playlist(&self, id: u64) -> Result<Playlist, FetchError> {
        self.get_json(&format!("/playlists/{}", id), &[]).await
    }

    async fn fetch_comments(&self, track_id: u64, offset: u64) -> Result<Vec<Comment>, FetchError> {
        self.get_json(
            &format!("/tracks/{}/comments", track_id),
            &Self::page_query(offset),
        )
        .await
    }

    async fn fetch_favoriters(
        &self,
        track_id: u64,
        offset: u64,
    ) -> Result<Vec<Favoriter>, FetchError> {
        self.get_json(
            &format!("/tracks/{}/favoriters", track_id),
            &Self::page_query(offset),
        )
        .await
    }
}
