//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the content API and run full
//! crawls end-to-end against the in-process store and the SQLite backend.

use serde_json::json;
use sonar_sweep::api::{build_http_client, ApiClient, HttpApiClient};
use sonar_sweep::crawler::{crawl, Backoff, CrawlContext, CrawlOptions};
use sonar_sweep::store::{Counter, KvStore, Table};
use sonar_sweep::writer::{BatchRecordWriter, RecordWriter, SqliteRecordWriter};
use sonar_sweep::{BatchStore, CrawlKind, DurableQueue, MemoryStore, SENTINEL};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Numeric id in the second path segment, e.g. `/tracks/42/comments` -> 42
fn id_from(request: &Request) -> u64 {
    request
        .url
        .path()
        .split('/')
        .nth(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

fn offset_from(request: &Request) -> u64 {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == "offset")
        .and_then(|(_, v)| v.parse().ok())
        .unwrap_or(0)
}

/// Answers `/tracks/{id}`; multiples of `missing_every` (when non-zero) are 404
struct TrackResponder {
    missing_every: u64,
}

impl Respond for TrackResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let id = id_from(request);
        if is_missing(id, self.missing_every) {
            return ResponseTemplate::new(404);
        }
        ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "title": format!("Track {}", id),
            "user": { "id": id % 7 + 1, "username": format!("user{}", id % 7 + 1) }
        }))
    }
}

/// Track 7 has commenters 11, 12 and 11 again; every other track has none
struct CommentResponder;

impl Respond for CommentResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body = if id_from(request) == 7 && offset_from(request) == 0 {
            json!([
                { "id": 1, "user_id": 11 },
                { "id": 2, "user_id": 12 },
                { "id": 3, "user_id": 11 }
            ])
        } else {
            json!([])
        };
        ResponseTemplate::new(200).set_body_json(body)
    }
}

/// Playlist `n` holds tracks `n` and `n + 1`
struct PlaylistResponder {
    missing_every: u64,
}

impl Respond for PlaylistResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let id = id_from(request);
        if is_missing(id, self.missing_every) {
            return ResponseTemplate::new(404);
        }
        ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "tracks": [{ "id": id }, { "id": id + 1 }]
        }))
    }
}

fn is_missing(id: u64, missing_every: u64) -> bool {
    missing_every > 0 && id % missing_every == 0
}

/// Mounts the content API on `server`, reporting `high_id` as the newest track
async fn mount_api(server: &MockServer, high_id: u64, missing_every: u64) {
    Mock::given(method("GET"))
        .and(path("/tracks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": high_id }])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/tracks/\d+$"))
        .respond_with(TrackResponder { missing_every })
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/tracks/\d+/comments$"))
        .respond_with(CommentResponder)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/tracks/\d+/favoriters$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/playlists/\d+$"))
        .respond_with(PlaylistResponder { missing_every })
        .mount(server)
        .await;
}

/// Crawl context talking to `server` with a zero-delay backoff
fn context(
    server: &MockServer,
    store: Arc<dyn KvStore>,
    writer: Arc<dyn RecordWriter>,
) -> CrawlContext {
    let api = HttpApiClient::new(
        build_http_client().expect("Failed to build HTTP client"),
        &server.uri(),
        "test-client",
    );
    CrawlContext::new(
        DurableQueue::new(store),
        writer,
        Arc::new(api),
        CancellationToken::new(),
    )
    .with_backoff(Backoff::new(Duration::ZERO, Duration::ZERO, 2))
}

fn fresh_options(max_id: u64, workers: usize) -> CrawlOptions {
    CrawlOptions {
        fresh: true,
        restart: false,
        max_track_id: max_id,
        max_playlist_id: max_id,
        workers,
    }
}

/// Every request path, in arrival order
async fn all_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .expect("Request recording is enabled")
        .into_iter()
        .map(|r| r.url.path().to_string())
        .collect()
}

/// Request paths that fetched a single track or playlist, in arrival order
async fn record_requests(server: &MockServer) -> Vec<String> {
    all_paths(server)
        .await
        .into_iter()
        .filter(|p| p.split('/').count() == 3 && p.split('/').nth(2) != Some(""))
        .collect()
}

fn batch_writer(store: &Arc<MemoryStore>) -> Arc<BatchRecordWriter> {
    Arc::new(BatchRecordWriter::new(BatchStore::new(store.clone())))
}

#[tokio::test]
async fn test_full_crawl_resolves_whole_id_space() {
    let server = MockServer::start().await;
    mount_api(&server, 2500, 0).await;

    let store = Arc::new(MemoryStore::new());
    let ctx = context(&server, store.clone(), batch_writer(&store));

    // Discover the id-space the way the binary does
    let max_track_id = ctx.api.high_track_id().await.unwrap();
    assert_eq!(max_track_id, 2500);

    let summary = crawl(ctx.clone(), fresh_options(max_track_id, 2)).await.unwrap();

    assert!(!summary.interrupted);
    assert_eq!(summary.batches_dispatched, 6);
    assert_eq!(summary.stats.found, 5000);

    // 3 batches per kind, every member resolved
    let track_batches = store.hash_keys_with_prefix("trackMeta:");
    assert_eq!(track_batches, vec!["trackMeta:0", "trackMeta:1", "trackMeta:2"]);
    let mut resolved = 0;
    for key in &track_batches {
        for value in store.hash_snapshot(key).values() {
            assert_ne!(value, SENTINEL);
            resolved += 1;
        }
    }
    assert_eq!(resolved, 2500);

    for kind in [CrawlKind::Track, CrawlKind::Playlist] {
        assert!(ctx.queue.is_drained(kind).await.unwrap());
    }

    // Every track fetch precedes every playlist fetch
    let requests = record_requests(&server).await;
    let first_playlist = requests
        .iter()
        .position(|p| p.starts_with("/playlists/"))
        .expect("Playlists were fetched");
    assert_eq!(first_playlist, 2500);
    assert!(requests[first_playlist..]
        .iter()
        .all(|p| p.starts_with("/playlists/")));
}

#[tokio::test]
async fn test_failed_fetches_delete_members() {
    let server = MockServer::start().await;
    mount_api(&server, 300, 100).await;

    let store = Arc::new(MemoryStore::new());
    let ctx = context(&server, store.clone(), batch_writer(&store));
    let summary = crawl(ctx, fresh_options(300, 4)).await.unwrap();

    assert_eq!(summary.stats.discarded, 6);
    let batches = BatchStore::new(store.clone());
    for id in [100, 200, 300] {
        assert!(!batches.exists(Table::TrackMeta, id).await.unwrap());
        assert!(!batches.exists(Table::PlaylistTracks, id).await.unwrap());
    }
    assert!(!batches.first_seen(Table::TrackMeta, 101).await.unwrap());
    assert_eq!(
        batches.get(Table::PlaylistTracks, 4).await.unwrap().as_deref(),
        Some("4,5")
    );
}

#[tokio::test]
async fn test_counters_are_not_repeated_by_a_second_run() {
    let server = MockServer::start().await;
    mount_api(&server, 50, 0).await;

    let store = Arc::new(MemoryStore::persistent());
    let batches = BatchStore::new(store.clone());

    for _ in 0..2 {
        let ctx = context(&server, store.clone(), batch_writer(&store));
        crawl(ctx, fresh_options(50, 3)).await.unwrap();

        assert_eq!(
            batches.get(Table::TrackCommenters, 7).await.unwrap().as_deref(),
            Some("11,12")
        );
        assert_eq!(batches.count(Counter::Commenters, 7).await.unwrap(), 2);
        // Track 5 is in playlists 4 and 5
        assert_eq!(batches.count(Counter::Playlists, 5).await.unwrap(), 2);
    }
}

#[tokio::test]
async fn test_restart_resumes_in_flight_batches_only() {
    let server = MockServer::start().await;
    mount_api(&server, 2500, 0).await;

    // State left behind by a crashed run: batch 1 claimed, nothing pending
    let store = Arc::new(MemoryStore::persistent());
    let writer = batch_writer(&store);
    writer
        .init_batch(CrawlKind::Track, 1, 1000..=1999)
        .await
        .unwrap();
    store
        .set_add(CrawlKind::Track.in_flight_key(), &[1])
        .await
        .unwrap();

    let ctx = context(&server, store.clone(), writer);
    let mut options = fresh_options(2500, 2);
    options.fresh = false;
    options.restart = true;

    let summary = crawl(ctx.clone(), options).await.unwrap();

    assert_eq!(summary.batches_dispatched, 1);
    assert!(ctx.queue.is_drained(CrawlKind::Track).await.unwrap());

    let requests = record_requests(&server).await;
    assert_eq!(requests.len(), 1000);
    assert!(requests.iter().all(|p| {
        let id: u64 = p.trim_start_matches("/tracks/").parse().unwrap();
        (1000..=1999).contains(&id)
    }));
}

#[tokio::test]
async fn test_sqlite_backend_skips_unresolvable_ids() {
    let server = MockServer::start().await;
    mount_api(&server, 300, 100).await;

    let dir = TempDir::new().unwrap();
    let sqlite = Arc::new(SqliteRecordWriter::new(&dir.path().join("test.sqlite3")).unwrap());

    for _ in 0..2 {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let ctx = context(&server, store, sqlite.clone());
        crawl(ctx, fresh_options(300, 4)).await.unwrap();
    }

    let counts = sqlite.counts().unwrap();
    assert_eq!(counts.tracks, 297);
    assert_eq!(counts.ignored_tracks, 3);
    assert_eq!(counts.playlists, 297);
    assert_eq!(counts.ignored_playlists, 3);

    let requests = record_requests(&server).await;
    assert_eq!(requests.iter().filter(|p| *p == "/tracks/100").count(), 1);
    assert_eq!(requests.iter().filter(|p| *p == "/tracks/101").count(), 2);
    // No relation listings without relation tracking
    assert!(!all_paths(&server)
        .await
        .iter()
        .any(|p| p.ends_with("/comments")));
}
