//! Database schema definitions
//!
//! This module contains the SQL schema of the direct-upsert SQLite backend.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Latest snapshot of every track id ever attempted
CREATE TABLE IF NOT EXISTS tracks (
    id INTEGER PRIMARY KEY,
    user_id INTEGER,
    title TEXT,
    payload TEXT,
    ignore_crawl INTEGER NOT NULL DEFAULT 0,
    first_crawl INTEGER NOT NULL,
    last_crawl INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tracks_user ON tracks(user_id);
CREATE INDEX IF NOT EXISTS idx_tracks_first_crawl ON tracks(first_crawl);
CREATE INDEX IF NOT EXISTS idx_tracks_last_crawl ON tracks(last_crawl);

-- One row per successful track fetch, for history across passes
CREATE TABLE IF NOT EXISTS track_crawls (
    crawled_at INTEGER NOT NULL,
    track_id INTEGER NOT NULL,
    payload TEXT NOT NULL,
    PRIMARY KEY (crawled_at, track_id)
);

-- Latest member list of every playlist id ever attempted
CREATE TABLE IF NOT EXISTS playlists (
    id INTEGER PRIMARY KEY,
    user_id INTEGER,
    track_ids TEXT,
    ignore_crawl INTEGER NOT NULL DEFAULT 0,
    first_crawl INTEGER NOT NULL,
    last_crawl INTEGER NOT NULL
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
