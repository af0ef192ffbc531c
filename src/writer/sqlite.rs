//! SQLite record writer
//!
//! Direct-upsert backend: one row per id, updated in place on every pass.
//! Ids that could not be resolved keep a row with `ignore_crawl = 1` so later
//! passes skip them without another request.

use crate::api::Playlist;
use crate::batch::BatchId;
use crate::store::CrawlKind;
use crate::writer::schema::initialize_schema;
use crate::writer::{join_ids, CrawledTrack, RecordWriter, WriterResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Row counts of the SQLite backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SqliteCounts {
    pub tracks: u64,
    pub ignored_tracks: u64,
    pub track_crawls: u64,
    pub playlists: u64,
    pub ignored_playlists: u64,
}

/// [`RecordWriter`] over a SQLite database
pub struct SqliteRecordWriter {
    conn: Mutex<Connection>,
}

impl SqliteRecordWriter {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteRecordWriter)` - Database opened and schema initialized
    /// * `Err(WriterError)` - Failed to open or initialize the database
    pub fn new(path: &Path) -> WriterResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> WriterResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Row counts for `--stats`
    pub fn counts(&self) -> WriterResult<SqliteCounts> {
        let conn = self.conn();
        let count = |sql: &str| -> Result<u64, rusqlite::Error> {
            conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                .map(|n| n as u64)
        };

        Ok(SqliteCounts {
            tracks: count("SELECT COUNT(*) FROM tracks WHERE ignore_crawl = 0")?,
            ignored_tracks: count("SELECT COUNT(*) FROM tracks WHERE ignore_crawl = 1")?,
            track_crawls: count("SELECT COUNT(*) FROM track_crawls")?,
            playlists: count("SELECT COUNT(*) FROM playlists WHERE ignore_crawl = 0")?,
            ignored_playlists: count("SELECT COUNT(*) FROM playlists WHERE ignore_crawl = 1")?,
        })
    }
}

fn table_name(kind: CrawlKind) -> &'static str {
    match kind {
        CrawlKind::Track => "tracks",
        CrawlKind::Playlist => "playlists",
    }
}

#[async_trait]
impl RecordWriter for SqliteRecordWriter {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn tracks_relations(&self) -> bool {
        false
    }

    /// Rows are created on first write, so there is nothing to prepare
    async fn init_batch(
        &self,
        _kind: CrawlKind,
        _batch: BatchId,
        _range: RangeInclusive<u64>,
    ) -> WriterResult<()> {
        Ok(())
    }

    async fn member_ids(
        &self,
        _kind: CrawlKind,
        _batch: BatchId,
        range: RangeInclusive<u64>,
    ) -> WriterResult<Vec<u64>> {
        Ok(range.collect())
    }

    async fn should_crawl(&self, kind: CrawlKind, id: u64) -> WriterResult<bool> {
        let sql = format!("SELECT ignore_crawl FROM {} WHERE id = ?1", table_name(kind));
        let ignored: Option<i64> = self
            .conn()
            .query_row(&sql, params![id as i64], |row| row.get(0))
            .optional()?;
        Ok(ignored != Some(1))
    }

    async fn write_track(&self, crawled: &CrawledTrack) -> WriterResult<()> {
        let track = &crawled.track;
        let payload = serde_json::to_string(track)?;
        let user_id = track.user_preview().map(|u| u.id as i64);
        let now = Utc::now().timestamp();

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO tracks (id, user_id, title, payload, ignore_crawl, first_crawl, last_crawl)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)
             ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                title = excluded.title,
                payload = excluded.payload,
                ignore_crawl = 0,
                last_crawl = excluded.last_crawl",
            params![track.id as i64, user_id, track.title, payload, now],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO track_crawls (crawled_at, track_id, payload) VALUES (?1, ?2, ?3)",
            params![now, track.id as i64, payload],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn write_playlist(&self, playlist: &Playlist, track_ids: &[u64]) -> WriterResult<()> {
        let user_id = playlist.user.as_ref().map(|u| u.id as i64);
        let now = Utc::now().timestamp();

        self.conn().execute(
            "INSERT INTO playlists (id, user_id, track_ids, ignore_crawl, first_crawl, last_crawl)
             VALUES (?1, ?2, ?3, 0, ?4, ?4)
             ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                track_ids = excluded.track_ids,
                ignore_crawl = 0,
                last_crawl = excluded.last_crawl",
            params![playlist.id as i64, user_id, join_ids(track_ids), now],
        )?;
        Ok(())
    }

    async fn discard(&self, kind: CrawlKind, id: u64) -> WriterResult<()> {
        let sql = format!(
            "INSERT INTO {} (id, ignore_crawl, first_crawl, last_crawl) VALUES (?1, 1, ?2, ?2)
             ON CONFLICT(id) DO UPDATE SET ignore_crawl = 1, last_crawl = excluded.last_crawl",
            table_name(kind)
        );
        self.conn()
            .execute(&sql, params![id as i64, Utc::now().timestamp()])?;
        Ok(())
    }
}
