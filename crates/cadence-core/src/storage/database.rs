//! SQLite-based segment storage and statistics.
//!
//! Provides persistent storage for:
//! - Completed and paused session segments
//! - Segment statistics (daily and all-time, per technique)

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::data_dir;
use crate::error::{DatabaseError, RecordingFailed};
use crate::recorder::{CompletedSegment, SessionRecorder};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub id: i64,
    pub session_id: String,
    pub technique: String,
    pub phase_name: String,
    pub started_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechniqueStats {
    pub technique: String,
    pub segments: u64,
    pub total_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Stats {
    pub total_segments: u64,
    pub total_secs: u64,
    pub sessions: u64,
    pub today_segments: u64,
    pub today_secs: u64,
    pub by_technique: Vec<TechniqueStats>,
}

/// SQLite database for segment storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/cadence.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, DatabaseError> {
        let path = data_dir().map_err(DatabaseError::DataDir)?.join("cadence.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS segments (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id    TEXT NOT NULL,
                technique     TEXT NOT NULL,
                phase_name    TEXT NOT NULL,
                started_at    TEXT NOT NULL,
                duration_secs INTEGER NOT NULL,
                recorded_at   TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_segments_started_at ON segments(started_at);
            CREATE INDEX IF NOT EXISTS idx_segments_session_id ON segments(session_id);
            CREATE INDEX IF NOT EXISTS idx_segments_technique ON segments(technique);",
        )?;
        Ok(())
    }

    /// Record a segment.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_segment(&self, segment: &CompletedSegment) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO segments (session_id, technique, phase_name, started_at, duration_secs, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                segment.session_id.to_string(),
                segment.technique,
                segment.phase_name,
                segment.started_at.to_rfc3339(),
                segment.duration_seconds,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent segments first.
    pub fn recent_segments(&self, limit: usize) -> Result<Vec<SegmentRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, technique, phase_name, started_at, duration_secs, recorded_at
             FROM segments
             ORDER BY started_at DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], row_to_record)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Segments of one session in the order they were recorded.
    pub fn session_segments(&self, session_id: Uuid) -> Result<Vec<SegmentRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, technique, phase_name, started_at, duration_secs, recorded_at
             FROM segments
             WHERE session_id = ?1
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![session_id.to_string()], row_to_record)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn stats_today(&self) -> Result<Stats, DatabaseError> {
        let mut stats = self.stats_since(Some(&today_start()))?;
        stats.today_segments = stats.total_segments;
        stats.today_secs = stats.total_secs;
        Ok(stats)
    }

    pub fn stats_all(&self) -> Result<Stats, DatabaseError> {
        let mut stats = self.stats_since(None)?;

        // Today's segments
        let (count, secs) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(duration_secs), 0)
             FROM segments
             WHERE started_at >= ?1",
            params![today_start()],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?)),
        )?;
        stats.today_segments = count;
        stats.today_secs = secs;
        Ok(stats)
    }

    fn stats_since(&self, since: Option<&str>) -> Result<Stats, DatabaseError> {
        let since = since.unwrap_or("");
        let mut stmt = self.conn.prepare(
            "SELECT technique, COUNT(*), COALESCE(SUM(duration_secs), 0)
             FROM segments
             WHERE started_at >= ?1
             GROUP BY technique
             ORDER BY technique",
        )?;
        let rows = stmt.query_map(params![since], |row| {
            Ok(TechniqueStats {
                technique: row.get(0)?,
                segments: row.get(1)?,
                total_secs: row.get(2)?,
            })
        })?;

        let mut stats = Stats::default();
        for row in rows {
            let technique = row?;
            stats.total_segments += technique.segments;
            stats.total_secs += technique.total_secs;
            stats.by_technique.push(technique);
        }

        stats.sessions = self.conn.query_row(
            "SELECT COUNT(DISTINCT session_id) FROM segments WHERE started_at >= ?1",
            params![since],
            |row| row.get::<_, u64>(0),
        )?;
        Ok(stats)
    }
}

impl SessionRecorder for Database {
    fn record(&mut self, segment: &CompletedSegment) -> Result<(), RecordingFailed> {
        self.record_segment(segment)
            .map(|_| ())
            .map_err(|e| RecordingFailed::new(&segment.phase_name, e))
    }
}

fn today_start() -> String {
    let today = Utc::now().format("%Y-%m-%d").to_string();
    format!("{today}T00:00:00+00:00")
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<SegmentRecord> {
    Ok(SegmentRecord {
        id: row.get(0)?,
        session_id: row.get(1)?,
        technique: row.get(2)?,
        phase_name: row.get(3)?,
        started_at: parse_timestamp(row.get::<_, String>(4)?, 4)?,
        duration_secs: row.get(5)?,
        recorded_at: parse_timestamp(row.get::<_, String>(6)?, 6)?,
    })
}

fn parse_timestamp(value: String, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e)))
}
