//! Storage layer for the focus tracker.
//!
//! Persists applications, focus sessions, web sessions and the block list
//! using `rusqlite`, and runs the report queries over them.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Each process (the sampling loop, a report command) opens its own `Database`;
//! SQLite serializes their transactions.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond precision
//! (e.g., `2024-01-15T10:30:00.000Z`). This ensures:
//! - Lexicographic ordering matches chronological ordering
//! - Human-readable values in the database
//! - Timezone-aware (always UTC)
//!
//! ## Current Sessions
//!
//! Each session table carries a partial unique index on `is_current`, so the
//! database itself rejects a second current session on a track. Every tick of
//! the tracker runs in one `IMMEDIATE` transaction.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use ft_core::{
    AppId, AppName, DomainRow, GroupBy, Observation, OpenSession, Outcome, SessionStore, TagGroup,
    TagName, Track, Tracker, UsageRow, domain_key, duration_secs,
};
use rusqlite::{Connection, ErrorCode, OptionalExtension, TransactionBehavior, params};
use serde::Serialize;
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored session timestamp.
    #[error("invalid timestamp for session {session_id}: {timestamp}")]
    TimestampParse {
        session_id: i64,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl DbError {
    /// Whether retrying the same work later may succeed.
    ///
    /// Lock contention and I/O failures are transient; anything else (a
    /// missing table, corrupt rows) means the store cannot be trusted.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::DiskFull
            ),
            _ => false,
        }
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A stored focus or web session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    pub id: i64,
    pub track: Track,
    pub app_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_secs: i64,
    /// Web sessions only; may be missing while a page loads.
    pub title: Option<String>,
    /// Web sessions only.
    pub url: Option<String>,
    pub is_current: bool,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS applications (
                id INTEGER PRIMARY KEY,
                app_name TEXT NOT NULL UNIQUE,
                tag_name TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_applications_tag ON applications(tag_name);

            -- duration: whole seconds, always end_time - start_time
            CREATE TABLE IF NOT EXISTS focus_sessions (
                id INTEGER PRIMARY KEY,
                app_id INTEGER NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                duration INTEGER NOT NULL DEFAULT 0,
                is_current INTEGER NOT NULL DEFAULT 1,
                FOREIGN KEY (app_id) REFERENCES applications(id)
            );

            CREATE INDEX IF NOT EXISTS idx_focus_sessions_start ON focus_sessions(start_time);
            CREATE INDEX IF NOT EXISTS idx_focus_sessions_app ON focus_sessions(app_id);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_focus_sessions_current
                ON focus_sessions(is_current) WHERE is_current = 1;

            -- title: NULL until the page has loaded
            CREATE TABLE IF NOT EXISTS web_sessions (
                id INTEGER PRIMARY KEY,
                app_id INTEGER NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                duration INTEGER NOT NULL DEFAULT 0,
                title TEXT,
                url TEXT NOT NULL,
                is_current INTEGER NOT NULL DEFAULT 1,
                FOREIGN KEY (app_id) REFERENCES applications(id)
            );

            CREATE INDEX IF NOT EXISTS idx_web_sessions_start ON web_sessions(start_time);
            CREATE INDEX IF NOT EXISTS idx_web_sessions_app ON web_sessions(app_id);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_web_sessions_current
                ON web_sessions(is_current) WHERE is_current = 1;

            CREATE TABLE IF NOT EXISTS blocked_applications (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
            );
            ",
        )?;
        Ok(())
    }

    /// Applies one observation in a single transaction.
    ///
    /// Nothing is written if any step fails.
    pub fn observe(
        &mut self,
        tracker: &Tracker,
        observation: &Observation,
        now: DateTime<Utc>,
    ) -> Result<Outcome, DbError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = {
            let mut store = TickStore { conn: &tx };
            tracker.observe(&mut store, observation, now)?
        };
        tx.commit()?;
        Ok(outcome)
    }

    /// Lists all sessions of a track ordered by start time.
    pub fn sessions(&self, track: Track) -> Result<Vec<SessionRecord>, DbError> {
        self.query_sessions(track, false)
    }

    /// Returns the current session of a track, if any.
    pub fn current_session(&self, track: Track) -> Result<Option<SessionRecord>, DbError> {
        Ok(self.query_sessions(track, true)?.into_iter().next())
    }

    fn query_sessions(
        &self,
        track: Track,
        current_only: bool,
    ) -> Result<Vec<SessionRecord>, DbError> {
        let (title, url) = match track {
            Track::Focus => ("NULL", "NULL"),
            Track::Web => ("s.title", "s.url"),
        };
        let filter = if current_only {
            "WHERE s.is_current = 1"
        } else {
            ""
        };
        let query = format!(
            "
            SELECT s.id, a.app_name, s.start_time, s.end_time, s.duration, {title}, {url}, s.is_current
            FROM {table} s
            JOIN applications a ON a.id = s.app_id
            {filter}
            ORDER BY s.start_time ASC, s.id ASC
            ",
            table = session_table(track),
        );
        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map([], |row| {
            Ok(SessionRow {
                id: row.get(0)?,
                app_name: row.get(1)?,
                start_time: row.get(2)?,
                end_time: row.get(3)?,
                duration: row.get(4)?,
                title: row.get(5)?,
                url: row.get(6)?,
                is_current: row.get(7)?,
            })
        })?;
        let mut sessions = Vec::new();
        for row in rows {
            let row = row?;
            sessions.push(SessionRecord {
                id: row.id,
                track,
                start_time: parse_timestamp(&row.start_time, row.id)?,
                end_time: parse_timestamp(&row.end_time, row.id)?,
                app_name: row.app_name,
                duration_secs: row.duration,
                title: row.title,
                url: row.url,
                is_current: row.is_current,
            });
        }
        Ok(sessions)
    }
}

#[derive(Debug)]
struct SessionRow {
    id: i64,
    app_name: String,
    start_time: String,
    end_time: String,
    duration: i64,
    title: Option<String>,
    url: Option<String>,
    is_current: bool,
}

/// [`SessionStore`] over the connection of an open transaction.
struct TickStore<'c> {
    conn: &'c Connection,
}

impl SessionStore for TickStore<'_> {
    type Error = DbError;

    fn is_blocked(&self, app_name: &str) -> Result<bool, DbError> {
        let blocked = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM blocked_applications WHERE name = ?)",
            [app_name],
            |row| row.get(0),
        )?;
        Ok(blocked)
    }

    fn resolve_app(&mut self, app_name: &AppName) -> Result<AppId, DbError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO applications (app_name) VALUES (?)",
            [app_name.as_str()],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM applications WHERE app_name = ?",
            [app_name.as_str()],
            |row| row.get(0),
        )?;
        Ok(AppId(id))
    }

    fn open_session(&self, track: Track) -> Result<Option<OpenSession>, DbError> {
        let url = match track {
            Track::Focus => "NULL",
            Track::Web => "url",
        };
        let query = format!(
            "SELECT id, app_id, start_time, end_time, {url} FROM {table} WHERE is_current = 1",
            table = session_table(track),
        );
        let row = self
            .conn
            .query_row(&query, [], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })
            .optional()?;
        let Some((id, app_id, start_time, end_time, url)) = row else {
            return Ok(None);
        };
        Ok(Some(OpenSession {
            id,
            track,
            app_id: AppId(app_id),
            start_time: parse_timestamp(&start_time, id)?,
            end_time: parse_timestamp(&end_time, id)?,
            url,
        }))
    }

    fn close_open(&mut self, track: Track) -> Result<bool, DbError> {
        let query = format!(
            "UPDATE {table} SET is_current = 0 WHERE is_current = 1",
            table = session_table(track),
        );
        Ok(self.conn.execute(&query, [])? > 0)
    }

    fn start_focus(&mut self, app: AppId, now: DateTime<Utc>) -> Result<(), DbError> {
        let now = format_timestamp(now);
        self.conn.execute(
            "
            INSERT INTO focus_sessions (app_id, start_time, end_time, duration, is_current)
            VALUES (?, ?, ?, 0, 1)
            ",
            params![app.0, now, now],
        )?;
        Ok(())
    }

    fn start_web(
        &mut self,
        app: AppId,
        url: &str,
        title: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let now = format_timestamp(now);
        self.conn.execute(
            "
            INSERT INTO web_sessions (app_id, start_time, end_time, duration, title, url, is_current)
            VALUES (?, ?, ?, 0, ?, ?, 1)
            ",
            params![app.0, now, now, title, url],
        )?;
        Ok(())
    }

    fn extend(
        &mut self,
        session: &OpenSession,
        now: DateTime<Utc>,
        title: Option<&str>,
    ) -> Result<(), DbError> {
        let duration = duration_secs(session.start_time, now);
        let end_time = format_timestamp(now);
        match session.track {
            Track::Focus => self.conn.execute(
                "UPDATE focus_sessions SET end_time = ?, duration = ? WHERE id = ?",
                params![end_time, duration, session.id],
            )?,
            Track::Web => self.conn.execute(
                "
                UPDATE web_sessions
                SET end_time = ?, duration = ?, title = COALESCE(?, title)
                WHERE id = ?
                ",
                params![end_time, duration, title, session.id],
            )?,
        };
        Ok(())
    }
}

impl Database {
    /// Sums session durations per application attribute.
    ///
    /// Only sessions whose `start_time` lies in `[start, end)` count. Focus and
    /// web sessions are aggregated separately and the two result sets are
    /// concatenated, focus rows first, so the same key may appear twice.
    /// Rows come back in no particular order beyond that.
    pub fn report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        group_by: GroupBy,
    ) -> Result<Vec<UsageRow>, DbError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let mut rows = self.usage_for(Track::Focus, start, end, group_by)?;
        rows.extend(self.usage_for(Track::Web, start, end, group_by)?);
        Ok(rows)
    }

    fn usage_for(
        &self,
        track: Track,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        group_by: GroupBy,
    ) -> Result<Vec<UsageRow>, DbError> {
        let column = group_by.as_str();
        let query = format!(
            "
            SELECT a.{column}, SUM(s.duration)
            FROM {table} s
            JOIN applications a ON a.id = s.app_id
            WHERE s.start_time >= ? AND s.start_time < ?
            GROUP BY a.{column}
            ORDER BY a.{column} ASC
            ",
            table = session_table(track),
        );
        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map([format_timestamp(start), format_timestamp(end)], |row| {
            Ok(UsageRow {
                key: row.get(0)?,
                duration_secs: row.get(1)?,
            })
        })?;
        let mut usage = Vec::new();
        for row in rows {
            usage.push(row?);
        }
        Ok(usage)
    }

    /// Sums web session durations per domain, longest first.
    ///
    /// Uses the same `[start, end)` window over `start_time` as [`Self::report`].
    pub fn web_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DomainRow>, DbError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT url, SUM(duration)
            FROM web_sessions
            WHERE start_time >= ? AND start_time < ?
            GROUP BY url
            ",
        )?;
        let rows = stmt.query_map([format_timestamp(start), format_timestamp(end)], |row| {
            let url: String = row.get(0)?;
            let duration: i64 = row.get(1)?;
            Ok((url, duration))
        })?;
        let mut by_domain: BTreeMap<String, i64> = BTreeMap::new();
        for row in rows {
            let (url, duration) = row?;
            *by_domain.entry(domain_key(&url)).or_default() += duration;
        }

        let mut domains: Vec<DomainRow> = by_domain
            .into_iter()
            .map(|(domain, duration_secs)| DomainRow {
                domain,
                duration_secs,
            })
            .collect();
        // Stable sort keeps the BTreeMap's domain order among equal durations.
        domains.sort_by_key(|row| std::cmp::Reverse(row.duration_secs));
        Ok(domains)
    }
}

impl Database {
    /// Returns the names of all blocked applications.
    pub fn blocked_names(&self) -> Result<BTreeSet<String>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM blocked_applications ORDER BY name ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut names = BTreeSet::new();
        for row in rows {
            names.insert(row?);
        }
        Ok(names)
    }

    /// Blocks an application from being tracked.
    ///
    /// Deletes every session of the application and the application itself,
    /// then records the name as blocked. Returns `false` if no application
    /// with that exact name exists.
    pub fn block(&mut self, app_name: &str) -> Result<bool, DbError> {
        let tx = self.conn.transaction()?;
        let app: Option<(i64, String)> = tx
            .query_row(
                "SELECT id, app_name FROM applications WHERE app_name = ?",
                [app_name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((app_id, stored_name)) = app else {
            return Ok(false);
        };

        let web_deleted = tx.execute("DELETE FROM web_sessions WHERE app_id = ?", [app_id])?;
        let focus_deleted = tx.execute("DELETE FROM focus_sessions WHERE app_id = ?", [app_id])?;
        tx.execute("DELETE FROM applications WHERE id = ?", [app_id])?;
        tx.execute(
            "INSERT OR IGNORE INTO blocked_applications (name) VALUES (?)",
            [&stored_name],
        )?;
        tx.commit()?;

        tracing::info!(
            app = %stored_name,
            focus_deleted,
            web_deleted,
            "blocked application"
        );
        Ok(true)
    }

    /// Deletes all sessions, applications and block list entries.
    ///
    /// Returns the number of sessions removed.
    pub fn drop_all(&mut self) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        let web_deleted = tx.execute("DELETE FROM web_sessions", [])?;
        let focus_deleted = tx.execute("DELETE FROM focus_sessions", [])?;
        let apps_deleted = tx.execute("DELETE FROM applications", [])?;
        tx.execute("DELETE FROM blocked_applications", [])?;
        tx.commit()?;

        tracing::info!(focus_deleted, web_deleted, apps_deleted, "dropped tracking data");
        Ok(focus_deleted + web_deleted)
    }

    /// Removes an application from the block list.
    ///
    /// Returns whether it was blocked.
    pub fn unblock(&mut self, app_name: &str) -> Result<bool, DbError> {
        let removed = self
            .conn
            .execute("DELETE FROM blocked_applications WHERE name = ?", [app_name])?;
        Ok(removed > 0)
    }

    /// Tags an application. Returns `false` if the application is unknown.
    pub fn add_tag(&mut self, tag_name: &TagName, app_name: &str) -> Result<bool, DbError> {
        let updated = self.conn.execute(
            "UPDATE applications SET tag_name = ? WHERE app_name = ?",
            params![tag_name.as_str(), app_name],
        )?;
        Ok(updated > 0)
    }

    /// Clears an application's tag. Returns `false` if the application is unknown.
    pub fn remove_tag(&mut self, app_name: &str) -> Result<bool, DbError> {
        let updated = self.conn.execute(
            "UPDATE applications SET tag_name = NULL WHERE app_name = ?",
            [app_name],
        )?;
        Ok(updated > 0)
    }

    /// Lists every tag with the applications carrying it, ordered by tag.
    pub fn tags(&self) -> Result<Vec<TagGroup>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT tag_name, app_name
            FROM applications
            WHERE tag_name IS NOT NULL
            ORDER BY tag_name ASC, app_name ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            let tag_name: String = row.get(0)?;
            let app_name: String = row.get(1)?;
            Ok((tag_name, app_name))
        })?;
        let mut groups: Vec<TagGroup> = Vec::new();
        for row in rows {
            let (tag_name, app_name) = row?;
            match groups.last_mut() {
                Some(group) if group.tag_name == tag_name => group.app_names.push(app_name),
                _ => groups.push(TagGroup {
                    tag_name,
                    app_names: vec![app_name],
                }),
            }
        }
        Ok(groups)
    }
}

const fn session_table(track: Track) -> &'static str {
    match track {
        Track::Focus => "focus_sessions",
        Track::Web => "web_sessions",
    }
}

fn parse_timestamp(timestamp: &str, session_id: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            session_id,
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
