use chrono::{DateTime, Local, SecondsFormat, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use serde::Serialize;
use std::path::Path;
use std::time::SystemTime;

use crate::error::Result;
use crate::recorder::KeyDelta;

/// Ease factor given to characters seen for the first time
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// A completed practice run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub id: Option<i64>,
    pub text: String,
    pub wpm: f64,
    pub accuracy: f64,
    pub duration_secs: f64,
    pub error_count: usize,
    pub timestamp: DateTime<Local>,
}

/// Accumulated outcomes and SM-2 schedule for a single character
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyStat {
    pub key: char,
    pub errors: u64,
    pub successes: u64,
    pub last_practiced: DateTime<Local>,
    pub interval: u32,
    pub repetitions: u32,
    pub ease_factor: f64,
}

impl KeyStat {
    pub fn new(key: char, now: DateTime<Local>) -> Self {
        Self {
            key,
            errors: 0,
            successes: 0,
            last_practiced: now,
            interval: 0,
            repetitions: 0,
            ease_factor: DEFAULT_EASE_FACTOR,
        }
    }

    pub fn attempts(&self) -> u64 {
        self.errors + self.successes
    }

    /// Fraction of attempts that were errors, 0.0 when never attempted
    pub fn error_rate(&self) -> f64 {
        match self.attempts() {
            0 => 0.0,
            total => self.errors as f64 / total as f64,
        }
    }
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS sessions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL,
        wpm REAL NOT NULL,
        accuracy REAL NOT NULL,
        duration REAL NOT NULL,
        error_count INTEGER NOT NULL,
        timestamp TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS key_stats (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        key TEXT NOT NULL UNIQUE,
        errors INTEGER NOT NULL DEFAULT 0,
        successes INTEGER NOT NULL DEFAULT 0,
        last_practiced TEXT NOT NULL,
        interval INTEGER NOT NULL DEFAULT 0,
        repetitions INTEGER NOT NULL DEFAULT 0,
        ease_factor REAL NOT NULL DEFAULT 2.5
    );

    CREATE INDEX IF NOT EXISTS idx_sessions_timestamp ON sessions(timestamp);
"#;

const KEY_STAT_COLUMNS: &str =
    "key, errors, successes, last_practiced, interval, repetitions, ease_factor";

const SESSION_COLUMNS: &str = "id, text, wpm, accuracy, duration, error_count, timestamp";

/// Persistent ledger of sessions and per-character statistics
#[derive(Debug)]
pub struct StatsDb {
    conn: Connection,
}

impl StatsDb {
    /// Open (or create) a database file and ensure the schema exists
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened statistics database");
        Self::with_connection(conn)
    }

    /// In-memory database, used by tests and when running without a state dir
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(StatsDb { conn })
    }

    /// Fold one session's per-character deltas into the ledger.
    ///
    /// Runs in a single transaction together with the session insert; the
    /// `schedule` callback is applied to every touched row after its counters
    /// have been incremented so SM-2 state always matches the counts.
    pub fn record_session_batch<F>(
        &mut self,
        session: &Session,
        deltas: &[(char, KeyDelta)],
        now: DateTime<Local>,
        mut schedule: F,
    ) -> Result<i64>
    where
        F: FnMut(&mut KeyStat, &KeyDelta),
    {
        let tx = self.conn.transaction()?;

        let id = insert_session(&tx, session)?;
        for (key, delta) in deltas {
            upsert_key_delta(&tx, *key, delta, now)?;

            let mut stat = key_stat_in(&tx, *key)?.unwrap_or_else(|| KeyStat::new(*key, now));
            schedule(&mut stat, delta);
            write_schedule(&tx, &stat)?;
        }

        tx.commit()?;
        Ok(id)
    }

    pub fn key_stat(&self, key: char) -> Result<Option<KeyStat>> {
        key_stat_in(&self.conn, key)
    }

    /// Every ledger row, most practiced first
    pub fn all_key_stats(&self) -> Result<Vec<KeyStat>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {KEY_STAT_COLUMNS} FROM key_stats ORDER BY (errors + successes) DESC, key ASC"
        ))?;

        let rows = stmt.query_map([], key_stat_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Characters whose review interval has elapsed, stalest first
    pub fn due_keys(&self, now: DateTime<Local>, limit: usize) -> Result<Vec<KeyStat>> {
        let ledger = self.all_key_stats()?;
        Ok(crate::sm2::select_due(&ledger, now, limit))
    }

    /// Characters with the highest error rate
    pub fn weakest_keys(&self, limit: usize) -> Result<Vec<KeyStat>> {
        let ledger = self.all_key_stats()?;
        Ok(crate::sm2::select_weakest(&ledger, limit))
    }

    /// Newest sessions first
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<Session>> {
        self.query_sessions("ORDER BY timestamp DESC, id DESC", limit)
    }

    /// The latest `limit` sessions in chronological order, for progress charts
    pub fn sessions_for_graph(&self, limit: usize) -> Result<Vec<Session>> {
        let mut sessions = self.recent_sessions(limit)?;
        sessions.reverse();
        Ok(sessions)
    }

    fn query_sessions(&self, order: &str, limit: usize) -> Result<Vec<Session>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {SESSION_COLUMNS} FROM sessions {order} LIMIT ?1"))?;

        let rows = stmt.query_map([limit as i64], session_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn session_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Mean WPM over all sessions, 0.0 when there are none
    pub fn average_wpm(&self) -> Result<f64> {
        let avg: Option<f64> = self
            .conn
            .query_row("SELECT AVG(wpm) FROM sessions", [], |row| row.get(0))?;
        Ok(avg.unwrap_or(0.0))
    }

    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}

fn insert_session(conn: &Connection, session: &Session) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO sessions (text, wpm, accuracy, duration, error_count, timestamp)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            session.text,
            session.wpm,
            session.accuracy,
            session.duration_secs,
            session.error_count as i64,
            stored_timestamp(&session.timestamp),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn upsert_key_delta(
    tx: &Transaction<'_>,
    key: char,
    delta: &KeyDelta,
    now: DateTime<Local>,
) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO key_stats (key, errors, successes, last_practiced)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(key) DO UPDATE SET
            errors = errors + excluded.errors,
            successes = successes + excluded.successes,
            last_practiced = excluded.last_practiced
        "#,
        params![key.to_string(), delta.errors, delta.successes, stored_timestamp(&now)],
    )?;
    Ok(())
}

fn write_schedule(tx: &Transaction<'_>, stat: &KeyStat) -> Result<()> {
    tx.execute(
        r#"
        UPDATE key_stats
        SET interval = ?2, repetitions = ?3, ease_factor = ?4, last_practiced = ?5
        WHERE key = ?1
        "#,
        params![
            stat.key.to_string(),
            stat.interval,
            stat.repetitions,
            stat.ease_factor,
            stored_timestamp(&stat.last_practiced),
        ],
    )?;
    Ok(())
}

fn key_stat_in(conn: &Connection, key: char) -> Result<Option<KeyStat>> {
    let stat = conn
        .query_row(
            &format!("SELECT {KEY_STAT_COLUMNS} FROM key_stats WHERE key = ?1"),
            [key.to_string()],
            key_stat_from_row,
        )
        .optional()?;
    Ok(stat)
}

/// Fixed-width UTC text; lexical order matches chronological order
fn stored_timestamp<Tz: TimeZone>(ts: &DateTime<Tz>) -> String {
    ts.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Local>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Local))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

fn key_stat_from_row(row: &Row<'_>) -> rusqlite::Result<KeyStat> {
    let key: String = row.get(0)?;
    Ok(KeyStat {
        key: key.chars().next().unwrap_or('\0'),
        errors: row.get(1)?,
        successes: row.get(2)?,
        last_practiced: parse_timestamp(row, 3)?,
        interval: row.get(4)?,
        repetitions: row.get(5)?,
        ease_factor: row.get(6)?,
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    let error_count: i64 = row.get(5)?;
    Ok(Session {
        id: Some(row.get(0)?),
        text: row.get(1)?,
        wpm: row.get(2)?,
        accuracy: row.get(3)?,
        duration_secs: row.get(4)?,
        error_count: error_count.max(0) as usize,
        timestamp: parse_timestamp(row, 6)?,
    })
}

/// Helper function to calculate a time difference in fractional seconds
pub fn time_diff_secs(start: SystemTime, end: SystemTime) -> f64 {
    end.duration_since(start).unwrap_or_default().as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};

    fn create_test_db() -> StatsDb {
        StatsDb::open_in_memory().unwrap()
    }

    fn sample_session(wpm: f64, timestamp: DateTime<Local>) -> Session {
        Session {
            id: None,
            text: "hello".to_string(),
            wpm,
            accuracy: 90.0,
            duration_secs: 12.5,
            error_count: 1,
            timestamp,
        }
    }

    fn delta(errors: u64, successes: u64) -> KeyDelta {
        KeyDelta { errors, successes }
    }

    fn save(db: &mut StatsDb, session: &Session, deltas: &[(char, KeyDelta)]) -> i64 {
        db.record_session_batch(session, deltas, session.timestamp, |_, _| {})
            .unwrap()
    }

    #[test]
    fn test_time_diff_secs() {
        let start = SystemTime::now();
        let end = start + std::time::Duration::from_millis(1500);

        assert_eq!(time_diff_secs(start, end), 1.5);
        assert_eq!(time_diff_secs(end, start), 0.0);
    }

    #[test]
    fn test_save_and_read_session() {
        let mut db = create_test_db();
        let now = Local::now();

        let id = save(&mut db, &sample_session(42.0, now), &[]);
        let sessions = db.recent_sessions(10).unwrap();

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, Some(id));
        assert_eq!(sessions[0].text, "hello");
        assert_eq!(sessions[0].wpm, 42.0);
        assert_eq!(sessions[0].error_count, 1);
    }

    #[test]
    fn test_session_ordering_and_average() {
        let mut db = create_test_db();
        let now = Local::now();

        save(&mut db, &sample_session(30.0, now - Duration::hours(2)), &[]);
        save(&mut db, &sample_session(50.0, now - Duration::hours(1)), &[]);
        save(&mut db, &sample_session(70.0, now), &[]);

        let recent: Vec<f64> = db.recent_sessions(2).unwrap().iter().map(|s| s.wpm).collect();
        assert_eq!(recent, vec![70.0, 50.0]);

        let graph: Vec<f64> = db.sessions_for_graph(10).unwrap().iter().map(|s| s.wpm).collect();
        assert_eq!(graph, vec![30.0, 50.0, 70.0]);

        // the chart keeps the latest sessions, still oldest first
        let graph: Vec<f64> = db.sessions_for_graph(2).unwrap().iter().map(|s| s.wpm).collect();
        assert_eq!(graph, vec![50.0, 70.0]);

        assert_eq!(db.average_wpm().unwrap(), 50.0);
        assert_eq!(db.session_count().unwrap(), 3);
    }

    #[test]
    fn test_average_wpm_empty() {
        let db = create_test_db();
        assert_eq!(db.average_wpm().unwrap(), 0.0);
    }

    #[test]
    fn test_stored_timestamps_are_utc() {
        let mut db = create_test_db();
        let at = Local.timestamp_opt(1_700_000_000, 0).single().unwrap();
        save(&mut db, &sample_session(40.0, at), &[('a', delta(0, 1))]);

        let raw: String = db
            .conn
            .query_row("SELECT timestamp FROM sessions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(raw, "2023-11-14T22:13:20.000000Z");

        let raw: String = db
            .conn
            .query_row("SELECT last_practiced FROM key_stats", [], |row| row.get(0))
            .unwrap();
        assert!(raw.ends_with('Z'));

        assert_eq!(db.recent_sessions(1).unwrap()[0].timestamp, at);
        assert_eq!(db.key_stat('a').unwrap().unwrap().last_practiced, at);
    }

    #[test]
    fn test_stored_timestamps_sort_across_offset_change() {
        // 02:30 summer time is 00:30Z, 02:10 winter time after the clocks go back is 01:10Z
        let summer = FixedOffset::east_opt(2 * 3600).unwrap();
        let winter = FixedOffset::east_opt(3600).unwrap();
        let before = summer.with_ymd_and_hms(2024, 10, 27, 2, 30, 0).unwrap();
        let after = winter.with_ymd_and_hms(2024, 10, 27, 2, 10, 0).unwrap();

        assert!(before < after);
        assert!(before.to_rfc3339() > after.to_rfc3339());
        assert!(stored_timestamp(&before) < stored_timestamp(&after));
    }

    #[test]
    fn test_older_offset_rows_still_parse() {
        let db = create_test_db();
        db.execute_raw(
            "INSERT INTO sessions (text, wpm, accuracy, duration, error_count, timestamp) \
             VALUES ('go', 10.0, 100.0, 1.0, 0, '2024-03-01T09:00:00+01:00')",
        )
        .unwrap();

        let session = &db.recent_sessions(1).unwrap()[0];
        assert_eq!(session.timestamp.with_timezone(&Utc).to_rfc3339(), "2024-03-01T08:00:00+00:00");
    }

    #[test]
    fn test_record_session_batch_upserts_and_increments() {
        let mut db = create_test_db();
        let now = Local::now();

        save(&mut db, &sample_session(10.0, now), &[('a', delta(1, 2)), ('b', delta(0, 3))]);
        save(&mut db, &sample_session(20.0, now), &[('a', delta(2, 1))]);

        let a = db.key_stat('a').unwrap().unwrap();
        assert_eq!((a.errors, a.successes), (3, 3));
        assert_eq!(a.ease_factor, DEFAULT_EASE_FACTOR);
        assert_eq!(a.interval, 0);

        let b = db.key_stat('b').unwrap().unwrap();
        assert_eq!((b.errors, b.successes), (0, 3));
        assert!(db.key_stat('z').unwrap().is_none());
        assert_eq!(db.session_count().unwrap(), 2);
    }

    #[test]
    fn test_record_session_batch_applies_schedule() {
        let mut db = create_test_db();
        let now = Local::now();

        let id = db
            .record_session_batch(
                &sample_session(40.0, now),
                &[('h', delta(0, 1)), ('x', delta(1, 0))],
                now,
                |stat, delta| {
                    stat.repetitions = delta.successes as u32;
                    stat.interval = 7;
                },
            )
            .unwrap();

        assert!(id > 0);
        let h = db.key_stat('h').unwrap().unwrap();
        assert_eq!((h.successes, h.repetitions, h.interval), (1, 1, 7));
        let x = db.key_stat('x').unwrap().unwrap();
        assert_eq!((x.errors, x.repetitions), (1, 0));
        assert_eq!(db.session_count().unwrap(), 1);
    }

    #[test]
    fn test_record_session_batch_is_atomic() {
        let mut db = create_test_db();
        let now = Local::now();
        db.execute_raw(
            r#"
            CREATE TRIGGER reject_q BEFORE INSERT ON key_stats
            WHEN NEW.key = 'q'
            BEGIN SELECT RAISE(ABORT, 'rejected'); END;
            "#,
        )
        .unwrap();

        let result = db.record_session_batch(
            &sample_session(40.0, now),
            &[('a', delta(0, 1)), ('q', delta(1, 0))],
            now,
            |_, _| {},
        );

        assert!(result.is_err());
        assert!(db.key_stat('a').unwrap().is_none());
        assert_eq!(db.session_count().unwrap(), 0);
    }

    #[test]
    fn test_all_key_stats_sorted_by_attempts() {
        let mut db = create_test_db();
        save(
            &mut db,
            &sample_session(10.0, Local::now()),
            &[('a', delta(1, 1)), ('b', delta(5, 5)), ('c', delta(0, 4))],
        );

        let keys: Vec<char> = db.all_key_stats().unwrap().iter().map(|s| s.key).collect();
        assert_eq!(keys, vec!['b', 'c', 'a']);
    }

    #[test]
    fn test_whitespace_keys_roundtrip() {
        let mut db = create_test_db();
        save(
            &mut db,
            &sample_session(10.0, Local::now()),
            &[(' ', delta(1, 0)), ('\n', delta(0, 1)), ('\t', delta(0, 1))],
        );

        assert!(db.key_stat(' ').unwrap().is_some());
        assert!(db.key_stat('\n').unwrap().is_some());
        assert!(db.key_stat('\t').unwrap().is_some());
    }

    #[test]
    fn test_error_rate() {
        let mut stat = KeyStat::new('e', Local::now());
        assert_eq!(stat.error_rate(), 0.0);

        stat.errors = 1;
        stat.successes = 3;
        assert_eq!(stat.error_rate(), 0.25);
        assert_eq!(stat.attempts(), 4);
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("stats.db");

        let mut db = StatsDb::open(&path).unwrap();
        save(&mut db, &sample_session(10.0, Local::now()), &[]);
        assert!(path.exists());

        let reopened = StatsDb::open(&path).unwrap();
        assert_eq!(reopened.session_count().unwrap(), 1);
    }
}
