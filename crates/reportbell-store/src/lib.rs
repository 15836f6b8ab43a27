//! # Reportbell Store
//! SQLite store accessor — read-only queries for the reconciliation engine,
//! plus one-time schema init and seeding.
//!
//! Two tables: `assignments` (location → responsible user, many-to-many) and
//! `submissions` (append-only log of report events). The engine never mutates
//! either table; submissions arrive from the external reporting flow.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, NaiveTime, Utc};
use reportbell_core::error::{ReportbellError, Result};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::Mutex;

/// One submission row, newest-first when listed for a day.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Submission {
    pub user_id: String,
    pub location_name: String,
    pub image_url: Option<String>,
    pub report_text: String,
    /// UTC datetime text, `YYYY-MM-DD HH:MM:SS`.
    pub submitted_at: String,
}

/// UTC half-open window `[start, end)` covering one calendar date in the
/// bot's fixed timezone. Submission timestamps are stored in UTC, so "today"
/// filtering converts the zoned date to its UTC bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct DayWindow {
    pub start: String,
    pub end: String,
}

impl DayWindow {
    /// Window for the calendar date of `now` in its own offset.
    pub fn for_local_date(now: DateTime<FixedOffset>) -> Self {
        let offset_secs = i64::from(now.offset().local_minus_utc());
        let local_midnight = now.date_naive().and_time(NaiveTime::MIN);
        let start_utc = local_midnight - Duration::seconds(offset_secs);
        let end_utc = start_utc + Duration::days(1);
        Self {
            start: format_utc(start_utc),
            end: format_utc(end_utc),
        }
    }
}

fn format_utc(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// SQLite-backed report store.
pub struct ReportStore {
    conn: Mutex<Connection>,
}

impl ReportStore {
    /// Open or create the store and run migrations.
    /// Failure here is fatal at startup — the loop never runs without a store.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| ReportbellError::Store(format!("DB open: {e}")))?;
        Self::from_connection(conn)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ReportbellError::Store(format!("DB open: {e}")))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        // WAL so the external reporting flow can write while the bot reads
        conn.execute_batch("PRAGMA journal_mode = WAL;").ok();
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS assignments (
                location_name TEXT NOT NULL,
                user_id       TEXT NOT NULL,
                PRIMARY KEY (location_name, user_id)
            );

            CREATE TABLE IF NOT EXISTS submissions (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id       TEXT NOT NULL,
                location_name TEXT NOT NULL,
                image_url     TEXT,
                report_text   TEXT,
                submitted_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .map_err(|e| ReportbellError::Store(format!("Migration: {e}")))?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ReportbellError::Store(e.to_string()))
    }

    /// Seed assignment rows. `INSERT OR IGNORE` — safe to re-run. The whole
    /// batch commits in one transaction so a mid-batch error leaves nothing
    /// behind.
    pub fn seed_assignments(&self, pairs: &[(String, String)]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| ReportbellError::Store(format!("Seed: {e}")))?;
        let mut inserted = 0;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR IGNORE INTO assignments (location_name, user_id) VALUES (?1, ?2)",
                )
                .map_err(|e| ReportbellError::Store(format!("Seed: {e}")))?;
            for (location, user_id) in pairs {
                inserted += stmt
                    .execute(params![location, user_id])
                    .map_err(|e| ReportbellError::Store(format!("Seed: {e}")))?;
            }
        }
        tx.commit()
            .map_err(|e| ReportbellError::Store(format!("Seed: {e}")))?;
        Ok(inserted)
    }

    /// Distinct user IDs across all assignments.
    pub fn responsible_users(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT user_id FROM assignments ORDER BY user_id")
            .map_err(|e| ReportbellError::Store(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| ReportbellError::Store(e.to_string()))?;
        rows.collect::<rusqlite::Result<Vec<String>>>()
            .map_err(|e| ReportbellError::Store(e.to_string()))
    }

    /// Distinct user IDs with a submission inside the given day window.
    pub fn submitters_on(&self, window: &DayWindow) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT user_id FROM submissions
                 WHERE submitted_at >= ?1 AND submitted_at < ?2
                 ORDER BY user_id",
            )
            .map_err(|e| ReportbellError::Store(e.to_string()))?;
        let rows = stmt
            .query_map(params![window.start, window.end], |row| row.get(0))
            .map_err(|e| ReportbellError::Store(e.to_string()))?;
        rows.collect::<rusqlite::Result<Vec<String>>>()
            .map_err(|e| ReportbellError::Store(e.to_string()))
    }

    /// All submissions inside the given day window, newest first.
    pub fn submissions_on(&self, window: &DayWindow) -> Result<Vec<Submission>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT user_id, location_name, image_url, report_text, submitted_at
                 FROM submissions
                 WHERE submitted_at >= ?1 AND submitted_at < ?2
                 ORDER BY submitted_at DESC, id DESC",
            )
            .map_err(|e| ReportbellError::Store(e.to_string()))?;
        let rows = stmt
            .query_map(params![window.start, window.end], |row| {
                Ok(Submission {
                    user_id: row.get(0)?,
                    location_name: row.get(1)?,
                    image_url: row.get(2)?,
                    report_text: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    submitted_at: row.get(4)?,
                })
            })
            .map_err(|e| ReportbellError::Store(e.to_string()))?;
        rows.collect::<rusqlite::Result<Vec<Submission>>>()
            .map_err(|e| ReportbellError::Store(e.to_string()))
    }

    /// Append a submission, stamped now (UTC). The bot itself never calls
    /// this from the loop — it is the boundary the external reporting flow
    /// (and the tests) write through.
    pub fn record_submission(
        &self,
        user_id: &str,
        location_name: &str,
        image_url: Option<&str>,
        report_text: &str,
    ) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO submissions (user_id, location_name, image_url, report_text, submitted_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id,
                location_name,
                image_url,
                report_text,
                format_utc(Utc::now().naive_utc())
            ],
        )
        .map_err(|e| ReportbellError::Store(format!("Insert submission: {e}")))?;
        Ok(())
    }

    /// Count of assignment rows — used by `--init-db` reporting.
    pub fn assignment_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM assignments", [], |row| row.get(0))
            .map_err(|e| ReportbellError::Store(e.to_string()))?;
        Ok(count as usize)
    }
}
