//! Structured-store schedule backend.
//!
//! One row per route and date, the schedule itself as a JSON payload, so
//! the schema stays identical to the file layout's contract.

use std::path::Path;
use std::sync::Mutex;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};

use crate::domain::{FerrySchedule, LocationId};

use super::backend::{BackendError, ScheduleBackend};

/// Schedule backend over an SQLite database.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open (or create) the database at `path` and initialise the schema.
    pub fn open(path: &Path) -> Result<Self, BackendError> {
        Self::initialize(Connection::open(path)?)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, BackendError> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self, BackendError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schedules (
                 origin      TEXT NOT NULL,
                 destination TEXT NOT NULL,
                 date        TEXT NOT NULL,
                 raw_data    TEXT NOT NULL,
                 PRIMARY KEY (origin, destination, date)
             );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl ScheduleBackend for SqliteBackend {
    fn load(
        &self,
        origin: &LocationId,
        destination: &LocationId,
        date: NaiveDate,
    ) -> Option<FerrySchedule> {
        let conn = self.conn.lock().expect("schedule db mutex poisoned");
        let raw: Option<String> = conn
            .query_row(
                "SELECT raw_data FROM schedules
                 WHERE origin = ?1 AND destination = ?2 AND date = ?3",
                params![origin.as_str(), destination.as_str(), date.to_string()],
                |row| row.get(0),
            )
            .optional()
            .ok()?;
        let raw = raw?;
        match serde_json::from_str(&raw) {
            Ok(schedule) => Some(schedule),
            Err(error) => {
                tracing::warn!(%origin, %destination, %date, %error, "discarding unreadable schedule row");
                None
            }
        }
    }

    fn store(&self, schedule: &FerrySchedule) -> Result<(), BackendError> {
        let raw = serde_json::to_string(schedule)?;
        let conn = self.conn.lock().expect("schedule db mutex poisoned");
        conn.execute(
            "INSERT OR REPLACE INTO schedules (origin, destination, date, raw_data)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                schedule.origin.as_str(),
                schedule.destination.as_str(),
                schedule.date.to_string(),
                raw
            ],
        )?;
        Ok(())
    }

    fn contains(&self, origin: &LocationId, destination: &LocationId, date: NaiveDate) -> bool {
        let conn = self.conn.lock().expect("schedule db mutex poisoned");
        conn.query_row(
            "SELECT 1 FROM schedules
             WHERE origin = ?1 AND destination = ?2 AND date = ?3",
            params![origin.as_str(), destination.as_str(), date.to_string()],
            |_| Ok(()),
        )
        .optional()
        .ok()
        .flatten()
        .is_some()
    }

    fn prune(&self, keep: &[NaiveDate]) -> Result<usize, BackendError> {
        let dates: Vec<String> = keep.iter().map(NaiveDate::to_string).collect();
        let conn = self.conn.lock().expect("schedule db mutex poisoned");
        let removed = conn.execute(
            "DELETE FROM schedules
             WHERE date NOT IN (SELECT value FROM json_each(?1))",
            params![serde_json::to_string(&dates)?],
        )?;
        Ok(removed)
    }
}
