//! Durable schedule persistence contract.
//!
//! One narrow trait covers every backend: load/store/contains for
//! individual entries keyed by (origin, destination, date), and a prune of
//! everything outside the refresh window. Additional backends are trivial
//! additions; the in-memory one below doubles as the test backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::domain::{FerrySchedule, LocationId};

/// Persistence faults. Read paths swallow these into absence; write paths
/// surface them so the store can log.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Durable storage for fetched schedules, one entry per route and date.
pub trait ScheduleBackend: Send + Sync {
    /// Loads an entry; absent or unreadable entries are `None`.
    fn load(
        &self,
        origin: &LocationId,
        destination: &LocationId,
        date: NaiveDate,
    ) -> Option<FerrySchedule>;

    /// Stores an entry, overwriting any previous one for the same key.
    fn store(&self, schedule: &FerrySchedule) -> Result<(), BackendError>;

    /// Whether an entry exists, without deserializing it.
    fn contains(&self, origin: &LocationId, destination: &LocationId, date: NaiveDate) -> bool;

    /// Deletes every entry whose date is outside `keep`, returning how many
    /// were removed.
    fn prune(&self, keep: &[NaiveDate]) -> Result<usize, BackendError>;
}

type MemoryKey = (LocationId, LocationId, NaiveDate);

/// In-memory backend; shares its map across clones so tests can observe a
/// store's writes.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    entries: Arc<Mutex<HashMap<MemoryKey, FerrySchedule>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("memory backend poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ScheduleBackend for MemoryBackend {
    fn load(
        &self,
        origin: &LocationId,
        destination: &LocationId,
        date: NaiveDate,
    ) -> Option<FerrySchedule> {
        self.entries
            .lock()
            .expect("memory backend poisoned")
            .get(&(origin.clone(), destination.clone(), date))
            .cloned()
    }

    fn store(&self, schedule: &FerrySchedule) -> Result<(), BackendError> {
        self.entries.lock().expect("memory backend poisoned").insert(
            (
                schedule.origin.clone(),
                schedule.destination.clone(),
                schedule.date,
            ),
            schedule.clone(),
        );
        Ok(())
    }

    fn contains(&self, origin: &LocationId, destination: &LocationId, date: NaiveDate) -> bool {
        self.entries
            .lock()
            .expect("memory backend poisoned")
            .contains_key(&(origin.clone(), destination.clone(), date))
    }

    fn prune(&self, keep: &[NaiveDate]) -> Result<usize, BackendError> {
        let mut entries = self.entries.lock().expect("memory backend poisoned");
        let before = entries.len();
        entries.retain(|(_, _, date), _| keep.contains(date));
        Ok(before - entries.len())
    }
}
