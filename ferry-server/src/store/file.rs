//! Directory-tree schedule backend.
//!
//! Layout: one directory per `"origin-destination"` code, one
//! pretty-printed JSON file per calendar date.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::domain::{FerrySchedule, LocationId};

use super::backend::{BackendError, ScheduleBackend};

/// Schedule backend over a local directory tree.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, origin: &LocationId, destination: &LocationId, date: NaiveDate) -> PathBuf {
        self.root
            .join(format!("{origin}-{destination}"))
            .join(format!("{date}.json"))
    }
}

impl ScheduleBackend for FileBackend {
    fn load(
        &self,
        origin: &LocationId,
        destination: &LocationId,
        date: NaiveDate,
    ) -> Option<FerrySchedule> {
        let path = self.path_for(origin, destination, date);
        let contents = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(schedule) => Some(schedule),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "discarding unreadable schedule file");
                None
            }
        }
    }

    fn store(&self, schedule: &FerrySchedule) -> Result<(), BackendError> {
        let path = self.path_for(&schedule.origin, &schedule.destination, schedule.date);
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(schedule)?;
        std::fs::write(&path, json)?;
        Ok(())
    }

    fn contains(&self, origin: &LocationId, destination: &LocationId, date: NaiveDate) -> bool {
        self.path_for(origin, destination, date).exists()
    }

    fn prune(&self, keep: &[NaiveDate]) -> Result<usize, BackendError> {
        let mut removed = 0;
        let route_dirs = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(error) => return Err(error.into()),
        };
        for route_dir in route_dirs.flatten() {
            if !route_dir.file_type()?.is_dir() {
                continue;
            }
            for file in std::fs::read_dir(route_dir.path())?.flatten() {
                let name = file.file_name().to_string_lossy().into_owned();
                let Some(stem) = name.strip_suffix(".json") else {
                    continue;
                };
                match NaiveDate::parse_from_str(stem, "%Y-%m-%d") {
                    Ok(date) if keep.contains(&date) => {}
                    Ok(_) => {
                        std::fs::remove_file(file.path())?;
                        removed += 1;
                    }
                    Err(_) => {
                        tracing::warn!(file = %name, "skipping cache file with unrecognized name");
                    }
                }
            }
        }
        Ok(removed)
    }
}
