//! Plan request options.

use chrono::NaiveDate;

/// Rider preferences for one planning request.
///
/// Request validation (origin != destination, parsable date) happens at the
/// API boundary before these options reach the planner.
#[derive(Debug, Clone)]
pub struct RoutePlansOptions {
    /// Travel date.
    pub date: NaiveDate,
    /// Relax the overnight/duration cutoffs and explore every sailing
    /// instead of only the earliest workable one.
    pub show_all: bool,
    /// Rider holds assured loading.
    pub assured: bool,
    /// Rider holds a reservation.
    pub reservation: bool,
    /// Rider travels with a hostled vehicle.
    pub hostled: bool,
    /// Safety buffer in minutes ahead of every check-in deadline.
    pub buffer: u32,
}

impl RoutePlansOptions {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            show_all: false,
            assured: false,
            reservation: false,
            hostled: false,
            buffer: 15,
        }
    }
}
