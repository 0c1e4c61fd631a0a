//! Domain types.
//!
//! Immutable value types shared read-only across all requests: locations and
//! connections (the static network), sailings and schedules (timetable
//! data), and route plans (per-request itineraries).

mod connection;
mod error;
mod location;
mod plan;
mod sailing;

pub use connection::{Connection, ConnectionId, ConnectionKind, TravelMode};
pub use error::DomainError;
pub use location::{City, Location, LocationId, LocationKind, Terminal};
pub use plan::{RoutePlan, RoutePlanSegment, TimeInterval, TimeIntervalKind};
pub use sailing::{FerrySailing, FerrySchedule};
