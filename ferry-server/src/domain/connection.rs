//! Connection types.
//!
//! A `Connection` is a directed edge between two locations. Connections are
//! registered bidirectionally, but each direction is a distinct object with
//! its own id. The variant set is closed, so variant data lives in a tagged
//! `ConnectionKind` with the shared fields hoisted.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Location, LocationId};

/// Identifier of a connection: always `"{origin_id}-{destination_id}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// The id of the directed edge from `origin` to `destination`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferry_server::domain::{ConnectionId, LocationId};
    ///
    /// let id = ConnectionId::for_pair(&LocationId::new("TSA"), &LocationId::new("SWB"));
    /// assert_eq!(id.as_str(), "TSA-SWB");
    /// ```
    pub fn for_pair(origin: &LocationId, destination: &LocationId) -> Self {
        Self(format!("{origin}-{destination}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A directed edge in the travel network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub origin: Arc<Location>,
    pub destination: Arc<Location>,
    /// Duration in seconds. Ferry durations are known only from schedule
    /// data and vary per sailing; the connection carries a placeholder.
    pub duration: i64,
    /// Distance in kilometers.
    pub distance: f64,
    /// Fuel usage in litres, assuming roughly 10 litres per 100 km.
    pub fuel: f64,
    #[serde(flatten)]
    pub kind: ConnectionKind,
}

/// Variant data for each connection flavor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ConnectionKind {
    Car,
    Ferry {
        /// Whether reservations can be booked on this route.
        bookable: bool,
    },
    Air,
    Bus,
}

/// Payload-free travel mode, for matching on the flavor alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelMode {
    Car,
    Ferry,
    Air,
    Bus,
}

impl Connection {
    pub fn mode(&self) -> TravelMode {
        match self.kind {
            ConnectionKind::Car => TravelMode::Car,
            ConnectionKind::Ferry { .. } => TravelMode::Ferry,
            ConnectionKind::Air => TravelMode::Air,
            ConnectionKind::Bus => TravelMode::Bus,
        }
    }

    pub fn is_ferry(&self) -> bool {
        self.mode() == TravelMode::Ferry
    }

    pub fn is_car(&self) -> bool {
        self.mode() == TravelMode::Car
    }

    /// Whether this connection can be booked ahead. Always false for
    /// non-ferry connections.
    pub fn bookable(&self) -> bool {
        matches!(self.kind, ConnectionKind::Ferry { bookable: true })
    }
}
