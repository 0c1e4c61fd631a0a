//! Graph indexes.
//!
//! In-memory lookup of locations by id and connections by endpoint(s),
//! built once from static data and shared read-only across all requests.
//! The indexes are passed explicitly into the route and plan builders so
//! tests can construct isolated graphs.

pub mod data;

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{Connection, ConnectionId, Location, LocationId};

/// Lookup failures against the loaded graph. These indicate a data or
/// configuration defect, not a missing search result.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GraphError {
    #[error("location not found with id {0}")]
    LocationNotFound(LocationId),

    #[error("connection not found with id {0}")]
    ConnectionNotFound(ConnectionId),
}

/// Id → location index.
#[derive(Debug, Default)]
pub struct LocationIndex {
    locations: HashMap<LocationId, Arc<Location>>,
}

impl LocationIndex {
    pub fn new(locations: impl IntoIterator<Item = Arc<Location>>) -> Self {
        Self {
            locations: locations
                .into_iter()
                .map(|location| (location.id.clone(), location))
                .collect(),
        }
    }

    pub fn by_id(&self, id: &LocationId) -> Result<&Arc<Location>, GraphError> {
        self.locations
            .get(id)
            .ok_or_else(|| GraphError::LocationNotFound(id.clone()))
    }

    pub fn all(&self) -> impl Iterator<Item = &Arc<Location>> {
        self.locations.values()
    }

    /// Snapshot of the id → location map, for serving to API consumers.
    pub fn snapshot(&self) -> HashMap<LocationId, Arc<Location>> {
        self.locations.clone()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// Id → connection index plus an outgoing-adjacency index.
#[derive(Debug, Default)]
pub struct ConnectionIndex {
    connections: HashMap<ConnectionId, Arc<Connection>>,
    outgoing: HashMap<LocationId, Vec<Arc<Connection>>>,
}

impl ConnectionIndex {
    /// Builds both indexes. Outgoing edges keep registration order, so a
    /// fixed input yields a fixed traversal order.
    pub fn new(connections: impl IntoIterator<Item = Arc<Connection>>) -> Self {
        let mut by_id = HashMap::new();
        let mut outgoing: HashMap<LocationId, Vec<Arc<Connection>>> = HashMap::new();
        for connection in connections {
            outgoing
                .entry(connection.origin.id.clone())
                .or_default()
                .push(connection.clone());
            by_id.insert(connection.id.clone(), connection);
        }
        Self {
            connections: by_id,
            outgoing,
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &Arc<Connection>> {
        self.connections.values()
    }

    pub fn by_id(&self, id: &ConnectionId) -> Result<&Arc<Connection>, GraphError> {
        self.connections
            .get(id)
            .ok_or_else(|| GraphError::ConnectionNotFound(id.clone()))
    }

    /// All connections departing a location, in registration order.
    pub fn from_location(&self, origin: &LocationId) -> &[Arc<Connection>] {
        self.outgoing.get(origin).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The unique connection between two locations.
    pub fn from_to(
        &self,
        origin: &LocationId,
        destination: &LocationId,
    ) -> Result<&Arc<Connection>, GraphError> {
        self.by_id(&ConnectionId::for_pair(origin, destination))
    }

    /// Distinct ferry (origin, destination) id pairs, for the schedule
    /// store's refresh cycle.
    pub fn ferry_routes(&self) -> Vec<(LocationId, LocationId)> {
        let mut routes: Vec<(LocationId, LocationId)> = self
            .connections
            .values()
            .filter(|connection| connection.is_ferry())
            .map(|connection| {
                (
                    connection.origin.id.clone(),
                    connection.destination.id.clone(),
                )
            })
            .collect();
        routes.sort();
        routes.dedup();
        routes
    }
}
