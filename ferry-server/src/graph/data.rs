//! Static data records and graph construction.
//!
//! The network ships as JSON files, one per location/connection flavor, each
//! holding a map keyed by id. Records are read in sorted key order so index
//! construction is deterministic, then converted into shared domain values.
//! Connection records carry one direction per link; registration mirrors
//! each record into both directions as distinct objects.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::domain::{
    City, Connection, ConnectionId, ConnectionKind, Location, LocationId, LocationKind, Terminal,
};

use super::{GraphError, LocationIndex};

/// Errors raised while loading static network data.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("data file must contain a map keyed by id: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Reads a data file's id-keyed map, yielding records in sorted key order.
pub fn records_from_json<T: DeserializeOwned>(json: &str) -> Result<Vec<T>, DataError> {
    let map: BTreeMap<String, T> = serde_json::from_str(json)?;
    Ok(map.into_values().collect())
}

#[derive(Debug, Clone, Deserialize)]
pub struct CityRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub land_group: Option<String>,
    pub region: String,
    pub province: String,
    pub country: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TerminalRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub land_group: Option<String>,
    pub long_id: String,
    #[serde(default)]
    pub info_url: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub coordinates: String,
    #[serde(default)]
    pub veh_close: Option<u32>,
    #[serde(default)]
    pub foot_close: Option<u32>,
    #[serde(default)]
    pub res_open: Option<u32>,
    #[serde(default)]
    pub res_close: Option<u32>,
    #[serde(default)]
    pub res_peak_extra: Option<u32>,
    #[serde(default)]
    pub assured_open: Option<u32>,
    #[serde(default)]
    pub assured_close: Option<u32>,
    #[serde(default)]
    pub hostled_open: Option<u32>,
    #[serde(default)]
    pub hostled_close: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirportRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub land_group: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BusStopRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub land_group: Option<String>,
}

/// Record shape shared by car, air, and bus connection files.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionRecord {
    pub origin_id: String,
    pub destination_id: String,
    /// Duration in seconds.
    pub duration: i64,
    /// Distance in kilometers.
    pub distance: f64,
    /// Fuel usage in litres.
    pub fuel: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FerryConnectionRecord {
    pub origin_id: String,
    pub destination_id: String,
    #[serde(default)]
    pub bookable: bool,
    /// Sailing durations come from schedule data; absent here means unknown.
    #[serde(default)]
    pub duration: Option<i64>,
    /// Boarding and unboarding only, not the sailing itself.
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub fuel: Option<f64>,
}

/// Terminal display names always mention "Terminal" so they are not
/// mistaken for the city they serve.
fn terminal_display_name(name: &str) -> String {
    if name.to_lowercase().contains("terminal") {
        return name.to_string();
    }
    if let Some(stripped) = name.strip_suffix(')') {
        return format!("{stripped} Terminal)");
    }
    format!("{name} (Terminal)")
}

pub fn build_locations(
    cities: Vec<CityRecord>,
    terminals: Vec<TerminalRecord>,
    airports: Vec<AirportRecord>,
    bus_stops: Vec<BusStopRecord>,
) -> Vec<Arc<Location>> {
    let mut locations = Vec::new();
    locations.extend(cities.into_iter().map(|record| {
        Arc::new(Location {
            id: LocationId::new(record.id),
            name: record.name,
            land_group: record.land_group,
            kind: LocationKind::City(City {
                region: record.region,
                province: record.province,
                country: record.country,
            }),
        })
    }));
    locations.extend(terminals.into_iter().map(|record| {
        Arc::new(Location {
            id: LocationId::new(record.id),
            name: terminal_display_name(&record.name),
            land_group: record.land_group,
            kind: LocationKind::Terminal(Terminal {
                long_id: record.long_id,
                info_url: record.info_url,
                address: record.address,
                coordinates: record.coordinates,
                veh_close: record.veh_close,
                foot_close: record.foot_close,
                res_open: record.res_open,
                res_close: record.res_close,
                res_peak_extra: record.res_peak_extra,
                assured_open: record.assured_open,
                assured_close: record.assured_close,
                hostled_open: record.hostled_open,
                hostled_close: record.hostled_close,
            }),
        })
    }));
    locations.extend(airports.into_iter().map(|record| {
        Arc::new(Location {
            id: LocationId::new(record.id),
            name: record.name,
            land_group: record.land_group,
            kind: LocationKind::Airport,
        })
    }));
    locations.extend(bus_stops.into_iter().map(|record| {
        Arc::new(Location {
            id: LocationId::new(record.id),
            name: record.name,
            land_group: record.land_group,
            kind: LocationKind::BusStop,
        })
    }));
    locations
}

/// Builds the directed connection set from one-per-link records, mirroring
/// each record into both directions.
pub fn build_connections(
    locations: &LocationIndex,
    cars: Vec<ConnectionRecord>,
    ferries: Vec<FerryConnectionRecord>,
    airs: Vec<ConnectionRecord>,
    buses: Vec<ConnectionRecord>,
) -> Result<Vec<Arc<Connection>>, GraphError> {
    let mut connections = Vec::new();

    let push_pair = |connections: &mut Vec<Arc<Connection>>,
                     origin_id: &str,
                     destination_id: &str,
                     duration: i64,
                     distance: f64,
                     fuel: f64,
                     kind: ConnectionKind|
     -> Result<(), GraphError> {
        let origin = locations.by_id(&LocationId::new(origin_id))?.clone();
        let destination = locations.by_id(&LocationId::new(destination_id))?.clone();
        for (from, to) in [(&origin, &destination), (&destination, &origin)] {
            connections.push(Arc::new(Connection {
                id: ConnectionId::for_pair(&from.id, &to.id),
                origin: from.clone(),
                destination: to.clone(),
                duration,
                distance,
                fuel,
                kind: kind.clone(),
            }));
        }
        Ok(())
    };

    for record in cars {
        push_pair(
            &mut connections,
            &record.origin_id,
            &record.destination_id,
            record.duration,
            record.distance,
            record.fuel,
            ConnectionKind::Car,
        )?;
    }
    for record in ferries {
        push_pair(
            &mut connections,
            &record.origin_id,
            &record.destination_id,
            record.duration.unwrap_or(-1),
            record.distance.unwrap_or(0.2),
            record.fuel.unwrap_or(0.2),
            ConnectionKind::Ferry {
                bookable: record.bookable,
            },
        )?;
    }
    for record in airs {
        push_pair(
            &mut connections,
            &record.origin_id,
            &record.destination_id,
            record.duration,
            record.distance,
            record.fuel,
            ConnectionKind::Air,
        )?;
    }
    for record in buses {
        push_pair(
            &mut connections,
            &record.origin_id,
            &record.destination_id,
            record.duration,
            record.distance,
            record.fuel,
            ConnectionKind::Bus,
        )?;
    }

    Ok(connections)
}
