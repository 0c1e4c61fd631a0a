//! Location types.
//!
//! A `Location` is a node in the travel network. The variant set is closed
//! (terminals, cities, airports, bus stops), so variant data lives in a
//! tagged `LocationKind` with the shared fields hoisted onto `Location`
//! itself.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a location, e.g. a terminal route code like `TSA`.
///
/// # Examples
///
/// ```
/// use ferry_server::domain::LocationId;
///
/// let id = LocationId::new("TSA");
/// assert_eq!(id.as_str(), "TSA");
/// assert_eq!(id.to_string(), "TSA");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(String);

impl LocationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A node in the travel network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    /// Tag shared by locations on one landmass; used to forbid ferry-hopping
    /// back onto the same landmass twice in a route.
    pub land_group: Option<String>,
    #[serde(flatten)]
    pub kind: LocationKind,
}

/// Variant data for each location flavor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum LocationKind {
    Terminal(Terminal),
    City(City),
    Airport,
    BusStop,
}

/// A ferry terminal, with the operator's per-category check-in windows.
///
/// All windows are minutes before departure; `None` or zero means the
/// category does not apply at this terminal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Terminal {
    pub long_id: String,
    pub info_url: String,
    pub address: String,
    /// String format `"{latitude},{longitude}"`.
    pub coordinates: String,
    /// Vehicles check-in close time in minutes.
    pub veh_close: Option<u32>,
    /// Foot passengers check-in close time in minutes.
    pub foot_close: Option<u32>,
    /// Booking check-in open time in minutes.
    pub res_open: Option<u32>,
    /// Booking check-in close time in minutes.
    pub res_close: Option<u32>,
    /// Booking check-in extra time required at peak season.
    pub res_peak_extra: Option<u32>,
    /// Assured loading check-in open time in minutes.
    pub assured_open: Option<u32>,
    /// Assured loading check-in close time in minutes.
    pub assured_close: Option<u32>,
    /// Hostled vehicles check-in open time in minutes.
    pub hostled_open: Option<u32>,
    /// Hostled vehicles check-in close time in minutes.
    pub hostled_close: Option<u32>,
}

/// A city, addressable on a map by name rather than coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct City {
    pub region: String,
    pub province: String,
    pub country: String,
}

impl Location {
    /// The value identifying this location in a map deep-link.
    pub fn map_parameter(&self) -> String {
        match &self.kind {
            LocationKind::Terminal(terminal) => terminal.coordinates.clone(),
            LocationKind::City(city) => {
                format!("{},{},{}", self.name, city.province, city.country)
            }
            LocationKind::Airport | LocationKind::BusStop => self.name.clone(),
        }
    }

    pub fn as_terminal(&self) -> Option<&Terminal> {
        match &self.kind {
            LocationKind::Terminal(terminal) => Some(terminal),
            _ => None,
        }
    }

    pub fn is_city(&self) -> bool {
        matches!(self.kind, LocationKind::City(_))
    }
}
