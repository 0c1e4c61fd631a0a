//! Sailing and schedule types.
//!
//! A `FerrySchedule` is the timetable for one route on one calendar date,
//! scraped from the operator's website. Schedules are persisted by the
//! schedule store, so both types round-trip through JSON.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::LocationId;

/// One sailing on a route's daily timetable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FerrySailing {
    /// Departure time of day, local to the network.
    pub departure: NaiveTime,
    /// Arrival time of day; earlier than `departure` means next-day arrival.
    pub arrival: NaiveTime,
    /// Duration in seconds.
    pub duration: i64,
    /// Notes or comments posted about this sailing.
    #[serde(default)]
    pub notes: Vec<String>,
}

/// The timetable for one route on one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FerrySchedule {
    pub date: NaiveDate,
    pub origin: LocationId,
    pub destination: LocationId,
    /// Sailings in departure order.
    pub sailings: Vec<FerrySailing>,
    /// The URL the schedule was finally fetched from, after redirects.
    pub url: String,
    /// Notes or comments posted about this schedule.
    #[serde(default)]
    pub notes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_round_trips_through_json() {
        let schedule = FerrySchedule {
            date: NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
            origin: LocationId::new("TSA"),
            destination: LocationId::new("SWB"),
            sailings: vec![FerrySailing {
                departure: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
                arrival: NaiveTime::from_hms_opt(15, 30, 0).unwrap(),
                duration: 5400,
                notes: vec!["ONLY AUG 7".into()],
            }],
            url: "https://example.test/TSA-SWB".into(),
            notes: vec![],
        };

        let json = serde_json::to_string(&schedule).unwrap();
        let parsed: FerrySchedule = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, schedule);
    }

    #[test]
    fn missing_notes_default_to_empty() {
        let json = r#"{
            "departure": "06:15:00",
            "arrival": "07:45:00",
            "duration": 5400
        }"#;
        let sailing: FerrySailing = serde_json::from_str(json).unwrap();
        assert!(sailing.notes.is_empty());
    }
}
