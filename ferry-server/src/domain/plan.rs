//! Route plan types.
//!
//! A `RoutePlan` is a fully time-resolved itinerary for one route: an
//! ordered list of segments, each carrying the connection travelled and the
//! wait/travel/free intervals spent on it. Plans are built per request and
//! have no persisted identity; the content hash deduplicates plans that
//! resolve to the same timing, it is not security-relevant.

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use xxhash_rust::xxh64::Xxh64;

use super::{Connection, DomainError};

/// Characters left bare in map deep-link parameters.
const MAP_PARAM_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

/// What a span of time within a segment is spent on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeIntervalKind {
    /// Extra time between segments.
    Free,
    /// Wait at a terminal for a check-in deadline.
    Wait,
    /// Travel by car/ferry/air/bus.
    Travel,
}

/// A labelled span of time within a plan segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeInterval {
    #[serde(rename = "type")]
    pub kind: TimeIntervalKind,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub description: String,
}

/// One leg of a plan: a connection plus its ordered time intervals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePlanSegment {
    pub connection: Arc<Connection>,
    pub times: Vec<TimeInterval>,
    /// Source timetable URL, for ferry legs.
    pub schedule_url: Option<String>,
}

/// A complete, time-resolved itinerary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePlan {
    pub segments: Vec<RoutePlanSegment>,
    /// Content hash over per-segment destination ids and per-interval start
    /// times; equal hashes mean an identical itinerary shape and timing.
    pub hash: String,
    /// Total duration in seconds.
    pub duration: i64,
    pub depart_time: NaiveDateTime,
    pub arrive_time: NaiveDateTime,
    /// Total driving duration in seconds.
    pub driving_duration: i64,
    /// Total driving distance in kilometers.
    pub driving_distance: f64,
    /// Google Maps URL of the route.
    pub map_url: String,
}

impl RoutePlan {
    /// Finalizes an accumulated segment list into a plan.
    ///
    /// `home_now` is the current wall-clock time in the network's home time
    /// zone; it anchors plans that consist of a single drive and therefore
    /// have no timetable to anchor them.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::EmptyPlan`] if `segments` is empty. The
    /// recursive plan builder never finalizes an empty list in normal
    /// operation.
    pub fn from_segments(
        mut segments: Vec<RoutePlanSegment>,
        home_now: NaiveDateTime,
    ) -> Result<Self, DomainError> {
        if segments.is_empty() {
            return Err(DomainError::EmptyPlan);
        }

        // A leading drive has no fixed departure; shift it so it ends
        // exactly when the next segment starts.
        if segments[0].connection.is_car() && segments.len() > 1 {
            let first_end = segments[0].times.last().map(|t| t.end);
            let next_start = segments[1].times.first().map(|t| t.start);
            if let (Some(first_end), Some(next_start)) = (first_end, next_start) {
                let shift = next_start - first_end;
                shift_times(&mut segments[0].times, shift);
            }
        }

        // A plan that is nothing but one drive starts now, in the network's
        // home time zone.
        if segments[0].connection.is_car() && segments.len() == 1 {
            let shift = home_now - segments[0].times[0].start;
            shift_times(&mut segments[0].times, shift);
        }

        // Surface any gap between adjacent segments as free time.
        for i in 0..segments.len() - 1 {
            let free_start = match segments[i].times.last() {
                Some(t) => t.end,
                None => continue,
            };
            let free_end = match segments[i + 1].times.first() {
                Some(t) => t.start,
                None => continue,
            };
            if free_end > free_start {
                segments[i].times.push(TimeInterval {
                    kind: TimeIntervalKind::Free,
                    start: free_start,
                    end: free_end,
                    description: "Free time".to_string(),
                });
            }
        }

        // Zero-duration departure marker, except when the plan opens with a
        // ferry (the wait/travel intervals already name the terminal).
        let depart_time = segments[0].times[0].start;
        if !segments[0].connection.is_ferry() {
            let origin_name = segments[0].connection.origin.name.clone();
            segments[0].times.insert(
                0,
                TimeInterval {
                    kind: TimeIntervalKind::Travel,
                    start: depart_time,
                    end: depart_time,
                    description: format!("Depart from {origin_name}"),
                },
            );
        }

        // Zero-duration arrival marker.
        let last = segments.last_mut().expect("segments checked non-empty");
        let arrive_time = last.times.last().expect("segment has intervals").end;
        let destination_name = last.connection.destination.name.clone();
        last.times.push(TimeInterval {
            kind: TimeIntervalKind::Travel,
            start: arrive_time,
            end: arrive_time,
            description: format!("Arrive at {destination_name}"),
        });

        let mut driving_duration = 0;
        let mut driving_distance = 0.0;
        let mut hasher = Xxh64::new(0);
        for segment in &segments {
            if segment.connection.is_car() {
                driving_duration += segment.connection.duration;
                driving_distance += segment.connection.distance;
            }
            hasher.update(segment.connection.destination.id.as_str().as_bytes());
            for time in &segment.times {
                hasher.update(time.start.format("%Y-%m-%dT%H:%M:%S").to_string().as_bytes());
            }
        }

        let map_url = map_url(&segments);

        Ok(Self {
            hash: format!("{:016x}", hasher.digest()),
            duration: (arrive_time - depart_time).num_seconds(),
            depart_time,
            arrive_time,
            driving_duration,
            driving_distance,
            map_url,
            segments,
        })
    }
}

fn shift_times(times: &mut [TimeInterval], shift: Duration) {
    for time in times {
        time.start += shift;
        time.end += shift;
    }
}

/// Google Maps direction link: origin, destination, and one waypoint per
/// intermediate segment origin.
fn map_url(segments: &[RoutePlanSegment]) -> String {
    let first = &segments[0];
    let last = &segments[segments.len() - 1];
    let waypoints = segments[1..]
        .iter()
        .map(|segment| segment.connection.origin.map_parameter())
        .collect::<Vec<_>>()
        .join("|");
    format!(
        "https://www.google.com/maps/dir/?api=1&origin={}&destination={}&waypoints={}",
        utf8_percent_encode(&first.connection.origin.map_parameter(), MAP_PARAM_SAFE),
        utf8_percent_encode(&last.connection.destination.map_parameter(), MAP_PARAM_SAFE),
        utf8_percent_encode(&waypoints, MAP_PARAM_SAFE),
    )
}
