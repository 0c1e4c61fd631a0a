//! Route plan construction.
//!
//! Expands each discovered route into concrete, time-stamped plans by
//! backtracking over the sailing and driving choices for every leg. Ferry
//! legs consult the schedule source, so the recursion is async; schedules
//! for a whole route batch are pre-fetched concurrently first, one
//! outstanding fetch per distinct (origin, destination) key.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use futures::future::{BoxFuture, join_all};

use crate::domain::{
    Connection, FerrySchedule, LocationId, RoutePlan, RoutePlanSegment, Terminal, TimeInterval,
    TimeIntervalKind, TravelMode,
};
use crate::graph::{ConnectionIndex, GraphError};

use super::{Route, RoutePlansOptions};

/// Drives longer than this are skipped unless `show_all`.
const DRIVING_DURATION_LIMIT_SECS: i64 = 6 * 60 * 60;

/// Async schedule lookup, satisfied by the schedule store in production and
/// by canned maps in tests. Absence is a normal value: no schedule means the
/// ferry leg is skipped, not an error.
pub trait ScheduleSource: Send + Sync {
    fn schedule(
        &self,
        origin: &LocationId,
        destination: &LocationId,
        date: NaiveDate,
    ) -> impl Future<Output = Option<Arc<FerrySchedule>>> + Send;
}

/// Plan builder configuration.
#[derive(Debug, Clone)]
pub struct PlanConfig {
    /// The network's home time zone; anchors plans with no timetable leg.
    pub home_zone: Tz,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            home_zone: chrono_tz::America::Vancouver,
        }
    }
}

/// Builds time-resolved plans for a batch of routes.
pub struct RoutePlanBuilder<'a, S: ScheduleSource> {
    connections: &'a ConnectionIndex,
    schedules: &'a S,
    config: PlanConfig,
}

impl<'a, S: ScheduleSource> RoutePlanBuilder<'a, S> {
    pub fn new(connections: &'a ConnectionIndex, schedules: &'a S, config: PlanConfig) -> Self {
        Self {
            connections,
            schedules,
            config,
        }
    }

    /// Expands every route against the travel date's schedules.
    ///
    /// Plans are returned in discovery order; callers sort by duration.
    /// No feasible plan for a route is a normal outcome, not an error;
    /// a missing connection between adjacent route points is a data defect
    /// and propagates.
    pub async fn make_route_plans(
        &self,
        routes: &[Route],
        options: &RoutePlansOptions,
    ) -> Result<Vec<RoutePlan>, GraphError> {
        self.pre_fetch_schedules(routes, options).await?;
        let home_now = Utc::now()
            .with_timezone(&self.config.home_zone)
            .naive_local();
        let start_time = options.date.and_time(NaiveTime::MIN);
        let mut plans = Vec::new();
        for route in routes {
            let mut segments = Vec::new();
            self.add_plan_segment(
                route,
                1,
                start_time,
                &mut segments,
                &mut plans,
                options,
                home_now,
            )
            .await?;
        }
        Ok(plans)
    }

    /// Backtracking re-probes the same schedule across sibling branches, so
    /// every distinct ferry key in the batch is fetched once up front.
    /// Concurrency is bounded by the schedule client's permit pool; dropping
    /// the request future cancels outstanding fetches.
    async fn pre_fetch_schedules(
        &self,
        routes: &[Route],
        options: &RoutePlansOptions,
    ) -> Result<(), GraphError> {
        let mut keys: HashSet<(LocationId, LocationId)> = HashSet::new();
        for route in routes {
            for pair in route.windows(2) {
                let connection = self.connections.from_to(&pair[0].id, &pair[1].id)?;
                if connection.is_ferry() {
                    keys.insert((
                        connection.origin.id.clone(),
                        connection.destination.id.clone(),
                    ));
                }
            }
        }
        let fetches = keys
            .iter()
            .map(|(origin, destination)| self.schedules.schedule(origin, destination, options.date));
        join_all(fetches).await;
        Ok(())
    }

    /// Extends the accumulated segments with the leg ending at
    /// `route[destination_index]`, recursing to the end of the route.
    ///
    /// Returns whether any continuation produced a plan. `segments` is
    /// restored to the shared prefix on every exit path.
    #[allow(clippy::too_many_arguments)]
    fn add_plan_segment<'b>(
        &'b self,
        route: &'b Route,
        destination_index: usize,
        start_time: NaiveDateTime,
        segments: &'b mut Vec<RoutePlanSegment>,
        plans: &'b mut Vec<RoutePlan>,
        options: &'b RoutePlansOptions,
        home_now: NaiveDateTime,
    ) -> BoxFuture<'b, Result<bool, GraphError>> {
        Box::pin(async move {
            if destination_index == route.len() {
                if segments.is_empty() {
                    return Ok(false);
                }
                let plan = RoutePlan::from_segments(segments.clone(), home_now)
                    .expect("segments checked non-empty");
                plans.push(plan);
                return Ok(true);
            }

            let origin = &route[destination_index - 1];
            let destination = &route[destination_index];
            let connection = self
                .connections
                .from_to(&origin.id, &destination.id)?
                .clone();

            let result = if connection.is_ferry() {
                self.add_ferry_connection(
                    route,
                    destination_index,
                    start_time,
                    segments,
                    plans,
                    options,
                    home_now,
                    &connection,
                )
                .await?
            } else {
                self.add_fixed_connection(
                    route,
                    destination_index,
                    start_time,
                    segments,
                    plans,
                    options,
                    home_now,
                    &connection,
                )
                .await?
            };

            segments.truncate(destination_index - 1);
            Ok(result)
        })
    }

    /// Car, air, and bus legs have a single deterministic continuation:
    /// arrival is start plus the connection duration.
    #[allow(clippy::too_many_arguments)]
    async fn add_fixed_connection(
        &self,
        route: &Route,
        destination_index: usize,
        start_time: NaiveDateTime,
        segments: &mut Vec<RoutePlanSegment>,
        plans: &mut Vec<RoutePlan>,
        options: &RoutePlansOptions,
        home_now: NaiveDateTime,
        connection: &Arc<Connection>,
    ) -> Result<bool, GraphError> {
        if connection.is_car()
            && !options.show_all
            && connection.duration > DRIVING_DURATION_LIMIT_SECS
        {
            return Ok(false);
        }
        let arrive_time = start_time + Duration::seconds(connection.duration);
        if !options.show_all && arrive_time.date() != start_time.date() {
            return Ok(false);
        }

        segments.push(RoutePlanSegment {
            connection: connection.clone(),
            times: vec![TimeInterval {
                kind: TimeIntervalKind::Travel,
                start: start_time,
                end: arrive_time,
                description: leg_description(connection),
            }],
            schedule_url: None,
        });

        self.add_plan_segment(
            route,
            destination_index + 1,
            arrive_time,
            segments,
            plans,
            options,
            home_now,
        )
        .await
    }

    /// Ferry legs branch once per sailing still catchable from the current
    /// start time, given the terminal's highest-priority check-in deadline.
    #[allow(clippy::too_many_arguments)]
    async fn add_ferry_connection(
        &self,
        route: &Route,
        destination_index: usize,
        start_time: NaiveDateTime,
        segments: &mut Vec<RoutePlanSegment>,
        plans: &mut Vec<RoutePlan>,
        options: &RoutePlansOptions,
        home_now: NaiveDateTime,
        connection: &Arc<Connection>,
    ) -> Result<bool, GraphError> {
        let mut result = false;
        let start_day = segments
            .first()
            .and_then(|segment| segment.times.first())
            .map(|time| time.start.date())
            .unwrap_or_else(|| start_time.date());
        let day = start_time.date();
        let Some(schedule) = self
            .schedules
            .schedule(&connection.origin.id, &connection.destination.id, day)
            .await
        else {
            return Ok(false);
        };

        for sailing in &schedule.sailings {
            let depart_time = day.and_time(sailing.departure);
            let mut arrive_time = day.and_time(sailing.arrival);
            if arrive_time < depart_time {
                // Overnight sailing.
                arrive_time += Duration::days(1);
            }
            if (!options.show_all && arrive_time - start_time > Duration::days(1))
                || day != start_day
            {
                // The plan would stretch past the one-day horizon.
                break;
            }
            if depart_time < start_time {
                continue;
            }

            let (deadline_name, wait_minutes) =
                checkin_deadline(connection.origin.as_terminal(), connection, options);
            let deadline_time = depart_time
                - Duration::minutes(i64::from(wait_minutes) + i64::from(options.buffer));
            if deadline_time < start_time {
                continue;
            }

            let mut times = Vec::new();
            if deadline_time < depart_time {
                let mut description = format!("Arrive at {} ", connection.origin.name);
                if options.buffer > 0 {
                    description.push_str(&format!("{} minutes ", options.buffer));
                }
                description.push_str(&format!("before {deadline_name}"));
                times.push(TimeInterval {
                    kind: TimeIntervalKind::Wait,
                    start: deadline_time,
                    end: depart_time,
                    description,
                });
            }
            times.push(TimeInterval {
                kind: TimeIntervalKind::Travel,
                start: depart_time,
                end: arrive_time,
                description: leg_description(connection),
            });

            segments.push(RoutePlanSegment {
                connection: connection.clone(),
                times,
                schedule_url: Some(schedule.url.clone()),
            });

            let continued = self
                .add_plan_segment(
                    route,
                    destination_index + 1,
                    arrive_time,
                    segments,
                    plans,
                    options,
                    home_now,
                )
                .await?;
            if !continued {
                // Later sailings only start later; the remainder of the
                // route fails for them too. The caller restores the prefix.
                break;
            }
            segments.truncate(destination_index - 1);
            result = true;
            if !options.show_all
                && segments
                    .iter()
                    .any(|segment| segment.connection.is_ferry())
            {
                // An earlier ferry leg is already committed; keep only the
                // first workable sailing for this one.
                break;
            }
        }
        Ok(result)
    }
}

fn leg_description(connection: &Connection) -> String {
    match connection.mode() {
        TravelMode::Car => format!(
            "Drive {} km to {}",
            connection.distance.round() as i64,
            connection.destination.name
        ),
        TravelMode::Ferry => format!(
            "Ferry sailing from {} to {}",
            connection.origin.name, connection.destination.name
        ),
        TravelMode::Air => format!("Fly to {}", connection.destination.name),
        TravelMode::Bus => format!("Bus to {}", connection.destination.name),
    }
}

/// The highest-priority applicable check-in window at a departure terminal.
///
/// Priority: hostled (if requested) > assured loading (if requested) >
/// reservation (only on bookable connections) > vehicles > foot passengers.
/// Windows that are absent or zero never apply.
fn checkin_deadline(
    terminal: Option<&Terminal>,
    connection: &Connection,
    options: &RoutePlansOptions,
) -> (&'static str, u32) {
    let Some(terminal) = terminal else {
        return ("departure", 0);
    };
    let window = |minutes: Option<u32>| minutes.unwrap_or(0);
    if options.hostled && window(terminal.hostled_close) > 0 {
        ("hostled vehicles checkin close", window(terminal.hostled_close))
    } else if options.assured && window(terminal.assured_close) > 0 {
        (
            "assured loading checkin close",
            window(terminal.assured_close),
        )
    } else if connection.bookable() && window(terminal.res_close) > 0 {
        ("booking checkin close", window(terminal.res_close))
    } else if window(terminal.veh_close) > 0 {
        ("vehicles checkin close", window(terminal.veh_close))
    } else if window(terminal.foot_close) > 0 {
        ("foot passengers checkin close", window(terminal.foot_close))
    } else {
        ("departure", 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConnectionId, ConnectionKind, Location, LocationKind};

    fn terminal_with_windows() -> Terminal {
        Terminal {
            long_id: "test".into(),
            info_url: String::new(),
            address: String::new(),
            coordinates: String::new(),
            veh_close: Some(40),
            foot_close: Some(50),
            res_open: None,
            res_close: Some(30),
            res_peak_extra: None,
            assured_open: None,
            assured_close: Some(20),
            hostled_open: None,
            hostled_close: Some(10),
        }
    }

    fn ferry_connection(bookable: bool) -> Connection {
        let origin = Arc::new(Location {
            id: LocationId::new("a"),
            name: "A (Terminal)".into(),
            land_group: None,
            kind: LocationKind::Terminal(terminal_with_windows()),
        });
        let destination = Arc::new(Location {
            id: LocationId::new("b"),
            name: "B (Terminal)".into(),
            land_group: None,
            kind: LocationKind::BusStop,
        });
        Connection {
            id: ConnectionId::for_pair(&origin.id, &destination.id),
            origin,
            destination,
            duration: -1,
            distance: 0.2,
            fuel: 0.2,
            kind: ConnectionKind::Ferry { bookable },
        }
    }

    fn options() -> RoutePlansOptions {
        RoutePlansOptions::new(chrono::NaiveDate::from_ymd_opt(2026, 8, 7).unwrap())
    }

    #[test]
    fn hostled_window_wins_when_requested() {
        let connection = ferry_connection(true);
        let terminal = terminal_with_windows();
        let mut opts = options();
        opts.hostled = true;

        let (name, minutes) = checkin_deadline(Some(&terminal), &connection, &opts);
        assert_eq!(minutes, 10);
        assert_eq!(name, "hostled vehicles checkin close");
    }

    #[test]
    fn assured_window_beats_reservation_and_vehicle() {
        let connection = ferry_connection(true);
        let terminal = terminal_with_windows();
        let mut opts = options();
        opts.assured = true;

        let (name, minutes) = checkin_deadline(Some(&terminal), &connection, &opts);
        assert_eq!(minutes, 20);
        assert_eq!(name, "assured loading checkin close");
    }

    #[test]
    fn reservation_window_requires_bookable_connection() {
        let terminal = terminal_with_windows();
        let opts = options();

        let (name, minutes) = checkin_deadline(Some(&terminal), &ferry_connection(true), &opts);
        assert_eq!((name, minutes), ("booking checkin close", 30));

        let (name, minutes) = checkin_deadline(Some(&terminal), &ferry_connection(false), &opts);
        assert_eq!((name, minutes), ("vehicles checkin close", 40));
    }

    #[test]
    fn foot_window_is_last_resort_before_departure() {
        let connection = ferry_connection(false);
        let mut terminal = terminal_with_windows();
        terminal.veh_close = None;
        let opts = options();

        let (name, minutes) = checkin_deadline(Some(&terminal), &connection, &opts);
        assert_eq!((name, minutes), ("foot passengers checkin close", 50));

        terminal.foot_close = Some(0);
        let (name, minutes) = checkin_deadline(Some(&terminal), &connection, &opts);
        assert_eq!((name, minutes), ("departure", 0));
    }

    #[test]
    fn requested_window_absent_at_terminal_falls_through() {
        let connection = ferry_connection(false);
        let mut terminal = terminal_with_windows();
        terminal.hostled_close = None;
        let mut opts = options();
        opts.hostled = true;

        let (_, minutes) = checkin_deadline(Some(&terminal), &connection, &opts);
        assert_eq!(minutes, 40);
    }

    #[test]
    fn no_terminal_means_no_deadline() {
        let connection = ferry_connection(false);
        let (name, minutes) = checkin_deadline(None, &connection, &options());
        assert_eq!((name, minutes), ("departure", 0));
    }

    #[test]
    fn leg_descriptions() {
        let connection = ferry_connection(false);
        assert_eq!(
            leg_description(&connection),
            "Ferry sailing from A (Terminal) to B (Terminal)"
        );
    }
}
