//! Route discovery.
//!
//! Depth-first enumeration of simple, policy-valid paths between two
//! locations. The search is synchronous and deterministic for a fixed
//! graph; backtracking state is threaded through the call stack as `&mut`
//! locals, pushed on recursion and restored on every return path.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::{ConnectionId, Location, TravelMode};
use crate::graph::ConnectionIndex;

/// An ordered sequence of locations, every adjacent pair backed by exactly
/// one connection.
pub type Route = Vec<Arc<Location>>;

/// Enumerates structurally valid routes over the connection graph.
pub struct RouteBuilder<'a> {
    connections: &'a ConnectionIndex,
}

impl<'a> RouteBuilder<'a> {
    pub fn new(connections: &'a ConnectionIndex) -> Self {
        Self { connections }
    }

    /// All simple policy-valid routes from `origin` to `destination`.
    ///
    /// No route found is an empty vector, not an error.
    pub fn find_routes(&self, origin: &Arc<Location>, destination: &Arc<Location>) -> Vec<Route> {
        let mut routes = Vec::new();
        let mut current_route = Vec::new();
        let mut dead_ends = HashSet::new();
        let mut lands = Vec::new();
        self.find_routes_recurse(
            origin,
            destination,
            &mut current_route,
            &mut dead_ends,
            &mut lands,
            false,
            &mut routes,
        );
        routes
    }

    /// Returns whether any completed route passed through `next_point`.
    ///
    /// `lands` holds one entry per edge on the current path: the origin's
    /// land group for ferry edges, an empty marker otherwise.
    #[allow(clippy::too_many_arguments)]
    fn find_routes_recurse(
        &self,
        next_point: &Arc<Location>,
        end_point: &Arc<Location>,
        current_route: &mut Vec<Arc<Location>>,
        dead_ends: &mut HashSet<ConnectionId>,
        lands: &mut Vec<String>,
        last_leg_was_car: bool,
        routes: &mut Vec<Route>,
    ) -> bool {
        current_route.push(next_point.clone());

        if next_point.id == end_point.id {
            routes.push(current_route.clone());
            current_route.pop();
            return true;
        }

        // Cities need not be exhaustively graph-walked: any direct edge into
        // the destination city completes the route.
        if end_point.is_city() && self.connections.from_to(&next_point.id, &end_point.id).is_ok() {
            current_route.push(end_point.clone());
            routes.push(current_route.clone());
            current_route.pop();
            current_route.pop();
            return true;
        }

        let mut result = false;
        for connection in self.connections.from_location(&next_point.id) {
            let destination = &connection.destination;
            if current_route.iter().any(|point| point.id == destination.id)
                || dead_ends.contains(&connection.id)
            {
                continue;
            }
            // Drive only the shortest way between terminals, never chained
            // drives.
            if connection.mode() == TravelMode::Car && last_leg_was_car {
                continue;
            }
            if connection.mode() == TravelMode::Ferry
                && let Some(group) = &destination.land_group
                && lands.iter().any(|reached| reached == group)
            {
                continue;
            }

            if connection.mode() == TravelMode::Ferry
                && let Some(group) = &connection.origin.land_group
            {
                lands.push(group.clone());
            } else {
                lands.push(String::new());
            }

            let subtree_completed = self.find_routes_recurse(
                destination,
                end_point,
                current_route,
                dead_ends,
                lands,
                connection.mode() == TravelMode::Car,
                routes,
            );
            if subtree_completed {
                result = true;
            } else {
                dead_ends.insert(connection.id.clone());
            }
            lands.pop();
        }

        current_route.pop();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{City, Connection, ConnectionKind, LocationId, LocationKind, TravelMode};

    fn terminal(id: &str, land_group: Option<&str>) -> Arc<Location> {
        Arc::new(Location {
            id: LocationId::new(id),
            name: format!("{id} (Terminal)"),
            land_group: land_group.map(str::to_string),
            kind: LocationKind::Terminal(crate::domain::Terminal {
                long_id: id.to_lowercase(),
                info_url: String::new(),
                address: String::new(),
                coordinates: String::new(),
                veh_close: None,
                foot_close: None,
                res_open: None,
                res_close: None,
                res_peak_extra: None,
                assured_open: None,
                assured_close: None,
                hostled_open: None,
                hostled_close: None,
            }),
        })
    }

    fn city(id: &str, land_group: Option<&str>) -> Arc<Location> {
        Arc::new(Location {
            id: LocationId::new(id),
            name: id.to_string(),
            land_group: land_group.map(str::to_string),
            kind: LocationKind::City(City {
                region: String::new(),
                province: "BC".into(),
                country: "Canada".into(),
            }),
        })
    }

    fn link(
        from: &Arc<Location>,
        to: &Arc<Location>,
        kind: ConnectionKind,
    ) -> Vec<Arc<Connection>> {
        [(from, to), (to, from)]
            .into_iter()
            .map(|(origin, destination)| {
                Arc::new(Connection {
                    id: ConnectionId::for_pair(&origin.id, &destination.id),
                    origin: origin.clone(),
                    destination: destination.clone(),
                    duration: 3600,
                    distance: 30.0,
                    fuel: 3.0,
                    kind: kind.clone(),
                })
            })
            .collect()
    }

    fn ferry() -> ConnectionKind {
        ConnectionKind::Ferry { bookable: false }
    }

    /// Mainland city - mainland terminal - island terminal - island city,
    /// with a second island pair reachable from the island.
    fn island_network() -> (ConnectionIndex, Vec<Arc<Location>>) {
        let van = city("vancouver", Some("mainland"));
        let tsa = terminal("TSA", Some("mainland"));
        let swb = terminal("SWB", Some("island"));
        let vic = city("victoria", Some("island"));
        let ful = terminal("FUL", Some("saltspring"));
        let ves = terminal("VES", Some("saltspring"));

        let mut connections = Vec::new();
        connections.extend(link(&van, &tsa, ConnectionKind::Car));
        connections.extend(link(&tsa, &swb, ferry()));
        connections.extend(link(&swb, &vic, ConnectionKind::Car));
        connections.extend(link(&swb, &ful, ferry()));
        connections.extend(link(&ful, &ves, ConnectionKind::Car));
        connections.extend(link(&ves, &vic, ferry()));

        let locations = vec![van.clone(), tsa, swb, vic, ful, ves];
        (ConnectionIndex::new(connections), locations)
    }

    fn ids(route: &Route) -> Vec<&str> {
        route.iter().map(|point| point.id.as_str()).collect()
    }

    #[test]
    fn single_ferry_hop() {
        let a = terminal("AAA", None);
        let b = terminal("BBB", None);
        let index = ConnectionIndex::new(link(&a, &b, ferry()));
        let builder = RouteBuilder::new(&index);

        let routes = builder.find_routes(&a, &b);
        assert_eq!(routes.len(), 1);
        assert_eq!(ids(&routes[0]), vec!["AAA", "BBB"]);
    }

    #[test]
    fn no_route_is_empty_not_error() {
        let a = terminal("AAA", None);
        let b = terminal("BBB", None);
        let c = terminal("CCC", None);
        let index = ConnectionIndex::new(link(&a, &b, ferry()));
        let builder = RouteBuilder::new(&index);

        assert!(builder.find_routes(&a, &c).is_empty());
    }

    #[test]
    fn city_destination_short_circuits_on_direct_edge() {
        let (index, locations) = island_network();
        let builder = RouteBuilder::new(&index);
        let van = &locations[0];
        let vic = &locations[3];

        let routes = builder.find_routes(van, vic);
        assert!(!routes.is_empty());
        // The straightforward itinerary ends with the direct drive into the
        // destination city.
        assert!(
            routes
                .iter()
                .any(|route| ids(route) == vec!["vancouver", "TSA", "SWB", "victoria"])
        );
    }

    #[test]
    fn structural_invariants_hold_for_all_routes() {
        let (index, locations) = island_network();
        let builder = RouteBuilder::new(&index);
        let van = &locations[0];
        let vic = &locations[3];

        let routes = builder.find_routes(van, vic);
        assert!(!routes.is_empty());
        for route in &routes {
            assert!(route.len() >= 2);

            // No repeated location.
            let mut seen = HashSet::new();
            for point in route {
                assert!(seen.insert(point.id.clone()), "repeated {}", point.id);
            }

            // Every adjacent pair resolves to a connection; no two
            // consecutive car legs; no two ferries landing on the same
            // non-empty land group.
            let mut previous_mode: Option<TravelMode> = None;
            let mut ferry_landings: Vec<String> = Vec::new();
            for pair in route.windows(2) {
                let connection = index.from_to(&pair[0].id, &pair[1].id).unwrap();
                if connection.mode() == TravelMode::Car {
                    assert_ne!(previous_mode, Some(TravelMode::Car), "chained drives");
                }
                if connection.mode() == TravelMode::Ferry
                    && let Some(group) = &connection.destination.land_group
                {
                    assert!(
                        !ferry_landings.contains(group),
                        "two ferries land on {group}"
                    );
                    ferry_landings.push(group.clone());
                }
                previous_mode = Some(connection.mode());
            }
        }
    }

    #[test]
    fn repeated_searches_are_deterministic() {
        let (index, locations) = island_network();
        let builder = RouteBuilder::new(&index);
        let van = &locations[0];
        let vic = &locations[3];

        let first = builder.find_routes(van, vic);
        let second = builder.find_routes(van, vic);
        assert_eq!(
            first.iter().map(|r| ids(r)).collect::<Vec<_>>(),
            second.iter().map(|r| ids(r)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn ferry_does_not_return_to_departed_land_group() {
        // Island loop: leaving the mainland by ferry forbids ferrying back.
        let tsa = terminal("TSA", Some("mainland"));
        let hsb = terminal("HSB", Some("mainland"));
        let swb = terminal("SWB", Some("island"));
        let nan = terminal("NAN", Some("island"));

        let mut connections = Vec::new();
        connections.extend(link(&tsa, &swb, ferry()));
        connections.extend(link(&swb, &nan, ConnectionKind::Car));
        connections.extend(link(&nan, &hsb, ferry()));
        connections.extend(link(&hsb, &tsa, ConnectionKind::Car));
        let index = ConnectionIndex::new(connections);
        let builder = RouteBuilder::new(&index);

        let routes = builder.find_routes(&tsa, &nan);
        // TSA -> SWB -> NAN is valid; TSA -> HSB -> NAN (car then ferry to
        // the island) is valid too; but no route may ferry off the mainland
        // and ferry back onto it.
        assert!(!routes.is_empty());
        for route in &routes {
            let mut mainland_landings = 0;
            for pair in route.windows(2) {
                let connection = index.from_to(&pair[0].id, &pair[1].id).unwrap();
                if connection.mode() == TravelMode::Ferry
                    && connection.destination.land_group.as_deref() == Some("mainland")
                {
                    mainland_landings += 1;
                }
            }
            assert!(mainland_landings <= 1);
        }
    }

    #[test]
    fn dead_end_branches_yield_no_routes() {
        // A spur that cannot reach the destination must not appear, and the
        // search must still terminate quickly thanks to memoization.
        let a = terminal("AAA", None);
        let b = terminal("BBB", None);
        let spur = terminal("SPR", None);
        let mut connections = link(&a, &b, ferry());
        connections.extend(link(&a, &spur, ConnectionKind::Car));
        let index = ConnectionIndex::new(connections);
        let builder = RouteBuilder::new(&index);

        let routes = builder.find_routes(&a, &b);
        assert_eq!(routes.len(), 1);
        assert!(routes.iter().all(|route| !ids(route).contains(&"SPR")));
    }
}
