//! Route discovery and plan construction.
//!
//! `RouteBuilder` enumerates structurally valid paths over the static graph;
//! `RoutePlanBuilder` expands each path against sailing schedules and
//! terminal check-in policy into time-resolved plans.

mod options;
mod plans;
mod routes;


pub use options::RoutePlansOptions;
pub use plans::{PlanConfig, RoutePlanBuilder, ScheduleSource};
pub use routes::{Route, RouteBuilder};
