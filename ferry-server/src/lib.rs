//! Multimodal ferry trip planner.
//!
//! Plans trips by car, ferry, air, and bus across a coastal network where
//! ferry sailings dominate the timetable. Route discovery walks the static
//! location/connection graph; plan construction expands each route against
//! live sailing schedules and terminal check-in policy; schedules are
//! scraped from the operator's website and kept in a cache-aside store with
//! a rolling look-ahead window.

pub mod domain;
pub mod graph;
pub mod planner;
pub mod schedule;
pub mod store;
