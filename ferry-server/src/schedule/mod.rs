//! Schedule acquisition.
//!
//! The operator publishes timetables as HTML, either a daily table or a
//! seasonal weekly form selected by date range. `parser` turns fetched
//! markup into sailings (or a redirect signal); `client` downloads pages,
//! follows parser-signalled redirects, and bounds concurrent fetches.

mod client;
mod error;
pub mod parser;

pub use client::{HttpFetcher, PageFetcher, ScheduleClient, ScheduleClientConfig};
pub use error::ScheduleError;
pub use parser::HtmlParseResult;
