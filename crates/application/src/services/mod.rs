//! Application services - Use case implementations

mod summary_formatter;
mod transit_query_service;

pub use summary_formatter::{
    summarize_departures, summarize_stops, summarize_trip, summarize_trips,
};
pub use transit_query_service::{QueryAnswer, QueryConfig, TransitQueryService};
