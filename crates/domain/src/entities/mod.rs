//! Entities - canonical transit records and query models

mod departure;
mod query;
mod stop;
mod trip;

pub use departure::{Departure, DepartureStatus};
pub use query::{DepArr, QueryIntent, QueryType, RawQueryText, ResolvedQuery};
pub use stop::{Stop, StopKind};
pub use trip::{FareSummary, Leg, TripPlan};
