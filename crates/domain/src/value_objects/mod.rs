//! Value Objects - Immutable, identity-less domain primitives

mod geo_location;
mod language;
mod timezone;
mod transit_mode;

pub use geo_location::GeoLocation;
pub use language::Language;
pub use timezone::TransitTimezone;
pub use transit_mode::{ModeFlags, TransitMode};
