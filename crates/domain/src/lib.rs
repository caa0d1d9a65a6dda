//! Domain layer for the EFA transit assistant
//!
//! Contains the canonical transit records (stops, departures, trip plans),
//! the query intent model, value objects, and domain errors.
//! This layer performs no I/O and defines the ubiquitous language.

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::*;
pub use errors::DomainError;
pub use value_objects::*;
