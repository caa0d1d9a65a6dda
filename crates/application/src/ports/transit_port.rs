//! Transit backend port
//!
//! Defines the interface for stop lookup, departure boards and trip planning.
//! Adapters in the infrastructure layer implement this port over the EFA client.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use domain::{DepArr, Departure, Language, ModeFlags, Stop, TripPlan};
#[cfg(test)]
use mockall::automock;
use serde::Serialize;

use crate::error::ApplicationError;

/// A value plus whether it was served from the response cache
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fetched<T> {
    /// The canonical records
    pub value: T,
    /// Served from cache without an upstream call
    pub from_cache: bool,
}

impl<T> Fetched<T> {
    /// Freshly fetched from the upstream
    pub const fn fresh(value: T) -> Self {
        Self {
            value,
            from_cache: false,
        }
    }

    /// Served from cache
    pub const fn cached(value: T) -> Self {
        Self {
            value,
            from_cache: true,
        }
    }

    /// Transform the value, keeping the cache marker
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        Fetched {
            value: f(self.value),
            from_cache: self.from_cache,
        }
    }
}

/// Parameters for a departure board request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartureQuery {
    /// Upstream stop id
    pub stop_id: String,
    /// Board start time
    pub when: DateTime<FixedOffset>,
    /// Window length in minutes
    pub duration_minutes: Option<u32>,
    /// Maximum number of entries
    pub limit: u32,
    /// Ask the upstream for real-time data
    pub include_delays: bool,
    /// Language for texts
    pub language: Language,
}

/// Parameters for a trip request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripQuery {
    /// Upstream origin stop id
    pub origin_id: String,
    /// Upstream destination stop id
    pub destination_id: String,
    /// Anchor time
    pub when: DateTime<FixedOffset>,
    /// Anchor kind
    pub dep_or_arr: DepArr,
    /// Mode filters
    pub modes: ModeFlags,
    /// Language for texts
    pub language: Language,
}

/// Port for transit backend operations
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TransitPort: Send + Sync {
    /// Resolve a free-text place name to candidate stops, upstream order
    async fn find_stops(
        &self,
        query: &str,
        language: Language,
    ) -> Result<Fetched<Vec<Stop>>, ApplicationError>;

    /// Departure board for a stop
    async fn fetch_departures(
        &self,
        query: &DepartureQuery,
    ) -> Result<Fetched<Vec<Departure>>, ApplicationError>;

    /// Itineraries between two stops
    async fn fetch_trips(
        &self,
        query: &TripQuery,
    ) -> Result<Fetched<Vec<TripPlan>>, ApplicationError>;
}
