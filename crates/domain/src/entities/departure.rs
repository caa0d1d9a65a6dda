//! Canonical departure board entry

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::value_objects::TransitMode;

/// Real-time status of a departure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepartureStatus {
    /// Running as scheduled
    OnTime,
    /// Running late
    Delayed,
    /// Cancelled upstream
    Cancelled,
    /// No real-time data available
    #[default]
    Unknown,
}

impl DepartureStatus {
    /// Derive the status from a computed delay and the upstream cancellation flag
    ///
    /// Cancellation wins over any delay. A missing delay means no real-time data.
    #[must_use]
    pub const fn derive(delay_minutes: Option<i64>, cancelled: bool) -> Self {
        if cancelled {
            return Self::Cancelled;
        }
        match delay_minutes {
            None => Self::Unknown,
            Some(d) if d <= 0 => Self::OnTime,
            Some(_) => Self::Delayed,
        }
    }
}

/// One scheduled service instance leaving a stop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Departure {
    /// Upstream service identifier
    pub service_id: String,
    /// Full service name ("Regionalzug R", "Citybus 201")
    pub service_name: String,
    /// Short line label ("R", "201")
    pub line: String,
    /// Normalized transport mode
    pub mode: TransitMode,
    /// Final destination shown on the vehicle
    pub destination: String,
    /// Timetable departure time
    pub scheduled_time: DateTime<FixedOffset>,
    /// Real-time estimate, equals `scheduled_time` when none is available
    pub predicted_time: DateTime<FixedOffset>,
    /// `predicted_time - scheduled_time` in whole minutes
    pub delay_minutes: i64,
    /// Platform or bay
    pub platform: Option<String>,
    /// Derived status
    pub status: DepartureStatus,
    /// Whether the upstream supplied real-time data for this entry
    #[serde(default)]
    pub real_time: bool,
    /// Operating company
    pub operator: Option<String>,
    /// Service notices attached to this departure
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<String>,
    /// Upstream fields without a canonical home
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Departure {
    /// Delay in whole minutes between two instants, truncated toward zero
    #[must_use]
    pub fn delay_between(scheduled: &DateTime<FixedOffset>, predicted: &DateTime<FixedOffset>) -> i64 {
        (*predicted - *scheduled).num_minutes()
    }

    /// Whether the departure is cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.status == DepartureStatus::Cancelled
    }
}
