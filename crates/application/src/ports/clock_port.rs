//! Clock port

use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;

/// Source of the reference instant for date resolution
#[cfg_attr(test, automock)]
pub trait ClockPort: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;
}
