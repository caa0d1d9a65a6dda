//! Transit system timezone value object

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::errors::DomainError;

/// The local timezone of the transit network, validated against the IANA database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransitTimezone(Tz);

impl TransitTimezone {
    /// Wrap a known timezone
    #[must_use]
    pub const fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Europe/Rome, the zone of the South Tyrol network
    #[must_use]
    pub const fn europe_rome() -> Self {
        Self(chrono_tz::Europe::Rome)
    }

    /// Underlying chrono-tz zone
    #[must_use]
    pub const fn tz(&self) -> Tz {
        self.0
    }

    /// IANA name
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Convert any instant into this zone
    #[must_use]
    pub fn localize<Z: TimeZone>(&self, instant: &DateTime<Z>) -> DateTime<Tz> {
        instant.with_timezone(&self.0)
    }

    /// Convert an instant into this zone, keeping only the fixed offset
    #[must_use]
    pub fn to_fixed<Z: TimeZone>(&self, instant: &DateTime<Z>) -> DateTime<FixedOffset> {
        self.localize(instant).fixed_offset()
    }

    /// Current instant in this zone
    #[must_use]
    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.0)
    }
}

impl Default for TransitTimezone {
    fn default() -> Self {
        Self::europe_rome()
    }
}

impl fmt::Display for TransitTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransitTimezone {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<Tz>()
            .map(Self)
            .map_err(|_| DomainError::InvalidTimezone(s.to_string()))
    }
}

impl TryFrom<String> for TransitTimezone {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TransitTimezone> for String {
    fn from(tz: TransitTimezone) -> Self {
        tz.name().to_string()
    }
}
