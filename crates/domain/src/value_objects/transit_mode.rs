//! Transport modes and mode filters

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical transport mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitMode {
    /// Bus, including regional and city buses
    Bus,
    /// Any rail service
    Train,
    /// Tram / Straßenbahn
    Tram,
    /// Cable car, gondola, funicular
    CableCar,
    /// Ferry
    Ferry,
    /// Anything the upstream vocabulary does not map cleanly
    Other,
}

impl TransitMode {
    /// Human-readable label
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Bus => "Bus",
            Self::Train => "Train",
            Self::Tram => "Tram",
            Self::CableCar => "Cable car",
            Self::Ferry => "Ferry",
            Self::Other => "Transit",
        }
    }
}

impl fmt::Display for TransitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Mode filters requested for a query
///
/// Long-distance trains are excluded unless explicitly asked for.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeFlags {
    /// Include buses
    pub bus: bool,
    /// Include regional trains
    pub train: bool,
    /// Include cable cars
    pub cable_car: bool,
    /// Include long-distance trains
    pub long_distance: bool,
}

impl Default for ModeFlags {
    fn default() -> Self {
        Self {
            bus: true,
            train: true,
            cable_car: true,
            long_distance: false,
        }
    }
}

impl ModeFlags {
    /// Every mode enabled, long distance included
    #[must_use]
    pub const fn all() -> Self {
        Self {
            bus: true,
            train: true,
            cable_car: true,
            long_distance: true,
        }
    }

    /// Every mode disabled
    #[must_use]
    pub const fn none() -> Self {
        Self {
            bus: false,
            train: false,
            cable_car: false,
            long_distance: false,
        }
    }

    /// True when at least one mode remains selectable
    #[must_use]
    pub const fn any_enabled(&self) -> bool {
        self.bus || self.train || self.cable_car || self.long_distance
    }

    /// Whether a service of the given mode passes the filter
    #[must_use]
    pub const fn allows(&self, mode: TransitMode) -> bool {
        match mode {
            TransitMode::Bus => self.bus,
            TransitMode::Train => self.train || self.long_distance,
            TransitMode::CableCar => self.cable_car,
            TransitMode::Tram | TransitMode::Ferry | TransitMode::Other => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_excludes_long_distance() {
        let flags = ModeFlags::default();
        assert!(flags.bus && flags.train && flags.cable_car);
        assert!(!flags.long_distance);
        assert!(flags.any_enabled());
    }

    #[test]
    fn none_has_nothing_enabled() {
        assert!(!ModeFlags::none().any_enabled());
    }

    #[test]
    fn long_distance_alone_is_enabled() {
        let flags = ModeFlags {
            long_distance: true,
            ..ModeFlags::none()
        };
        assert!(flags.any_enabled());
        assert!(flags.allows(TransitMode::Train));
        assert!(!flags.allows(TransitMode::Bus));
    }

    #[test]
    fn unfiltered_modes_always_pass() {
        let flags = ModeFlags::none();
        assert!(flags.allows(TransitMode::Tram));
        assert!(flags.allows(TransitMode::Other));
    }

    #[test]
    fn mode_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&TransitMode::CableCar).unwrap(),
            "\"cable_car\""
        );
    }
}
