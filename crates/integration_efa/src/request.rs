//! Typed EFA requests
//!
//! Each request renders to a normalized, sorted parameter map. The same map
//! feeds the HTTP query string and the cache fingerprint, so two requests
//! with equal parameters always share one cache entry.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use domain::{Language, ModeFlags};
use serde::Serialize;

/// Upstream capability a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Free-text stop lookup
    StopFinder,
    /// Departure monitor
    Departures,
    /// Trip planning
    Trip,
}

impl RequestKind {
    /// Endpoint path below the base URL
    #[must_use]
    pub const fn endpoint(&self) -> &'static str {
        match self {
            Self::StopFinder => "XML_STOPFINDER_REQUEST",
            Self::Departures => "XML_DM_REQUEST",
            Self::Trip => "XML_TRIP_REQUEST2",
        }
    }

    /// Short label for logs
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StopFinder => "stop_finder",
            Self::Departures => "departures",
            Self::Trip => "trip",
        }
    }
}

/// Stop finder parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopFinderRequest {
    /// Free-text place name
    pub query: String,
    /// Response language
    pub language: Language,
}

/// Departure monitor parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartureRequest {
    /// Upstream stop id
    pub stop_id: String,
    /// Board start, already in the transit zone
    pub when: DateTime<FixedOffset>,
    /// Window length in minutes
    pub duration_minutes: Option<u32>,
    /// Maximum entries
    pub limit: u32,
    /// Ask for real-time data
    pub include_realtime: bool,
    /// Response language
    pub language: Language,
}

/// Trip planning parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripRequest {
    /// Upstream origin stop id
    pub origin_id: String,
    /// Upstream destination stop id
    pub destination_id: String,
    /// Anchor time, already in the transit zone
    pub when: DateTime<FixedOffset>,
    /// Anchor is the arrival
    pub arrive_by: bool,
    /// Number of itineraries
    pub max_trips: u32,
    /// Mode filters
    pub modes: ModeFlags,
    /// Ask for real-time data
    pub include_realtime: bool,
    /// Response language
    pub language: Language,
}

/// A request against one of the three EFA capabilities
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EfaRequest {
    /// Stop finder
    StopFinder(StopFinderRequest),
    /// Departure monitor
    Departures(DepartureRequest),
    /// Trip planner
    Trip(TripRequest),
}

const fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

impl EfaRequest {
    /// Capability targeted
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        match self {
            Self::StopFinder(_) => RequestKind::StopFinder,
            Self::Departures(_) => RequestKind::Departures,
            Self::Trip(_) => RequestKind::Trip,
        }
    }

    /// Endpoint path below the base URL
    #[must_use]
    pub const fn endpoint(&self) -> &'static str {
        self.kind().endpoint()
    }

    /// Normalized query parameters, sorted by name, empty values dropped
    #[must_use]
    pub fn params(&self) -> BTreeMap<&'static str, String> {
        let mut params: BTreeMap<&'static str, String> = BTreeMap::new();
        params.insert("outputFormat", "rapidJSON".to_string());
        params.insert("coordOutputFormat", "WGS84[DD.DDDDD]".to_string());
        params.insert("SpEncId", "0".to_string());

        match self {
            Self::StopFinder(r) => {
                params.insert("language", r.language.code().to_string());
                params.insert("type_sf", "any".to_string());
                params.insert("name_sf", r.query.trim().to_string());
                params.insert("odvSugMacro", "1".to_string());
            },
            Self::Departures(r) => {
                params.insert("language", r.language.code().to_string());
                params.insert("locationServerActive", "1".to_string());
                params.insert("stateless", "1".to_string());
                params.insert("mode", "direct".to_string());
                params.insert("type_dm", "stopID".to_string());
                params.insert("name_dm", r.stop_id.trim().to_string());
                params.insert("useAllStops", "1".to_string());
                params.insert("useRealtime", flag(r.include_realtime).to_string());
                params.insert("itdDate", r.when.format("%Y%m%d").to_string());
                params.insert("itdTime", r.when.format("%H:%M").to_string());
                params.insert("limit", r.limit.to_string());
                params.insert("itdLPxx_depOnly", "1".to_string());
                if let Some(span) = r.duration_minutes {
                    params.insert("timeSpan", span.to_string());
                }
            },
            Self::Trip(r) => {
                params.insert("language", r.language.code().to_string());
                params.insert("locationServerActive", "1".to_string());
                params.insert("stateless", "1".to_string());
                params.insert("type_origin", "stopID".to_string());
                params.insert("name_origin", r.origin_id.trim().to_string());
                params.insert("type_destination", "stopID".to_string());
                params.insert("name_destination", r.destination_id.trim().to_string());
                params.insert("itdDate", r.when.format("%Y%m%d").to_string());
                params.insert("itdTime", r.when.format("%H:%M").to_string());
                params.insert(
                    "itdTripDateTimeDepArr",
                    if r.arrive_by { "arr" } else { "dep" }.to_string(),
                );
                params.insert("calcNumberOfTrips", r.max_trips.to_string());
                params.insert("useRealtime", flag(r.include_realtime).to_string());
                params.insert("itOptionsActive", "1".to_string());
                params.insert("ptOptionsActive", "1".to_string());
                params.insert("includedMeans", "checkbox".to_string());
                if r.modes.bus {
                    params.insert("inclMOT_BUS", "1".to_string());
                }
                // Long-distance services run on the rail product
                if r.modes.train || r.modes.long_distance {
                    params.insert("inclMOT_ZUG", "1".to_string());
                }
                if r.modes.cable_car {
                    params.insert("inclMOT_8", "1".to_string());
                }
                let restriction = if r.modes.long_distance { "400" } else { "401" };
                params.insert("lineRestriction", restriction.to_string());
            },
        }

        params.retain(|_, value| !value.is_empty());
        params
    }

    /// Deterministic cache key over endpoint and normalized parameters
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.endpoint().as_bytes());
        for (key, value) in self.params() {
            hasher.update(b"\x1f");
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
        }
        let hash = hasher.finalize();
        format!("{}:{}", self.kind().as_str(), &hash.to_hex()[..32])
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(h: u32, m: u32, s: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 13, h, m, s)
            .unwrap()
    }

    fn departures(when: DateTime<FixedOffset>) -> EfaRequest {
        EfaRequest::Departures(DepartureRequest {
            stop_id: "66001234".to_string(),
            when,
            duration_minutes: Some(60),
            limit: 10,
            include_realtime: true,
            language: Language::De,
        })
    }

    fn trip(modes: ModeFlags) -> EfaRequest {
        EfaRequest::Trip(TripRequest {
            origin_id: "66002000".to_string(),
            destination_id: "66002001".to_string(),
            when: at(14, 30, 0),
            arrive_by: true,
            max_trips: 5,
            modes,
            include_realtime: true,
            language: Language::It,
        })
    }

    #[test]
    fn stop_finder_params() {
        let request = EfaRequest::StopFinder(StopFinderRequest {
            query: " Meran ".to_string(),
            language: Language::En,
        });
        let params = request.params();
        assert_eq!(request.endpoint(), "XML_STOPFINDER_REQUEST");
        assert_eq!(params["name_sf"], "Meran");
        assert_eq!(params["type_sf"], "any");
        assert_eq!(params["outputFormat"], "rapidJSON");
        assert_eq!(params["language"], "en");
    }

    #[test]
    fn departure_params_use_local_date_and_time() {
        let params = departures(at(9, 5, 0)).params();
        assert_eq!(params["itdDate"], "20240513");
        assert_eq!(params["itdTime"], "09:05");
        assert_eq!(params["name_dm"], "66001234");
        assert_eq!(params["useRealtime"], "1");
        assert_eq!(params["timeSpan"], "60");
    }

    #[test]
    fn trip_params_encode_modes() {
        let params = trip(ModeFlags::default()).params();
        assert_eq!(params["itdTripDateTimeDepArr"], "arr");
        assert_eq!(params["inclMOT_BUS"], "1");
        assert_eq!(params["inclMOT_ZUG"], "1");
        assert_eq!(params["inclMOT_8"], "1");
        assert_eq!(params["lineRestriction"], "401");

        let only_bus = ModeFlags {
            bus: true,
            train: false,
            cable_car: false,
            long_distance: false,
        };
        let params = trip(only_bus).params();
        assert!(!params.contains_key("inclMOT_ZUG"));
        assert!(!params.contains_key("inclMOT_8"));
        assert_eq!(params["lineRestriction"], "401");
    }

    #[test]
    fn long_distance_alone_selects_rail() {
        let params = trip(ModeFlags {
            bus: false,
            train: false,
            cable_car: false,
            long_distance: true,
        })
        .params();
        assert_eq!(params["includedMeans"], "checkbox");
        assert_eq!(params["inclMOT_ZUG"], "1");
        assert!(!params.contains_key("inclMOT_BUS"));
        assert!(!params.contains_key("inclMOT_8"));
        assert_eq!(params["lineRestriction"], "400");
    }

    #[test]
    fn fingerprint_ignores_seconds_within_a_minute() {
        assert_eq!(
            departures(at(9, 5, 1)).fingerprint(),
            departures(at(9, 5, 59)).fingerprint()
        );
        assert_ne!(
            departures(at(9, 5, 0)).fingerprint(),
            departures(at(9, 6, 0)).fingerprint()
        );
    }

    #[test]
    fn fingerprint_depends_on_parameters_and_kind() {
        let a = trip(ModeFlags::default());
        let b = trip(ModeFlags::all());
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert!(a.fingerprint().starts_with("trip:"));
    }

    #[test]
    fn empty_values_are_dropped() {
        let request = EfaRequest::StopFinder(StopFinderRequest {
            query: "   ".to_string(),
            language: Language::De,
        });
        assert!(!request.params().contains_key("name_sf"));
    }
}
