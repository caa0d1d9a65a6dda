//! Canonical stop record

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    errors::DomainError,
    value_objects::{GeoLocation, TransitMode},
};

/// Kind of location returned by the stop finder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopKind {
    /// A public transport stop
    #[default]
    Stop,
    /// A town or municipality
    Locality,
    /// Point of interest
    Poi,
    /// Street address
    Address,
    /// Anything else
    Other,
}

impl StopKind {
    /// Map the upstream location type
    #[must_use]
    pub fn from_upstream(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "stop" | "platform" => Self::Stop,
            "locality" | "suburb" => Self::Locality,
            "poi" => Self::Poi,
            "address" | "street" | "singlehouse" => Self::Address,
            _ => Self::Other,
        }
    }
}

/// A canonical stop or platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    /// Stable upstream identifier
    pub id: String,
    /// Display name, never empty
    pub name: String,
    /// Location type
    #[serde(default)]
    pub kind: StopKind,
    /// WGS84 position if known
    pub coordinates: Option<GeoLocation>,
    /// Municipality / locality the stop belongs to
    pub municipality: Option<String>,
    /// Modes serving this stop
    #[serde(default)]
    pub modes: Vec<TransitMode>,
    /// Known platforms
    #[serde(default)]
    pub platforms: Vec<String>,
    /// Upstream match quality (0..=1000), present for stop finder results
    pub match_quality: Option<u32>,
    /// Upstream best-match marker
    #[serde(default)]
    pub is_best: bool,
    /// Upstream fields without a canonical home
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Stop {
    /// Create a stop, enforcing non-empty id and name
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStop` if the id or name is blank.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        let name = name.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidStop("id must not be empty".to_string()));
        }
        if name.trim().is_empty() {
            return Err(DomainError::InvalidStop(format!(
                "name must not be empty (id {id})"
            )));
        }
        Ok(Self {
            id,
            name: name.trim().to_string(),
            kind: StopKind::Stop,
            coordinates: None,
            municipality: None,
            modes: Vec::new(),
            platforms: Vec::new(),
            match_quality: None,
            is_best: false,
            extra: Map::new(),
        })
    }

    /// Set the coordinates
    #[must_use]
    pub const fn with_coordinates(mut self, coordinates: GeoLocation) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    /// Set the municipality
    #[must_use]
    pub fn with_municipality(mut self, municipality: impl Into<String>) -> Self {
        self.municipality = Some(municipality.into());
        self
    }

    /// Set the match quality
    #[must_use]
    pub const fn with_match_quality(mut self, quality: u32) -> Self {
        self.match_quality = Some(quality);
        self
    }

    /// Match quality, zero when unknown
    #[must_use]
    pub fn quality(&self) -> u32 {
        self.match_quality.unwrap_or(0)
    }

    /// Case-insensitive exact comparison against a free-text query
    ///
    /// Both the bare name and "Municipality, Name" count as exact.
    #[must_use]
    pub fn matches_exactly(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if self.name.to_lowercase() == query {
            return true;
        }
        self.municipality
            .as_ref()
            .is_some_and(|m| format!("{}, {}", m.to_lowercase(), self.name.to_lowercase()) == query)
    }

    /// Case-insensitive prefix comparison against a free-text query
    #[must_use]
    pub fn starts_with(&self, query: &str) -> bool {
        self.name
            .to_lowercase()
            .starts_with(&query.trim().to_lowercase())
    }

    /// Distance to a point in kilometers, if the stop has coordinates
    #[must_use]
    pub fn distance_to(&self, point: &GeoLocation) -> Option<f64> {
        self.coordinates.map(|c| c.distance_km(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_name() {
        let stop = Stop::new("66002123", "  Meran, Bahnhof ").unwrap();
        assert_eq!(stop.name, "Meran, Bahnhof");
        assert_eq!(stop.kind, StopKind::Stop);
    }

    #[test]
    fn new_rejects_empty_name() {
        assert!(matches!(
            Stop::new("1", "   "),
            Err(DomainError::InvalidStop(_))
        ));
    }

    #[test]
    fn new_rejects_empty_id() {
        assert!(Stop::new("", "Bozen").is_err());
    }

    #[test]
    fn exact_match_ignores_case() {
        let stop = Stop::new("1", "Bozen Bahnhof").unwrap();
        assert!(stop.matches_exactly("bozen bahnhof"));
        assert!(!stop.matches_exactly("bozen"));
    }

    #[test]
    fn exact_match_with_municipality_prefix() {
        let stop = Stop::new("1", "Busbahnhof")
            .unwrap()
            .with_municipality("Neumarkt");
        assert!(stop.matches_exactly("Neumarkt, Busbahnhof"));
    }

    #[test]
    fn prefix_match() {
        let stop = Stop::new("1", "Meran, Theaterplatz").unwrap();
        assert!(stop.starts_with("meran"));
        assert!(!stop.starts_with("bozen"));
    }

    #[test]
    fn quality_defaults_to_zero() {
        let stop = Stop::new("1", "X").unwrap();
        assert_eq!(stop.quality(), 0);
        assert_eq!(stop.with_match_quality(870).quality(), 870);
    }

    #[test]
    fn kind_from_upstream() {
        assert_eq!(StopKind::from_upstream("stop"), StopKind::Stop);
        assert_eq!(StopKind::from_upstream("locality"), StopKind::Locality);
        assert_eq!(StopKind::from_upstream("street"), StopKind::Address);
        assert_eq!(StopKind::from_upstream("gis"), StopKind::Other);
    }

    #[test]
    fn extra_is_skipped_when_empty() {
        let stop = Stop::new("1", "X").unwrap();
        let json = serde_json::to_value(&stop).unwrap();
        assert!(json.get("extra").is_none());
    }
}
