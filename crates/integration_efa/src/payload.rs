//! Raw EFA rapidJSON payloads
//!
//! One payload type per capability. List items stay as raw JSON until the
//! normalizer decodes them one by one, so a single malformed entry cannot
//! fail a whole response. Unknown fields are kept in `extra` maps.

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{error::EfaError, request::RequestKind};

/// Treat `null` like a missing list
fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Message codes arrive as numbers or strings
fn code_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// How an upstream system message should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageCategory {
    /// Nothing matched the request
    NotFound,
    /// Backend cannot serve the request right now
    Unavailable,
    /// Request parameters were rejected
    InvalidRequest,
    /// Any other code
    Unknown,
}

/// A `systemMessages` entry
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMessage {
    /// Message type, `error` for failures
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Emitting module
    #[serde(default)]
    pub module: Option<String>,
    /// Numeric or alphanumeric code
    #[serde(default, deserialize_with = "code_as_string")]
    pub code: Option<String>,
    /// Human-readable text
    #[serde(default)]
    pub text: Option<String>,
    /// Sub type
    #[serde(default)]
    pub sub_type: Option<String>,
}

impl SystemMessage {
    /// True for `error` typed messages
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind
            .as_deref()
            .is_some_and(|k| k.eq_ignore_ascii_case("error"))
    }

    /// Classify by code
    #[must_use]
    pub fn category(&self) -> MessageCategory {
        match self.code.as_deref().map(str::trim) {
            Some("-8010" | "-2000" | "H430" | "H895") => MessageCategory::NotFound,
            Some("H730" | "H931") => MessageCategory::Unavailable,
            Some("H922" | "-8011") => MessageCategory::InvalidRequest,
            _ => MessageCategory::Unknown,
        }
    }

    fn describe(&self) -> String {
        self.text
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "upstream error".to_string())
    }
}

/// Stop finder response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopFinderPayload {
    /// Candidate locations
    #[serde(default, deserialize_with = "nullable_vec")]
    pub locations: Vec<Value>,
    /// Backend messages
    #[serde(default, deserialize_with = "nullable_vec")]
    pub system_messages: Vec<SystemMessage>,
    /// Other top-level fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Departure monitor response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmPayload {
    /// The stop the board belongs to
    #[serde(default, deserialize_with = "nullable_vec")]
    pub locations: Vec<Value>,
    /// Board entries
    #[serde(default, deserialize_with = "nullable_vec")]
    pub stop_events: Vec<Value>,
    /// Backend messages
    #[serde(default, deserialize_with = "nullable_vec")]
    pub system_messages: Vec<SystemMessage>,
    /// Other top-level fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Trip response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPayload {
    /// Itineraries
    #[serde(default, deserialize_with = "nullable_vec")]
    pub journeys: Vec<Value>,
    /// Backend messages
    #[serde(default, deserialize_with = "nullable_vec")]
    pub system_messages: Vec<SystemMessage>,
    /// Other top-level fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A decoded response, tagged by capability
#[derive(Debug, Clone)]
pub enum EfaPayload {
    /// Stop finder
    StopFinder(StopFinderPayload),
    /// Departure monitor
    Departures(DmPayload),
    /// Trip planner
    Trip(TripPayload),
}

fn decode_as<T: DeserializeOwned>(body: &str) -> Result<T, EfaError> {
    serde_json::from_str(body).map_err(|e| EfaError::Decode(e.to_string()))
}

impl EfaPayload {
    /// Decode a response body for the given capability
    pub fn decode(kind: RequestKind, body: &str) -> Result<Self, EfaError> {
        Ok(match kind {
            RequestKind::StopFinder => Self::StopFinder(decode_as(body)?),
            RequestKind::Departures => Self::Departures(decode_as(body)?),
            RequestKind::Trip => Self::Trip(decode_as(body)?),
        })
    }

    /// Capability this payload answers
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        match self {
            Self::StopFinder(_) => RequestKind::StopFinder,
            Self::Departures(_) => RequestKind::Departures,
            Self::Trip(_) => RequestKind::Trip,
        }
    }

    /// Backend messages
    #[must_use]
    pub fn system_messages(&self) -> &[SystemMessage] {
        match self {
            Self::StopFinder(p) => &p.system_messages,
            Self::Departures(p) => &p.system_messages,
            Self::Trip(p) => &p.system_messages,
        }
    }

    /// Number of raw result entries
    #[must_use]
    pub fn result_count(&self) -> usize {
        match self {
            Self::StopFinder(p) => p.locations.len(),
            Self::Departures(p) => p.stop_events.len(),
            Self::Trip(p) => p.journeys.len(),
        }
    }

    /// Turn an error message on an empty result into the matching outcome
    ///
    /// Not-found codes yield the empty payload; unavailable and invalid
    /// codes become errors. Messages next to real results are ignored.
    pub fn check_messages(self) -> Result<Self, EfaError> {
        if self.result_count() > 0 {
            return Ok(self);
        }
        let Some(message) = self.system_messages().iter().find(|m| m.is_error()) else {
            return Ok(self);
        };

        let code = message.code.clone().unwrap_or_default();
        let status = match message.category() {
            MessageCategory::NotFound => return Ok(self),
            MessageCategory::Unavailable => 503,
            MessageCategory::InvalidRequest => 400,
            MessageCategory::Unknown => 502,
        };
        Err(EfaError::Api {
            status,
            code,
            message: message.describe(),
        })
    }
}

// --- Typed list items, decoded per entry by the normalizer ---

/// A location as used by stop finder results, board stops and leg endpoints
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLocation {
    pub id: Option<String>,
    pub name: Option<String>,
    pub disassembled_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub coord: Vec<f64>,
    pub parent: Option<Box<RawLocation>>,
    pub properties: Option<Map<String, Value>>,
    pub match_quality: Option<u32>,
    pub is_best: Option<bool>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub product_classes: Vec<i64>,
    pub departure_time_planned: Option<String>,
    pub departure_time_estimated: Option<String>,
    pub arrival_time_planned: Option<String>,
    pub arrival_time_estimated: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawLocation {
    /// A string entry of `properties`
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.get(key))
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProduct {
    #[serde(rename = "class")]
    pub class: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReference {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransportation {
    pub id: Option<String>,
    pub name: Option<String>,
    pub disassembled_name: Option<String>,
    pub number: Option<String>,
    pub product: Option<RawProduct>,
    pub operator: Option<RawReference>,
    pub destination: Option<RawReference>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInfo {
    pub text: Option<String>,
    pub name: Option<String>,
    pub subtitle: Option<String>,
}

impl RawInfo {
    /// First non-empty text field
    #[must_use]
    pub fn display_text(&self) -> Option<String> {
        [&self.text, &self.subtitle, &self.name]
            .into_iter()
            .flatten()
            .find(|t| !t.trim().is_empty())
            .cloned()
    }
}

/// One departure monitor entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStopEvent {
    pub location: Option<RawLocation>,
    pub departure_time_planned: Option<String>,
    pub departure_time_estimated: Option<String>,
    pub realtime_status: Option<Value>,
    pub is_realtime_controlled: Option<Value>,
    pub is_cancelled: Option<bool>,
    pub transportation: Option<RawTransportation>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub infos: Vec<RawInfo>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTicket {
    pub name: Option<String>,
    pub price_brutto: Option<f64>,
    pub currency: Option<String>,
    pub person: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFare {
    #[serde(default, deserialize_with = "nullable_vec")]
    pub tickets: Vec<RawTicket>,
}

/// One itinerary segment
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLeg {
    pub origin: Option<RawLocation>,
    pub destination: Option<RawLocation>,
    pub transportation: Option<RawTransportation>,
}

/// One itinerary
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawJourney {
    pub interchanges: Option<u32>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub legs: Vec<RawLeg>,
    pub fare: Option<RawFare>,
}
