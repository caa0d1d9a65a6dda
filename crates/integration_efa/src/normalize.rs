//! Response normalizer
//!
//! Maps raw EFA payloads into canonical [`Stop`], [`Departure`] and
//! [`TripPlan`] records. Entries that cannot be normalized are dropped and
//! logged; a response whose entries all fail is reported as an error.

use chrono::{DateTime, FixedOffset};
use domain::{
    Departure, DepartureStatus, FareSummary, GeoLocation, Leg, Stop, StopKind, TransitMode,
    TransitTimezone, TripPlan,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::{
    error::EfaError,
    payload::{
        DmPayload, RawJourney, RawLeg, RawLocation, RawProduct, RawStopEvent, RawTicket,
        StopFinderPayload, TripPayload,
    },
};

/// Product classes the backend uses for walking segments
const FOOTPATH_CLASSES: [i64; 4] = [97, 98, 99, 100];

/// Map an upstream product class onto the canonical mode set
#[must_use]
pub const fn mode_from_class(class: i64) -> TransitMode {
    match class {
        0 | 1 | 2 | 13 | 14 | 15 | 16 => TransitMode::Train,
        3 | 4 => TransitMode::Tram,
        5 | 6 | 7 | 10 | 11 | 17 | 19 => TransitMode::Bus,
        8 => TransitMode::CableCar,
        9 => TransitMode::Ferry,
        _ => TransitMode::Other,
    }
}

/// Map a free-text product name onto the canonical mode set
#[must_use]
pub fn mode_from_name(name: &str) -> TransitMode {
    let lower = name.to_lowercase();
    let has = |terms: &[&str]| terms.iter().any(|t| lower.contains(t));
    if has(&["seilbahn", "funivia", "cable", "gondel", "cabinovia", "funicolare"]) {
        TransitMode::CableCar
    } else if has(&["bus"]) {
        TransitMode::Bus
    } else if has(&["tram", "straßenbahn"]) {
        TransitMode::Tram
    } else if has(&["zug", "bahn", "train", "treno", "rail", "regional"]) {
        TransitMode::Train
    } else if has(&["fähre", "ferry", "schiff", "traghetto", "battello"]) {
        TransitMode::Ferry
    } else {
        TransitMode::Other
    }
}

fn product_mode(product: Option<&RawProduct>) -> TransitMode {
    let Some(product) = product else {
        return TransitMode::Other;
    };
    match product.class.map(mode_from_class) {
        Some(mode) if mode != TransitMode::Other => mode,
        _ => product
            .name
            .as_deref()
            .map_or(TransitMode::Other, mode_from_name),
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

/// Converts raw payloads into canonical records in the transit zone
#[derive(Debug, Clone, Copy)]
pub struct ResponseNormalizer {
    timezone: TransitTimezone,
}

impl Default for ResponseNormalizer {
    fn default() -> Self {
        Self::new(TransitTimezone::europe_rome())
    }
}

impl ResponseNormalizer {
    /// Create a normalizer rendering times in `timezone`
    pub const fn new(timezone: TransitTimezone) -> Self {
        Self { timezone }
    }

    /// Stop finder candidates in upstream order
    pub fn stops(&self, payload: &StopFinderPayload) -> Result<Vec<Stop>, EfaError> {
        normalize_list(&payload.locations, "location", |raw: RawLocation| {
            self.stop(&raw)
        })
    }

    /// Departure board entries
    pub fn departures(&self, payload: &DmPayload) -> Result<Vec<Departure>, EfaError> {
        normalize_list(&payload.stop_events, "stop event", |raw: RawStopEvent| {
            self.departure(raw)
        })
    }

    /// Trip candidates
    pub fn trips(&self, payload: &TripPayload) -> Result<Vec<TripPlan>, EfaError> {
        normalize_list(&payload.journeys, "journey", |raw: RawJourney| self.trip(raw))
    }

    fn time(&self, value: Option<&String>) -> Result<Option<DateTime<FixedOffset>>, String> {
        match value.map(|v| v.trim()).filter(|v| !v.is_empty()) {
            None => Ok(None),
            Some(text) => DateTime::parse_from_rfc3339(text)
                .map(|t| Some(self.timezone.to_fixed(&t)))
                .map_err(|e| format!("bad timestamp '{text}': {e}")),
        }
    }

    fn stop(&self, raw: &RawLocation) -> Result<Stop, String> {
        let id = raw
            .property("stopId")
            .map(str::to_string)
            .or_else(|| non_empty(raw.id.as_ref()))
            .ok_or("location without id")?;
        let name = non_empty(raw.name.as_ref())
            .or_else(|| non_empty(raw.disassembled_name.as_ref()))
            .ok_or("location without name")?;

        let mut stop = Stop::new(id, name).map_err(|e| e.to_string())?;
        stop.kind = raw
            .kind
            .as_deref()
            .map_or(StopKind::Stop, StopKind::from_upstream);
        if let [lat, lon, ..] = raw.coord[..] {
            stop.coordinates = GeoLocation::new(lat, lon).ok();
        }
        stop.municipality = raw
            .parent
            .as_deref()
            .filter(|p| {
                p.kind
                    .as_deref()
                    .is_some_and(|k| matches!(k, "locality" | "municipality"))
            })
            .and_then(|p| non_empty(p.name.as_ref()));
        let mut modes: Vec<TransitMode> = raw
            .product_classes
            .iter()
            .map(|c| mode_from_class(*c))
            .collect();
        modes.dedup();
        stop.modes = modes;
        if let Some(platform) = raw.property("platform").or_else(|| raw.property("platformName")) {
            stop.platforms.push(platform.to_string());
        }
        stop.match_quality = raw.match_quality;
        stop.is_best = raw.is_best.unwrap_or(false);
        stop.extra.clone_from(&raw.extra);
        if let Some(properties) = &raw.properties {
            stop.extra
                .insert("properties".to_string(), Value::Object(properties.clone()));
        }
        Ok(stop)
    }

    fn departure(&self, raw: RawStopEvent) -> Result<Departure, String> {
        let scheduled = self
            .time(raw.departure_time_planned.as_ref())?
            .ok_or("stop event without departureTimePlanned")?;
        let estimated = self.time(raw.departure_time_estimated.as_ref())?;
        let transport = raw.transportation.ok_or("stop event without transportation")?;

        let cancelled = raw.is_cancelled.unwrap_or(false)
            || raw
                .realtime_status
                .as_ref()
                .is_some_and(|s| status_mentions(s, "TRIP_CANCELLED"));
        let delay = estimated.map(|e| Departure::delay_between(&scheduled, &e));
        let real_time = estimated.is_some()
            || raw.is_realtime_controlled.as_ref().is_some_and(truthy);

        let line = non_empty(transport.disassembled_name.as_ref())
            .or_else(|| non_empty(transport.number.as_ref()))
            .unwrap_or_default();
        let service_name = non_empty(transport.name.as_ref())
            .or_else(|| non_empty(transport.number.as_ref()))
            .unwrap_or_else(|| line.clone());
        let platform = raw.location.as_ref().and_then(|l| {
            l.property("platform")
                .or_else(|| l.property("platformName"))
                .map(str::to_string)
        });

        Ok(Departure {
            service_id: transport.id.clone().unwrap_or_default(),
            service_name,
            line,
            mode: product_mode(transport.product.as_ref()),
            destination: transport
                .destination
                .as_ref()
                .and_then(|d| non_empty(d.name.as_ref()))
                .unwrap_or_default(),
            scheduled_time: scheduled,
            predicted_time: estimated.unwrap_or(scheduled),
            delay_minutes: delay.unwrap_or(0),
            platform,
            status: DepartureStatus::derive(delay, cancelled),
            real_time,
            operator: transport.operator.as_ref().and_then(|o| non_empty(o.name.as_ref())),
            notices: raw.infos.iter().filter_map(|i| i.display_text()).collect(),
            extra: raw.extra,
        })
    }

    fn leg(&self, raw: &RawLeg) -> Result<Leg, String> {
        let origin = raw.origin.as_ref().ok_or("leg without origin")?;
        let destination = raw.destination.as_ref().ok_or("leg without destination")?;

        let scheduled_departure = self
            .time(origin.departure_time_planned.as_ref())?
            .ok_or("leg without planned departure")?;
        let scheduled_arrival = self
            .time(destination.arrival_time_planned.as_ref())?
            .ok_or("leg without planned arrival")?;
        let estimated_departure = self.time(origin.departure_time_estimated.as_ref())?;
        let estimated_arrival = self.time(destination.arrival_time_estimated.as_ref())?;

        let transport = raw.transportation.as_ref();
        let class = transport.and_then(|t| t.product.as_ref()).and_then(|p| p.class);
        let is_footpath =
            transport.is_none() || class.is_some_and(|c| FOOTPATH_CLASSES.contains(&c));
        let mode = if is_footpath {
            TransitMode::Other
        } else {
            product_mode(transport.and_then(|t| t.product.as_ref()))
        };

        let leg = Leg {
            mode,
            service: transport
                .and_then(|t| {
                    non_empty(t.disassembled_name.as_ref())
                        .or_else(|| non_empty(t.number.as_ref()))
                        .or_else(|| non_empty(t.name.as_ref()))
                })
                .unwrap_or_default(),
            direction: transport
                .and_then(|t| t.destination.as_ref())
                .and_then(|d| non_empty(d.name.as_ref())),
            origin: self.stop(origin)?,
            destination: self.stop(destination)?,
            departure_time: estimated_departure.unwrap_or(scheduled_departure),
            arrival_time: estimated_arrival.unwrap_or(scheduled_arrival),
            scheduled_departure,
            scheduled_arrival,
            platform: origin
                .property("platform")
                .or_else(|| origin.property("platformName"))
                .map(str::to_string),
            real_time: estimated_departure.is_some() || estimated_arrival.is_some(),
            is_footpath,
            delay_minutes: estimated_departure
                .map(|e| Departure::delay_between(&scheduled_departure, &e)),
        };

        if !leg.is_monotonic() {
            return Err(format!(
                "leg arrives before it departs ({} > {})",
                leg.departure_time, leg.arrival_time
            ));
        }
        Ok(leg)
    }

    fn trip(&self, raw: RawJourney) -> Result<TripPlan, String> {
        let legs = raw
            .legs
            .iter()
            .enumerate()
            .map(|(index, leg)| self.leg(leg).map_err(|e| format!("leg {index}: {e}")))
            .collect::<Result<Vec<_>, _>>()?;

        let plan = TripPlan::from_legs(legs, raw.interchanges).ok_or("journey without legs")?;
        if plan.ordering_corrected {
            debug!("Re-sorted out-of-order legs");
        }
        let fare = raw.fare.as_ref().and_then(|f| fare_summary(&f.tickets));
        Ok(plan.with_fare(fare))
    }
}

/// First adult ticket with a price, else the first priced ticket
fn fare_summary(tickets: &[RawTicket]) -> Option<FareSummary> {
    let is_adult = |t: &&RawTicket| {
        t.person
            .as_deref()
            .is_some_and(|p| p.eq_ignore_ascii_case("adult"))
    };
    let priced = |t: &&RawTicket| t.price_brutto.is_some();
    let ticket = tickets
        .iter()
        .filter(priced)
        .find(is_adult)
        .or_else(|| tickets.iter().find(priced))?;

    Some(FareSummary {
        name: non_empty(ticket.name.as_ref()).unwrap_or_else(|| "Ticket".to_string()),
        price: ticket.price_brutto?,
        currency: non_empty(ticket.currency.as_ref()).unwrap_or_else(|| "EUR".to_string()),
    })
}

fn status_mentions(status: &Value, flag: &str) -> bool {
    match status {
        Value::String(s) => s.split(',').any(|part| part.trim() == flag),
        Value::Array(items) => items.iter().any(|i| i.as_str() == Some(flag)),
        _ => false,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.to_ascii_lowercase().as_str(), "true" | "1"),
        Value::Number(n) => n.as_i64() == Some(1),
        _ => false,
    }
}

/// Decode and convert every entry, dropping the ones that fail
fn normalize_list<R, T, F>(items: &[Value], what: &'static str, convert: F) -> Result<Vec<T>, EfaError>
where
    R: DeserializeOwned,
    F: Fn(R) -> Result<T, String>,
{
    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let result = serde_json::from_value::<R>(item.clone())
            .map_err(|e| e.to_string())
            .and_then(&convert);
        match result {
            Ok(record) => records.push(record),
            Err(reason) => warn!(index, kind = what, %reason, "Dropped malformed entry"),
        }
    }

    if records.is_empty() && !items.is_empty() {
        error!(count = items.len(), kind = what, "No entry could be normalized");
        return Err(EfaError::Normalization(format!(
            "none of the {} {what} entries could be normalized",
            items.len()
        )));
    }
    Ok(records)
}
