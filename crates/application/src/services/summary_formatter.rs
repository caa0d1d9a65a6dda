//! Summary formatting
//!
//! Pure functions rendering canonical transit records as short text in the
//! query language.

use chrono::{DateTime, FixedOffset};
use domain::{Departure, DepartureStatus, Language, Leg, Stop, TripPlan};

/// Fixed phrases per language
struct Phrases {
    from: &'static str,
    to: &'static str,
    departures_for: &'static str,
    departures: &'static str,
    direction: &'static str,
    platform: &'static str,
    at_prefix: &'static str,
    at_suffix: &'static str,
    on_foot: &'static str,
    with: &'static str,
    stops_found: &'static str,
    arrival: &'static str,
    departure: &'static str,
    transfers: &'static str,
    minutes: &'static str,
    cancelled: &'static str,
    no_trips: &'static str,
    no_departures: &'static str,
    no_stops: &'static str,
}

const DE: Phrases = Phrases {
    from: "Von",
    to: "Nach",
    departures_for: "Abfahrten",
    departures: "Abfahrten:",
    direction: "Richtung",
    platform: "Steig",
    at_prefix: "um",
    at_suffix: " Uhr",
    on_foot: "zu Fuß",
    with: "mit",
    stops_found: "Gefundene Haltestellen:",
    arrival: "An:",
    departure: "Ab:",
    transfers: "Umstiege",
    minutes: "Min.",
    cancelled: "fällt aus",
    no_trips: "Keine Verbindungen gefunden.",
    no_departures: "Keine Abfahrten gefunden.",
    no_stops: "Keine Haltestellen gefunden.",
};

const EN: Phrases = Phrases {
    from: "From",
    to: "To",
    departures_for: "Departures",
    departures: "Departures:",
    direction: "Direction",
    platform: "Platform",
    at_prefix: "at",
    at_suffix: "",
    on_foot: "on foot",
    with: "with",
    stops_found: "Stops found:",
    arrival: "Arr:",
    departure: "Dep:",
    transfers: "transfers",
    minutes: "min",
    cancelled: "cancelled",
    no_trips: "No trips found.",
    no_departures: "No departures found.",
    no_stops: "No stops found.",
};

const IT: Phrases = Phrases {
    from: "Da",
    to: "A",
    departures_for: "Partenze",
    departures: "Partenze:",
    direction: "Direzione",
    platform: "Banchina",
    at_prefix: "alle",
    at_suffix: "",
    on_foot: "a piedi",
    with: "con",
    stops_found: "Fermate trovate:",
    arrival: "Arrivo:",
    departure: "Partenza:",
    transfers: "cambi",
    minutes: "min",
    cancelled: "soppresso",
    no_trips: "Nessun collegamento trovato.",
    no_departures: "Nessuna partenza trovata.",
    no_stops: "Nessuna fermata trovata.",
};

const fn phrases(language: Language) -> &'static Phrases {
    match language {
        Language::De => &DE,
        Language::En => &EN,
        Language::It => &IT,
    }
}

fn clock(time: &DateTime<FixedOffset>) -> String {
    time.format("%H:%M").to_string()
}

fn at(p: &Phrases, time: &DateTime<FixedOffset>) -> String {
    format!("{} {}{}", p.at_prefix, clock(time), p.at_suffix)
}

fn leg_means(p: &Phrases, leg: &Leg) -> String {
    if leg.is_footpath {
        return p.on_foot.to_string();
    }
    let mut means = format!("{} {}", p.with, leg.service);
    if let Some(direction) = leg.direction.as_deref().filter(|d| !d.is_empty()) {
        means.push_str(&format!(" {} {direction}", p.direction));
    }
    means
}

// ── Trips ───────────────────────────────────────────────────────

/// Summarize one itinerary
#[must_use]
pub fn summarize_trip(trip: &TripPlan, language: Language) -> String {
    let p = phrases(language);
    let (Some(first), Some(last)) = (trip.legs.first(), trip.legs.last()) else {
        return p.no_trips.to_string();
    };

    let mut lines = vec![
        format!(
            "{}: {} {} {}",
            p.from,
            first.origin.name,
            at(p, &trip.departure_time),
            leg_means(p, first)
        ),
        format!("{}: {} {}", p.to, last.destination.name, at(p, &trip.arrival_time)),
        format!(
            "{} {}, {} {}",
            trip.duration_minutes, p.minutes, trip.transfers, p.transfers
        ),
    ];

    for leg in &trip.legs {
        lines.push(String::new());
        let mut dep_line = format!(
            "{} {} {} {}",
            p.departure,
            leg.origin.name,
            at(p, &leg.departure_time),
            leg_means(p, leg)
        );
        if let Some(platform) = &leg.platform {
            dep_line.push_str(&format!(" ({} {platform})", p.platform));
        }
        if let Some(delay) = leg.delay_minutes.filter(|d| *d != 0) {
            dep_line.push_str(&format!(" {delay:+}"));
        }
        lines.push(dep_line);
        lines.push(format!(
            "{} {} {}",
            p.arrival,
            leg.destination.name,
            at(p, &leg.arrival_time)
        ));
    }

    if let Some(fare) = &trip.fare_summary {
        lines.push(String::new());
        lines.push(format!("{}: {:.2} {}", fare.name, fare.price, fare.currency));
    }

    lines.join("\n")
}

/// Summarize every itinerary, blank-line separated
#[must_use]
pub fn summarize_trips(trips: &[TripPlan], language: Language) -> String {
    if trips.is_empty() {
        return phrases(language).no_trips.to_string();
    }
    trips
        .iter()
        .map(|trip| summarize_trip(trip, language))
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ── Departures ──────────────────────────────────────────────────

/// Summarize a departure board
#[must_use]
pub fn summarize_departures(
    departures: &[Departure],
    stop_name: Option<&str>,
    language: Language,
) -> String {
    let p = phrases(language);
    if departures.is_empty() {
        return p.no_departures.to_string();
    }

    let header = match stop_name.filter(|s| !s.is_empty()) {
        Some(name) => format!("{} {name}:", p.departures_for),
        None => p.departures.to_string(),
    };
    let mut lines = vec![header];

    for departure in departures {
        let mut parts = Vec::new();
        let predicted = clock(&departure.predicted_time);
        if departure.delay_minutes == 0 {
            parts.push(predicted);
        } else {
            parts.push(format!(
                "{predicted} ({} {:+})",
                clock(&departure.scheduled_time),
                departure.delay_minutes
            ));
        }
        if !departure.line.is_empty() {
            parts.push(departure.line.clone());
        }
        if !departure.destination.is_empty() {
            parts.push(format!("{} {}", p.direction, departure.destination));
        }
        if let Some(platform) = &departure.platform {
            parts.push(format!("{} {platform}", p.platform));
        }
        if departure.status == DepartureStatus::Cancelled {
            parts.push(format!("[{}]", p.cancelled));
        }
        lines.push(parts.join(" "));
    }

    lines.join("\n")
}

// ── Stops ───────────────────────────────────────────────────────

/// Summarize ranked stop candidates, marking the best one
#[must_use]
pub fn summarize_stops(stops: &[Stop], language: Language) -> String {
    let p = phrases(language);
    if stops.is_empty() {
        return p.no_stops.to_string();
    }

    let top = stops
        .iter()
        .enumerate()
        .max_by_key(|(idx, s)| (s.is_best, s.quality(), std::cmp::Reverse(*idx)))
        .map(|(idx, _)| idx);

    let mut lines = vec![p.stops_found.to_string()];
    for (idx, stop) in stops.iter().enumerate() {
        let mut entry = stop.name.clone();
        if let Some(municipality) = stop.municipality.as_deref().filter(|m| !stop.name.contains(*m)) {
            entry.push_str(&format!(", {municipality}"));
        }
        entry.push_str(&format!(" [{}]", stop.id));
        if Some(idx) == top {
            lines.push(format!("[TOP] {entry}"));
        } else {
            lines.push(entry);
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use domain::{FareSummary, TransitMode};

    use super::*;

    fn t(h: u32, m: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 13, h, m, 0)
            .unwrap()
    }

    fn stop(id: &str, name: &str) -> Stop {
        Stop::new(id, name).unwrap()
    }

    fn leg(from: &str, to: &str, dep: (u32, u32), arr: (u32, u32), footpath: bool) -> Leg {
        Leg {
            mode: if footpath { TransitMode::Other } else { TransitMode::Train },
            service: "R 123".to_string(),
            direction: Some("Brenner".to_string()),
            origin: stop("1", from),
            destination: stop("2", to),
            departure_time: t(dep.0, dep.1),
            arrival_time: t(arr.0, arr.1),
            scheduled_departure: t(dep.0, dep.1),
            scheduled_arrival: t(arr.0, arr.1),
            platform: Some("3".to_string()),
            real_time: false,
            is_footpath: footpath,
            delay_minutes: None,
        }
    }

    fn departure(delay: i64, status: DepartureStatus) -> Departure {
        Departure {
            service_id: "s1".to_string(),
            service_name: "Bus 201".to_string(),
            line: "201".to_string(),
            mode: TransitMode::Bus,
            destination: "Meran".to_string(),
            scheduled_time: t(14, 30),
            predicted_time: t(14, 30) + chrono::Duration::minutes(delay),
            delay_minutes: delay,
            platform: Some("B".to_string()),
            status,
            real_time: true,
            operator: None,
            notices: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn trip_summary_in_german() {
        let trip = TripPlan::from_legs(
            vec![
                leg("Bozen", "Bozen Bahnhof", (14, 20), (14, 25), true),
                leg("Bozen Bahnhof", "Meran", (14, 30), (15, 10), false),
            ],
            None,
        )
        .unwrap()
        .with_fare(Some(FareSummary {
            name: "Einzelfahrt".to_string(),
            price: 4.5,
            currency: "EUR".to_string(),
        }));
        let text = summarize_trip(&trip, Language::De);

        assert!(text.starts_with("Von: Bozen um 14:20 Uhr zu Fuß"));
        assert!(text.contains("Nach: Meran um 15:10 Uhr"));
        assert!(text.contains("Ab: Bozen Bahnhof um 14:30 Uhr mit R 123 Richtung Brenner (Steig 3)"));
        assert!(text.contains("Einzelfahrt: 4.50 EUR"));
    }

    #[test]
    fn trip_summary_in_italian_and_english() {
        let trip =
            TripPlan::from_legs(vec![leg("Bolzano", "Merano", (9, 0), (9, 40), false)], None)
                .unwrap();
        assert!(summarize_trip(&trip, Language::It).starts_with("Da: Bolzano alle 09:00 con R 123"));
        assert!(summarize_trip(&trip, Language::En).contains("To: Merano at 09:40"));
    }

    #[test]
    fn departures_show_delay_and_cancellation() {
        let board = vec![
            departure(0, DepartureStatus::OnTime),
            departure(5, DepartureStatus::Delayed),
            departure(0, DepartureStatus::Cancelled),
        ];
        let text = summarize_departures(&board, Some("Neumarkt"), Language::En);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Departures Neumarkt:");
        assert_eq!(lines[1], "14:30 201 Direction Meran Platform B");
        assert_eq!(lines[2], "14:35 (14:30 +5) 201 Direction Meran Platform B");
        assert!(lines[3].ends_with("[cancelled]"));
    }

    #[test]
    fn empty_results_have_language_specific_text() {
        assert_eq!(summarize_departures(&[], None, Language::It), "Nessuna partenza trovata.");
        assert_eq!(summarize_stops(&[], Language::De), "Keine Haltestellen gefunden.");
        assert_eq!(summarize_trips(&[], Language::En), "No trips found.");
    }

    #[test]
    fn several_trips_are_separated_by_blank_line() {
        let trip =
            TripPlan::from_legs(vec![leg("Bolzano", "Merano", (9, 0), (9, 40), false)], None)
                .unwrap();
        let text = summarize_trips(&[trip.clone(), trip], Language::En);
        assert_eq!(text.matches("From: Bolzano").count(), 2);
        assert!(text.contains("\n\nFrom: Bolzano"));
    }

    #[test]
    fn stops_mark_best_candidate() {
        let stops = vec![
            stop("1", "Meran Bahnhof").with_match_quality(900),
            stop("2", "Meran Rennweg").with_match_quality(950).with_municipality("Meran"),
        ];
        let text = summarize_stops(&stops, Language::De);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Gefundene Haltestellen:");
        assert_eq!(lines[1], "Meran Bahnhof [1]");
        assert_eq!(lines[2], "[TOP] Meran Rennweg [2]");
    }
}
