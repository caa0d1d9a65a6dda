//! Text rendering of answers and errors

use application::{
    ApplicationError, QueryAnswer, summarize_departures, summarize_stops, summarize_trips,
};
use domain::Language;

/// Human-readable summary of an answer
pub fn render_answer(answer: &QueryAnswer) -> String {
    match answer {
        QueryAnswer::Trips { query, trips } => summarize_trips(&trips.value, query.language),
        QueryAnswer::Departures { query, departures } => summarize_departures(
            &departures.value,
            query.origin.as_ref().map(|s| s.name.as_str()),
            query.language,
        ),
        QueryAnswer::Stops { query, stops } => summarize_stops(stops, query.language),
    }
}

/// Message for a failed request; ambiguous stops list their candidates
pub fn render_error(error: &ApplicationError, language: Language) -> String {
    match error {
        ApplicationError::AmbiguousStop { query, candidates } => {
            let heading = match language {
                Language::De => format!("Mehrere Haltestellen passen zu \"{query}\":"),
                Language::It => format!("Più fermate corrispondono a \"{query}\":"),
                Language::En => format!("Several stops match \"{query}\":"),
            };
            format!("{heading}\n{}", summarize_stops(candidates, language))
        },
        ApplicationError::UpstreamHttp {
            retry_after_seconds: Some(seconds),
            ..
        } => format!("{error} (retry after {seconds}s)"),
        other => other.to_string(),
    }
}
