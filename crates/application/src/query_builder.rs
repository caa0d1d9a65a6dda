//! Query builder
//!
//! Turns a classified [`QueryIntent`] into a validated [`ResolvedQuery`]:
//! resolves the date phrase, disambiguates places, and rejects
//! structurally invalid combinations before any trip or departure call.

use chrono::{DateTime, Utc};
use domain::{DepArr, GeoLocation, QueryIntent, QueryType, ResolvedQuery, Stop};
use tracing::{debug, instrument};

use crate::{
    datetime_resolver::DateTimeResolver, error::ApplicationError,
    stop_disambiguator::StopDisambiguator,
};

/// Composes the resolver and the disambiguator
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    resolver: DateTimeResolver,
    disambiguator: StopDisambiguator,
}

impl QueryBuilder {
    /// Create a builder
    pub const fn new(resolver: DateTimeResolver, disambiguator: StopDisambiguator) -> Self {
        Self {
            resolver,
            disambiguator,
        }
    }

    /// Validate and resolve an intent
    ///
    /// `focus` is an optional tie-break point for ambiguous stop names.
    #[instrument(skip(self, intent, focus), fields(query_type = %intent.query_type))]
    pub async fn build(
        &self,
        intent: &QueryIntent,
        now: DateTime<Utc>,
        focus: Option<&GeoLocation>,
    ) -> Result<ResolvedQuery, ApplicationError> {
        validate(intent)?;

        let (phrase, forced_arrival) = match (&intent.date_phrase, &intent.arrival_phrase) {
            (Some(date), None) => (Some(date.as_str()), false),
            (None, Some(arrival)) => (Some(arrival.as_str()), true),
            _ => (None, false),
        };
        let time = self.resolver.resolve(phrase, now, intent.language)?;
        let dep_or_arr = if forced_arrival || intent.dep_or_arr == DepArr::Arr {
            DepArr::Arr
        } else {
            time.dep_or_arr
        };

        let (origin, destination) = match intent.query_type {
            QueryType::Trip => {
                let origin = self.disambiguate(intent.origin.as_deref(), intent, focus).await?;
                let destination = self
                    .disambiguate(intent.destination.as_deref(), intent, focus)
                    .await?;
                (origin, destination)
            },
            QueryType::Departure => {
                let place = intent.origin.as_deref().or(intent.destination.as_deref());
                let origin = self.disambiguate(place, intent, focus).await?;
                (origin, None)
            },
            QueryType::Stop => (None, None),
        };

        if let (Some(from), Some(to)) = (&origin, &destination) {
            if from.id == to.id {
                return Err(ApplicationError::Validation(format!(
                    "origin and destination resolve to the same stop '{}'",
                    from.name
                )));
            }
        }

        debug!(
            resolved_at = %time.at,
            dep_or_arr = dep_or_arr.as_param(),
            "Query resolved"
        );

        Ok(ResolvedQuery {
            query_type: intent.query_type,
            origin_text: intent.origin.clone(),
            destination_text: intent.destination.clone(),
            origin,
            destination,
            date_phrase: phrase.map(str::to_string),
            resolved_at: time.at,
            dep_or_arr,
            modes: intent.modes,
            language: intent.language,
        })
    }

    async fn disambiguate(
        &self,
        place: Option<&str>,
        intent: &QueryIntent,
        focus: Option<&GeoLocation>,
    ) -> Result<Option<Stop>, ApplicationError> {
        match place {
            Some(text) => self
                .disambiguator
                .resolve_one(text, focus, intent.language)
                .await
                .map(Some),
            None => Ok(None),
        }
    }
}

/// Structural checks that need no upstream call
fn validate(intent: &QueryIntent) -> Result<(), ApplicationError> {
    if intent.date_phrase.is_some() && intent.arrival_phrase.is_some() {
        return Err(ApplicationError::Validation(
            "both a departure and an arrival time were requested".to_string(),
        ));
    }
    if !intent.modes.any_enabled() {
        return Err(ApplicationError::Validation(
            "mode filters exclude every transport mode".to_string(),
        ));
    }
    if !intent.has_required_places() {
        let message = match intent.query_type {
            QueryType::Trip => "a trip needs both an origin and a destination",
            QueryType::Departure => "a departure board needs a stop",
            QueryType::Stop => "a stop search needs a place name",
        };
        return Err(ApplicationError::Validation(message.to_string()));
    }
    Ok(())
}
