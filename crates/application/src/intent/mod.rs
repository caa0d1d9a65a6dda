//! Intent classification - free text to `QueryIntent`
//!
//! This module is split into focused sub-modules:
//! - [`language`]: lexical language detection
//! - [`rules`]: keyword/pattern slot extraction (always available)
//! - [`llm`]: LLM-backed slot extraction
//!
//! The classifier never interprets the date/time phrase; it is passed on
//! verbatim to the query builder.

mod language;
mod llm;
mod rules;

use std::{fmt, sync::Arc};

use domain::{DepArr, Language, QueryIntent, QueryType, RawQueryText};
use tracing::{debug, instrument, warn};

pub use language::detect_language;
pub use llm::LlmExtractor;
pub use rules::RuleBasedExtractor;

use crate::{
    error::ApplicationError,
    ports::{ExtractedFields, ExtractionPort},
};

/// Classifies raw query text into a typed intent
pub struct IntentClassifier {
    rules: RuleBasedExtractor,
    /// Optional primary extractor; the rule engine fills whatever it misses
    extractor: Option<Arc<dyn ExtractionPort>>,
    default_language: Language,
}

impl fmt::Debug for IntentClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntentClassifier")
            .field("extractor", &self.extractor.as_ref().map(|e| e.name()))
            .field("default_language", &self.default_language)
            .finish()
    }
}

impl IntentClassifier {
    /// Rule-engine-only classifier
    pub const fn new(default_language: Language) -> Self {
        Self {
            rules: RuleBasedExtractor::new(default_language),
            extractor: None,
            default_language,
        }
    }

    /// Use a primary extractor (typically the LLM) in front of the rules
    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn ExtractionPort>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Classify text into an intent
    ///
    /// Fails with `ApplicationError::Parse` when no place can be found.
    #[instrument(skip(self, raw), fields(input_len = raw.text().len()))]
    pub async fn classify(&self, raw: &RawQueryText) -> Result<QueryIntent, ApplicationError> {
        let rule_fields = self.rules.extract_fields(raw);

        let fields = match &self.extractor {
            None => rule_fields,
            Some(extractor) => match extractor.extract(raw).await {
                Ok(primary) => merge(primary, rule_fields),
                Err(e) => {
                    warn!(extractor = extractor.name(), error = %e, "Extractor failed, using rule engine");
                    rule_fields
                },
            },
        };

        let query_type = decide_type(&fields).ok_or_else(|| ApplicationError::Parse {
            text: raw.text().to_string(),
        })?;

        let language = raw
            .language()
            .or(fields.language)
            .unwrap_or(self.default_language);

        let (origin, destination) = match (query_type, fields.origin, fields.destination) {
            // A single place for a board or lookup always sits in the origin slot
            (QueryType::Departure | QueryType::Stop, None, Some(place)) => (Some(place), None),
            (_, origin, destination) => (origin, destination),
        };

        let intent = QueryIntent {
            query_type,
            origin,
            destination,
            date_phrase: fields.date_phrase,
            arrival_phrase: fields.arrival_phrase,
            dep_or_arr: fields.dep_or_arr.unwrap_or(DepArr::Dep),
            modes: fields.modes.unwrap_or_default(),
            language,
        };
        debug!(intent = ?intent, "Classified query");
        Ok(intent)
    }
}

/// Fill slots the primary extractor left empty from the rule engine
///
/// The two time phrases move as a pair: mixing one extractor's departure
/// phrase with the other's arrival phrase would invent a second time.
fn merge(primary: ExtractedFields, fallback: ExtractedFields) -> ExtractedFields {
    let (date_phrase, arrival_phrase) =
        if primary.date_phrase.is_some() || primary.arrival_phrase.is_some() {
            (primary.date_phrase, primary.arrival_phrase)
        } else {
            (fallback.date_phrase, fallback.arrival_phrase)
        };
    ExtractedFields {
        query_type: primary.query_type.or(fallback.query_type),
        origin: primary.origin.or(fallback.origin),
        destination: primary.destination.or(fallback.destination),
        date_phrase,
        arrival_phrase,
        dep_or_arr: primary.dep_or_arr.or(fallback.dep_or_arr),
        modes: primary.modes.or(fallback.modes),
        language: primary.language.or(fallback.language),
    }
}

/// Accept the extracted type when the place slots support it, else fall back
///
/// Fallback: two places make a trip, one place with a time cue makes a
/// departure board, a bare place is a stop lookup.
fn decide_type(fields: &ExtractedFields) -> Option<QueryType> {
    let places = fields.place_count();
    match (fields.query_type, places) {
        (Some(QueryType::Trip), 2) | (Some(QueryType::Stop), 1..) => fields.query_type,
        (Some(QueryType::Departure), 1) => Some(QueryType::Departure),
        (_, 2) => Some(QueryType::Trip),
        (_, 1) if fields.date_phrase.is_some() || fields.arrival_phrase.is_some() => {
            Some(QueryType::Departure)
        },
        (_, 1) => Some(QueryType::Stop),
        _ => None,
    }
}
