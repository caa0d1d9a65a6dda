//! Query models flowing from raw text to a resolved request

use std::{fmt, str::FromStr};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::stop::Stop;
use crate::{
    errors::DomainError,
    value_objects::{Language, ModeFlags},
};

/// Kind of transit question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// Journey between two places
    Trip,
    /// Departure board for one stop
    Departure,
    /// Stop lookup
    Stop,
}

impl QueryType {
    /// Lowercase identifier
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trip => "trip",
            Self::Departure => "departure",
            Self::Stop => "stop",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trip" | "route" | "journey" => Ok(Self::Trip),
            "departure" | "departures" | "dm" => Ok(Self::Departure),
            "stop" | "stops" | "stop_search" => Ok(Self::Stop),
            other => Err(DomainError::validation(format!("unknown query type: {other}"))),
        }
    }
}

/// Whether a timestamp anchors the departure or the arrival
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepArr {
    /// Leave at the given time
    #[default]
    Dep,
    /// Arrive by the given time
    Arr,
}

impl DepArr {
    /// Upstream parameter value
    #[must_use]
    pub const fn as_param(&self) -> &'static str {
        match self {
            Self::Dep => "dep",
            Self::Arr => "arr",
        }
    }
}

impl FromStr for DepArr {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dep" | "departure" => Ok(Self::Dep),
            "arr" | "arrival" => Ok(Self::Arr),
            other => Err(DomainError::validation(format!("unknown dep/arr mode: {other}"))),
        }
    }
}

/// User input, optionally tagged with a detected language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawQueryText {
    text: String,
    language: Option<Language>,
}

impl RawQueryText {
    /// Wrap user input, rejecting blank text
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ValidationError` for empty input.
    pub fn new(text: impl Into<String>) -> Result<Self, DomainError> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("query text must not be empty"));
        }
        Ok(Self {
            text: trimmed.to_string(),
            language: None,
        })
    }

    /// Fix the language; later classification keeps it
    #[must_use]
    pub const fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    /// The trimmed text
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Language, once known
    #[must_use]
    pub const fn language(&self) -> Option<Language> {
        self.language
    }
}

/// Classifier output: slots extracted from text, nothing resolved yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryIntent {
    /// Detected query type
    pub query_type: QueryType,
    /// Origin or the single place of a departure/stop query
    pub origin: Option<String>,
    /// Destination of a trip
    pub destination: Option<String>,
    /// Literal date/time phrase, passed through unparsed
    pub date_phrase: Option<String>,
    /// Literal arrival phrase when the user gave a separate "arrive by" time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_phrase: Option<String>,
    /// Explicit anchor, as far as the classifier could tell
    #[serde(default)]
    pub dep_or_arr: DepArr,
    /// Transport mode filters
    #[serde(default)]
    pub modes: ModeFlags,
    /// Query language
    pub language: Language,
}

impl QueryIntent {
    /// Minimal intent for a type and language
    #[must_use]
    pub fn new(query_type: QueryType, language: Language) -> Self {
        Self {
            query_type,
            origin: None,
            destination: None,
            date_phrase: None,
            arrival_phrase: None,
            dep_or_arr: DepArr::Dep,
            modes: ModeFlags::default(),
            language,
        }
    }

    /// Set the origin
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Set the destination
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Set the date phrase
    #[must_use]
    pub fn with_date_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.date_phrase = Some(phrase.into());
        self
    }

    /// Slot shape check: trips need both places, other types need at least one
    #[must_use]
    pub fn has_required_places(&self) -> bool {
        let present = |s: &Option<String>| s.as_ref().is_some_and(|v| !v.trim().is_empty());
        match self.query_type {
            QueryType::Trip => present(&self.origin) && present(&self.destination),
            QueryType::Departure | QueryType::Stop => {
                present(&self.origin) || present(&self.destination)
            },
        }
    }
}

/// Validated intent with an absolute timestamp and resolved stops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedQuery {
    /// Query type
    pub query_type: QueryType,
    /// Origin as typed
    pub origin_text: Option<String>,
    /// Destination as typed
    pub destination_text: Option<String>,
    /// Resolved origin (or the stop of a departure query)
    pub origin: Option<Stop>,
    /// Resolved destination
    pub destination: Option<Stop>,
    /// Literal phrase the timestamp came from
    pub date_phrase: Option<String>,
    /// The single anchor timestamp, local to the transit zone
    pub resolved_at: DateTime<FixedOffset>,
    /// Whether `resolved_at` is a departure or an arrival time
    pub dep_or_arr: DepArr,
    /// Mode filters
    pub modes: ModeFlags,
    /// Language for summaries and upstream requests
    pub language: Language,
}
