//! Transit query service
//!
//! The entry points exposed to hosting layers: resolve a free-text query,
//! fetch departure boards and trips, and search stops.

use std::{fmt, str::FromStr, sync::Arc};

use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use domain::{
    Departure, GeoLocation, Language, QueryType, RawQueryText, ResolvedQuery, Stop,
    TransitTimezone, TripPlan,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{
    datetime_resolver::DateTimeResolver,
    error::ApplicationError,
    intent::IntentClassifier,
    ports::{ClockPort, DepartureQuery, ExtractionPort, Fetched, TransitPort, TripQuery},
    query_builder::QueryBuilder,
    stop_disambiguator::StopDisambiguator,
};

/// Query resolution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// IANA zone of the transit system
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Stop candidates returned by default
    #[serde(default = "default_stop_limit")]
    pub default_stop_limit: usize,

    /// Quality (0..=1000) from which a stop match counts as confident
    #[serde(default = "default_ambiguity_threshold")]
    pub ambiguity_threshold: u32,

    /// Departure board entries returned by default
    #[serde(default = "default_departure_limit")]
    pub default_departure_limit: u32,

    /// Departure board window in minutes
    #[serde(default = "default_departure_window")]
    pub default_departure_window_minutes: u32,

    /// Language when neither a hint nor detection decides
    #[serde(default)]
    pub default_language: Language,
}

fn default_timezone() -> String {
    "Europe/Rome".to_string()
}

const fn default_stop_limit() -> usize {
    10
}

const fn default_ambiguity_threshold() -> u32 {
    900
}

const fn default_departure_limit() -> u32 {
    10
}

const fn default_departure_window() -> u32 {
    60
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            default_stop_limit: default_stop_limit(),
            ambiguity_threshold: default_ambiguity_threshold(),
            default_departure_limit: default_departure_limit(),
            default_departure_window_minutes: default_departure_window(),
            default_language: Language::default(),
        }
    }
}

impl QueryConfig {
    /// Small limits for tests
    pub fn for_testing() -> Self {
        Self {
            default_stop_limit: 5,
            default_departure_limit: 5,
            ..Self::default()
        }
    }

    /// Check the settings
    pub fn validate(&self) -> Result<(), String> {
        Tz::from_str(&self.timezone).map_err(|_| format!("unknown timezone '{}'", self.timezone))?;
        if self.default_stop_limit == 0 {
            return Err("default_stop_limit must be greater than zero".to_string());
        }
        if self.ambiguity_threshold > 1000 {
            return Err("ambiguity_threshold must be within 0..=1000".to_string());
        }
        if self.default_departure_limit == 0 {
            return Err("default_departure_limit must be greater than zero".to_string());
        }
        if self.default_departure_window_minutes == 0 {
            return Err("default_departure_window_minutes must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Parsed transit zone
    pub fn transit_timezone(&self) -> Result<TransitTimezone, ApplicationError> {
        Tz::from_str(&self.timezone)
            .map(TransitTimezone::new)
            .map_err(|_| ApplicationError::Configuration(format!("unknown timezone '{}'", self.timezone)))
    }
}

/// Outcome of answering a free-text query end to end
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryAnswer {
    /// Itineraries for a trip intent
    Trips {
        /// The validated query
        query: ResolvedQuery,
        /// Trip candidates
        trips: Fetched<Vec<TripPlan>>,
    },
    /// A departure board
    Departures {
        /// The validated query
        query: ResolvedQuery,
        /// Board entries
        departures: Fetched<Vec<Departure>>,
    },
    /// Stop candidates
    Stops {
        /// The validated query
        query: ResolvedQuery,
        /// Ranked candidates
        stops: Vec<Stop>,
    },
}

/// Orchestrates classification, resolution and upstream calls
pub struct TransitQueryService {
    classifier: IntentClassifier,
    builder: QueryBuilder,
    disambiguator: StopDisambiguator,
    transit: Arc<dyn TransitPort>,
    clock: Arc<dyn ClockPort>,
    config: QueryConfig,
}

impl fmt::Debug for TransitQueryService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitQueryService")
            .field("classifier", &self.classifier)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TransitQueryService {
    /// Create the service with the rule engine as the only extractor
    pub fn new(
        transit: Arc<dyn TransitPort>,
        clock: Arc<dyn ClockPort>,
        config: QueryConfig,
    ) -> Result<Self, ApplicationError> {
        config.validate().map_err(ApplicationError::Configuration)?;
        let resolver = DateTimeResolver::new(config.transit_timezone()?);
        let disambiguator = StopDisambiguator::new(Arc::clone(&transit))
            .with_default_limit(config.default_stop_limit)
            .with_ambiguity_threshold(config.ambiguity_threshold);

        Ok(Self {
            classifier: IntentClassifier::new(config.default_language),
            builder: QueryBuilder::new(resolver, disambiguator.clone()),
            disambiguator,
            transit,
            clock,
            config,
        })
    }

    /// Add an extraction capability consulted before the rule engine
    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn ExtractionPort>) -> Self {
        self.classifier = self.classifier.with_extractor(extractor);
        self
    }

    /// Active settings
    pub const fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Classify, resolve the time and disambiguate places
    pub async fn resolve_query(
        &self,
        text: &str,
        language_hint: Option<Language>,
    ) -> Result<ResolvedQuery, ApplicationError> {
        self.resolve_query_with_focus(text, language_hint, None).await
    }

    /// Like [`Self::resolve_query`], with a tie-break point for ambiguous stops
    #[instrument(skip(self, text, focus), fields(text_len = text.len()))]
    pub async fn resolve_query_with_focus(
        &self,
        text: &str,
        language_hint: Option<Language>,
        focus: Option<&GeoLocation>,
    ) -> Result<ResolvedQuery, ApplicationError> {
        let mut raw = RawQueryText::new(text)?;
        if let Some(language) = language_hint {
            raw = raw.with_language(language);
        }
        let intent = self.classifier.classify(&raw).await?;
        debug!(
            query_type = %intent.query_type,
            language = %intent.language,
            "Intent classified"
        );
        self.builder.build(&intent, self.clock.now(), focus).await
    }

    /// Departure board for a stop id
    ///
    /// `when` defaults to now, `limit` to the configured board size and
    /// `language` to the configured default.
    #[instrument(skip(self))]
    pub async fn fetch_departures(
        &self,
        stop_id: &str,
        when: Option<DateTime<FixedOffset>>,
        duration_minutes: Option<u32>,
        limit: Option<u32>,
        include_delays: bool,
        language: Option<Language>,
    ) -> Result<Fetched<Vec<Departure>>, ApplicationError> {
        let stop_id = stop_id.trim();
        if stop_id.is_empty() {
            return Err(ApplicationError::Validation("stop id must not be empty".to_string()));
        }
        let limit = limit.unwrap_or(self.config.default_departure_limit);
        if limit == 0 {
            return Err(ApplicationError::Validation("limit must be greater than zero".to_string()));
        }
        if duration_minutes == Some(0) {
            return Err(ApplicationError::Validation(
                "duration must be greater than zero".to_string(),
            ));
        }

        let timezone = self.config.transit_timezone()?;
        let query = DepartureQuery {
            stop_id: stop_id.to_string(),
            when: when.unwrap_or_else(|| timezone.to_fixed(&self.clock.now())),
            duration_minutes,
            limit,
            include_delays,
            language: language.unwrap_or(self.config.default_language),
        };
        let fetched = self.transit.fetch_departures(&query).await?;
        info!(
            count = fetched.value.len(),
            from_cache = fetched.from_cache,
            "Departures fetched"
        );
        Ok(fetched)
    }

    /// Itineraries for a resolved trip query
    #[instrument(skip(self, query), fields(query_type = %query.query_type))]
    pub async fn fetch_trip(
        &self,
        query: &ResolvedQuery,
    ) -> Result<Fetched<Vec<TripPlan>>, ApplicationError> {
        if query.query_type != QueryType::Trip {
            return Err(ApplicationError::Validation(format!(
                "expected a trip query, got '{}'",
                query.query_type
            )));
        }
        let (Some(origin), Some(destination)) = (&query.origin, &query.destination) else {
            return Err(ApplicationError::Validation(
                "a trip needs a resolved origin and destination".to_string(),
            ));
        };
        if !query.modes.any_enabled() {
            return Err(ApplicationError::Validation(
                "mode filters exclude every transport mode".to_string(),
            ));
        }

        let trip = TripQuery {
            origin_id: origin.id.clone(),
            destination_id: destination.id.clone(),
            when: query.resolved_at,
            dep_or_arr: query.dep_or_arr,
            modes: query.modes,
            language: query.language,
        };
        let fetched = self.transit.fetch_trips(&trip).await?;
        info!(
            count = fetched.value.len(),
            from_cache = fetched.from_cache,
            "Trips fetched"
        );
        Ok(fetched)
    }

    /// Ranked stop candidates; empty when nothing matches
    #[instrument(skip(self, focus))]
    pub async fn find_stops(
        &self,
        query: &str,
        limit: Option<usize>,
        focus: Option<&GeoLocation>,
    ) -> Result<Vec<Stop>, ApplicationError> {
        let language = crate::intent::detect_language(query, self.config.default_language);
        self.disambiguator.find_stops(query, limit, focus, language).await
    }

    /// Resolve a free-text query and run the matching upstream call
    #[instrument(skip(self, text, focus), fields(text_len = text.len()))]
    pub async fn answer(
        &self,
        text: &str,
        language_hint: Option<Language>,
        focus: Option<&GeoLocation>,
    ) -> Result<QueryAnswer, ApplicationError> {
        let query = self.resolve_query_with_focus(text, language_hint, focus).await?;
        match query.query_type {
            QueryType::Trip => {
                let trips = self.fetch_trip(&query).await?;
                Ok(QueryAnswer::Trips { query, trips })
            },
            QueryType::Departure => {
                let stop_id = query
                    .origin
                    .as_ref()
                    .map(|s| s.id.clone())
                    .ok_or_else(|| ApplicationError::Validation("no stop resolved".to_string()))?;
                let departures = self
                    .fetch_departures(
                        &stop_id,
                        Some(query.resolved_at),
                        Some(self.config.default_departure_window_minutes),
                        None,
                        true,
                        Some(query.language),
                    )
                    .await?;
                Ok(QueryAnswer::Departures { query, departures })
            },
            QueryType::Stop => {
                let place = query
                    .origin_text
                    .clone()
                    .or_else(|| query.destination_text.clone())
                    .unwrap_or_default();
                let stops = self
                    .disambiguator
                    .find_stops(&place, None, focus, query.language)
                    .await?;
                Ok(QueryAnswer::Stops { query, stops })
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use domain::{DepArr, Leg, TransitMode};

    use super::*;
    use crate::ports::{MockClockPort, MockTransitPort};

    fn stop(id: &str, name: &str, quality: u32) -> Stop {
        Stop::new(id, name).unwrap().with_match_quality(quality)
    }

    fn clock() -> Arc<MockClockPort> {
        let mut clock = MockClockPort::new();
        clock
            .expect_now()
            .returning(|| Utc.with_ymd_and_hms(2024, 5, 13, 8, 15, 0).unwrap());
        Arc::new(clock)
    }

    fn lookup(mock: &mut MockTransitPort) {
        mock.expect_find_stops().returning(|query, _| {
            let found = match query {
                "Bozen" => vec![stop("66002000", "Bozen", 1000)],
                "Meran" => vec![
                    stop("1", "Meran Bahnhof", 950),
                    stop("2", "Meran Theaterplatz", 950),
                    stop("3", "Meran Rennweg", 950),
                ],
                "Neumarkt Busbahnhof" => vec![stop("66001234", "Neumarkt Busbahnhof", 1000)],
                "Brixen" => vec![stop("66003000", "Brixen", 1000)],
                _ => Vec::new(),
            };
            Ok(Fetched::fresh(found))
        });
    }

    fn service(mock: MockTransitPort) -> TransitQueryService {
        TransitQueryService::new(Arc::new(mock), clock(), QueryConfig::default()).unwrap()
    }

    fn sample_trip() -> TripPlan {
        let tz = TransitTimezone::europe_rome();
        let dep = tz.to_fixed(&Utc.with_ymd_and_hms(2024, 5, 13, 12, 30, 0).unwrap());
        let arr = tz.to_fixed(&Utc.with_ymd_and_hms(2024, 5, 13, 13, 10, 0).unwrap());
        let leg = Leg {
            mode: TransitMode::Train,
            service: "R".to_string(),
            direction: Some("Brixen".to_string()),
            origin: stop("66002000", "Bozen", 1000),
            destination: stop("66003000", "Brixen", 1000),
            departure_time: dep,
            arrival_time: arr,
            scheduled_departure: dep,
            scheduled_arrival: arr,
            platform: None,
            real_time: false,
            is_footpath: false,
            delay_minutes: None,
        };
        TripPlan::from_legs(vec![leg], None).unwrap()
    }

    #[test]
    fn default_config_is_valid() {
        assert!(QueryConfig::default().validate().is_ok());
        assert!(QueryConfig::for_testing().validate().is_ok());
    }

    #[test]
    fn unknown_timezone_rejected() {
        let config = QueryConfig {
            timezone: "Mars/Olympus".to_string(),
            ..QueryConfig::default()
        };
        assert!(config.validate().is_err());
        let err = TransitQueryService::new(Arc::new(MockTransitPort::new()), clock(), config)
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Configuration(_)));
    }

    #[test]
    fn config_defaults_from_empty_toml() {
        let config: QueryConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, QueryConfig::default());
        assert_eq!(config.ambiguity_threshold, 900);
    }

    #[tokio::test]
    async fn resolve_trip_query() {
        let mut mock = MockTransitPort::new();
        lookup(&mut mock);
        let svc = service(mock);

        let resolved = svc
            .resolve_query("Wie komme ich von Bozen nach Brixen um 14:30?", None)
            .await
            .unwrap();
        assert_eq!(resolved.query_type, QueryType::Trip);
        assert_eq!(resolved.origin.unwrap().id, "66002000");
        assert_eq!(resolved.destination.unwrap().id, "66003000");
        assert_eq!(resolved.resolved_at.to_rfc3339(), "2024-05-13T14:30:00+02:00");
        assert_eq!(resolved.language, Language::De);
    }

    #[tokio::test]
    async fn ambiguous_meran_carries_all_three_candidates() {
        let mut mock = MockTransitPort::new();
        lookup(&mut mock);
        let svc = service(mock);

        let err = svc.resolve_query("Bozen-Meran", None).await.unwrap_err();
        match err {
            ApplicationError::AmbiguousStop { query, candidates } => {
                assert_eq!(query, "Meran");
                assert_eq!(candidates.len(), 3);
            },
            other => panic!("expected AmbiguousStop, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unclassifiable_text_is_parse_error() {
        let svc = service(MockTransitPort::new());
        let err = svc.resolve_query("???", None).await.unwrap_err();
        assert!(err.is_user_error());
    }

    #[tokio::test]
    async fn empty_text_is_validation_error() {
        let svc = service(MockTransitPort::new());
        let err = svc.resolve_query("   ", None).await.unwrap_err();
        assert!(matches!(err, ApplicationError::Validation(_)));
    }

    #[tokio::test]
    async fn fetch_departures_applies_defaults() {
        let mut mock = MockTransitPort::new();
        mock.expect_fetch_departures()
            .withf(|q| {
                q.stop_id == "66001234"
                    && q.limit == 10
                    && q.include_delays
                    && q.when.to_rfc3339() == "2024-05-13T10:15:00+02:00"
            })
            .times(1)
            .returning(|_| Ok(Fetched::fresh(Vec::new())));
        let svc = service(mock);

        let fetched = svc
            .fetch_departures(" 66001234 ", None, None, None, true, None)
            .await
            .unwrap();
        assert!(fetched.value.is_empty());
        assert!(!fetched.from_cache);
    }

    #[tokio::test]
    async fn fetch_departures_rejects_bad_input_without_upstream_call() {
        let mut mock = MockTransitPort::new();
        mock.expect_fetch_departures().never();
        let svc = service(mock);

        assert!(svc.fetch_departures("", None, None, None, true, None).await.is_err());
        assert!(svc.fetch_departures("1", None, None, Some(0), true, None).await.is_err());
        assert!(svc.fetch_departures("1", None, Some(0), None, true, None).await.is_err());
    }

    #[tokio::test]
    async fn fetch_trip_passes_resolved_parameters() {
        let mut mock = MockTransitPort::new();
        lookup(&mut mock);
        mock.expect_fetch_trips()
            .withf(|q| {
                q.origin_id == "66002000"
                    && q.destination_id == "66003000"
                    && q.dep_or_arr == DepArr::Arr
                    && q.language == Language::En
            })
            .times(1)
            .returning(|_| Ok(Fetched::fresh(vec![sample_trip()])));
        let svc = service(mock);

        let resolved = svc
            .resolve_query("from Bozen to Brixen by 9:00", None)
            .await
            .unwrap();
        let trips = svc.fetch_trip(&resolved).await.unwrap();
        assert_eq!(trips.value.len(), 1);
        assert_eq!(trips.value[0].duration_minutes, 40);
    }

    #[tokio::test]
    async fn fetch_trip_rejects_departure_query() {
        let mut mock = MockTransitPort::new();
        lookup(&mut mock);
        mock.expect_fetch_trips().never();
        let svc = service(mock);

        let resolved = svc
            .resolve_query("Abfahrten Neumarkt Busbahnhof", None)
            .await
            .unwrap();
        let err = svc.fetch_trip(&resolved).await.unwrap_err();
        assert!(matches!(err, ApplicationError::Validation(_)));
    }

    #[tokio::test]
    async fn answer_departure_intent_fetches_board() {
        let mut mock = MockTransitPort::new();
        lookup(&mut mock);
        mock.expect_fetch_departures()
            .withf(|q| q.stop_id == "66001234" && q.duration_minutes == Some(60))
            .times(1)
            .returning(|_| Ok(Fetched::cached(Vec::new())));
        let svc = service(mock);

        let answer = svc
            .answer("Abfahrten Neumarkt Busbahnhof", None, None)
            .await
            .unwrap();
        match answer {
            QueryAnswer::Departures { query, departures } => {
                assert_eq!(query.origin.unwrap().id, "66001234");
                assert!(departures.from_cache);
            },
            other => panic!("expected departures, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn departure_board_uses_query_language() {
        let mut mock = MockTransitPort::new();
        lookup(&mut mock);
        mock.expect_fetch_departures()
            .withf(|q| q.stop_id == "66001234" && q.language == Language::It)
            .times(1)
            .returning(|_| Ok(Fetched::fresh(Vec::new())));
        let svc = service(mock);

        let answer = svc
            .answer("Partenze da Neumarkt Busbahnhof", Some(Language::It), None)
            .await
            .unwrap();
        assert!(matches!(answer, QueryAnswer::Departures { .. }));
    }

    #[tokio::test]
    async fn find_stops_returns_ranked_candidates() {
        let mut mock = MockTransitPort::new();
        lookup(&mut mock);
        let svc = service(mock);

        let stops = svc.find_stops("Meran", Some(2), None).await.unwrap();
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].name, "Meran Bahnhof");
    }
}
