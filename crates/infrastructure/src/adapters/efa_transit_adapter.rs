//! EFA transit adapter - Implements `TransitPort` over the EFA client
//!
//! Every request goes through the response cache first. On a miss the
//! upstream call is retried with backoff, normalized into canonical records,
//! and stored under the request fingerprint.

use std::sync::Arc;

use application::{
    ApplicationError,
    ports::{DepartureQuery, Fetched, TransitPort, TripQuery},
};
use async_trait::async_trait;
use domain::{DepArr, Departure, Language, Stop, TransitTimezone, TripPlan};
use integration_efa::{
    DepartureRequest, EfaClient, EfaConfig, EfaError, EfaPayload, EfaRequest, HttpEfaClient,
    ResponseNormalizer, StopFinderRequest, TripRequest,
};
use tracing::{debug, instrument};

use crate::{
    cache::{CacheStats, CachedRecords, ResponseCache},
    retry::{RetryConfig, with_retry},
};

/// Map a transport or payload failure onto the application taxonomy
///
/// `attempts` is the number of upstream calls made before giving up.
/// Only a short message and the server back-off hint are passed on.
#[must_use]
pub fn map_efa_error(error: EfaError, attempts: u32) -> ApplicationError {
    match error {
        EfaError::ConnectionFailed(_) => ApplicationError::UpstreamHttp {
            status: 502,
            retry_after_seconds: None,
            message: "transit backend unreachable".to_string(),
        },
        EfaError::Timeout { timeout_secs } => ApplicationError::UpstreamTimeout {
            attempts,
            message: format!("no response within {timeout_secs}s"),
        },
        EfaError::Http {
            status,
            retry_after_secs,
            message,
        } => ApplicationError::UpstreamHttp {
            status,
            retry_after_seconds: retry_after_secs,
            message,
        },
        EfaError::Api {
            status,
            code,
            message,
        } => ApplicationError::UpstreamHttp {
            status,
            retry_after_seconds: None,
            message: format!("{message} ({code})"),
        },
        EfaError::Decode(_) => {
            ApplicationError::Normalization("transit backend sent an unreadable payload".to_string())
        },
        EfaError::Normalization(message) => ApplicationError::Normalization(message),
        EfaError::Configuration(message) => ApplicationError::Configuration(message),
    }
}

fn normalize(
    normalizer: ResponseNormalizer,
    payload: &EfaPayload,
) -> Result<CachedRecords, EfaError> {
    Ok(match payload {
        EfaPayload::StopFinder(p) => CachedRecords::Stops(Arc::new(normalizer.stops(p)?)),
        EfaPayload::Departures(p) => CachedRecords::Departures(Arc::new(normalizer.departures(p)?)),
        EfaPayload::Trip(p) => CachedRecords::Trips(Arc::new(normalizer.trips(p)?)),
    })
}

fn mismatched(records: &CachedRecords) -> ApplicationError {
    ApplicationError::Normalization(format!(
        "cached entry holds {} records",
        records.kind().as_str()
    ))
}

/// Adapter for the EFA backend with caching, coalescing and retries
pub struct EfaTransitAdapter {
    client: Arc<dyn EfaClient>,
    cache: ResponseCache,
    retry: RetryConfig,
    normalizer: ResponseNormalizer,
    timezone: TransitTimezone,
    max_trips: u32,
}

impl std::fmt::Debug for EfaTransitAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EfaTransitAdapter")
            .field("client", &"EfaClient")
            .field("cache", &self.cache)
            .field("retry", &self.retry)
            .field("timezone", &self.timezone)
            .field("max_trips", &self.max_trips)
            .finish()
    }
}

impl EfaTransitAdapter {
    /// Create an adapter backed by the reqwest client
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the EFA or retry settings are invalid.
    pub fn new(
        config: &EfaConfig,
        retry: RetryConfig,
        timezone: TransitTimezone,
    ) -> Result<Self, ApplicationError> {
        retry.validate().map_err(ApplicationError::Configuration)?;
        let client = HttpEfaClient::new(config).map_err(|e| map_efa_error(e, 0))?;
        Ok(Self::with_client(Arc::new(client), config, retry, timezone))
    }

    /// Create an adapter around any EFA client
    #[must_use]
    pub fn with_client(
        client: Arc<dyn EfaClient>,
        config: &EfaConfig,
        retry: RetryConfig,
        timezone: TransitTimezone,
    ) -> Self {
        Self {
            client,
            cache: ResponseCache::from_config(config),
            retry,
            normalizer: ResponseNormalizer::new(timezone),
            timezone,
            max_trips: config.max_trips,
        }
    }

    /// Cache counters
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Check if the upstream answers
    pub async fn is_healthy(&self) -> bool {
        self.client.is_healthy().await
    }

    async fn fetch(&self, request: EfaRequest) -> Result<(CachedRecords, bool), ApplicationError> {
        let key = request.fingerprint();
        let client = Arc::clone(&self.client);
        let retry = self.retry.clone();
        let normalizer = self.normalizer;

        let upstream = async move {
            let outcome = with_retry(&retry, || client.execute(&request)).await;
            let attempts = outcome.attempts;
            let payload = outcome
                .into_result()
                .map_err(|e| map_efa_error(e, attempts))?;
            debug!(
                kind = payload.kind().as_str(),
                results = payload.result_count(),
                attempts,
                "Upstream call completed"
            );
            normalize(normalizer, &payload).map_err(|e| map_efa_error(e, attempts))
        };

        self.cache.get_or_fetch(&key, upstream).await
    }
}

#[async_trait]
impl TransitPort for EfaTransitAdapter {
    #[instrument(skip(self))]
    async fn find_stops(
        &self,
        query: &str,
        language: Language,
    ) -> Result<Fetched<Vec<Stop>>, ApplicationError> {
        let request = EfaRequest::StopFinder(StopFinderRequest {
            query: query.trim().to_string(),
            language,
        });

        match self.fetch(request).await? {
            (CachedRecords::Stops(stops), from_cache) => Ok(Fetched {
                value: Arc::unwrap_or_clone(stops),
                from_cache,
            }),
            (other, _) => Err(mismatched(&other)),
        }
    }

    #[instrument(skip(self), fields(stop_id = %query.stop_id))]
    async fn fetch_departures(
        &self,
        query: &DepartureQuery,
    ) -> Result<Fetched<Vec<Departure>>, ApplicationError> {
        let request = EfaRequest::Departures(DepartureRequest {
            stop_id: query.stop_id.clone(),
            when: self.timezone.to_fixed(&query.when),
            duration_minutes: query.duration_minutes,
            limit: query.limit,
            include_realtime: query.include_delays,
            language: query.language,
        });

        match self.fetch(request).await? {
            (CachedRecords::Departures(departures), from_cache) => Ok(Fetched {
                value: Arc::unwrap_or_clone(departures),
                from_cache,
            }),
            (other, _) => Err(mismatched(&other)),
        }
    }

    #[instrument(skip(self), fields(origin = %query.origin_id, destination = %query.destination_id))]
    async fn fetch_trips(
        &self,
        query: &TripQuery,
    ) -> Result<Fetched<Vec<TripPlan>>, ApplicationError> {
        let request = EfaRequest::Trip(TripRequest {
            origin_id: query.origin_id.clone(),
            destination_id: query.destination_id.clone(),
            when: self.timezone.to_fixed(&query.when),
            arrive_by: query.dep_or_arr == DepArr::Arr,
            max_trips: self.max_trips,
            modes: query.modes,
            include_realtime: true,
            language: query.language,
        });

        match self.fetch(request).await? {
            (CachedRecords::Trips(trips), from_cache) => Ok(Fetched {
                value: Arc::unwrap_or_clone(trips),
                from_cache,
            }),
            (other, _) => Err(mismatched(&other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use integration_efa::{RequestKind, StopFinderPayload};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct ScriptedClient {
        calls: AtomicU32,
        failures: u32,
        failure: EfaError,
        body: &'static str,
    }

    impl ScriptedClient {
        fn new(body: &'static str) -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures: 0,
                failure: EfaError::ConnectionFailed(String::new()),
                body,
            }
        }

        fn failing(failure: EfaError, failures: u32) -> Self {
            Self {
                failures,
                failure,
                ..Self::new(STOPS)
            }
        }
    }

    #[async_trait]
    impl EfaClient for ScriptedClient {
        async fn execute(&self, request: &EfaRequest) -> Result<EfaPayload, EfaError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(self.failure.clone());
            }
            EfaPayload::decode(request.kind(), self.body)?.check_messages()
        }

        async fn is_healthy(&self) -> bool {
            true
        }
    }

    const STOPS: &str = r#"{"locations":[
        {"id":"66000001","name":"Bozen, Bahnhof","type":"stop","matchQuality":1000,"isBest":true,"coord":[46.4967,11.3579]}
    ]}"#;

    fn adapter(client: Arc<ScriptedClient>) -> EfaTransitAdapter {
        EfaTransitAdapter::with_client(
            client,
            &EfaConfig::for_testing(),
            RetryConfig::for_testing(),
            TransitTimezone::europe_rome(),
        )
    }

    #[test]
    fn maps_http_errors_with_retry_hint() {
        let err = map_efa_error(
            EfaError::Http {
                status: 429,
                retry_after_secs: Some(30),
                message: "Too Many Requests".to_string(),
            },
            4,
        );
        assert!(matches!(
            err,
            ApplicationError::UpstreamHttp {
                status: 429,
                retry_after_seconds: Some(30),
                ..
            }
        ));
    }

    #[test]
    fn maps_timeouts_with_attempt_count() {
        let err = map_efa_error(EfaError::Timeout { timeout_secs: 15 }, 4);
        assert!(matches!(
            err,
            ApplicationError::UpstreamTimeout { attempts: 4, .. }
        ));
    }

    #[test]
    fn hides_connection_details() {
        let err = map_efa_error(
            EfaError::ConnectionFailed("tcp connect error: 10.0.0.7:443 refused".to_string()),
            1,
        );
        assert!(!err.to_string().contains("10.0.0.7"));
        assert!(err.is_retryable());
    }

    #[test]
    fn maps_payload_failures_to_normalization() {
        assert!(matches!(
            map_efa_error(EfaError::Decode("expected value at line 1".to_string()), 1),
            ApplicationError::Normalization(_)
        ));
        assert!(matches!(
            map_efa_error(
                EfaError::Api {
                    status: 503,
                    code: "H931".to_string(),
                    message: "no data".to_string()
                },
                1
            ),
            ApplicationError::UpstreamHttp { status: 503, .. }
        ));
    }

    #[test]
    fn normalize_keeps_payload_kind() {
        let payload =
            EfaPayload::StopFinder(serde_json::from_str::<StopFinderPayload>(STOPS).unwrap());
        let records = normalize(ResponseNormalizer::default(), &payload).unwrap();
        assert_eq!(records.kind(), RequestKind::StopFinder);
    }

    #[tokio::test]
    async fn repeated_lookup_hits_cache() {
        let client = Arc::new(ScriptedClient::new(STOPS));
        let adapter = adapter(Arc::clone(&client));

        let first = adapter.find_stops("Bozen", Language::De).await.unwrap();
        let second = adapter.find_stops("Bozen", Language::De).await.unwrap();

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(first.value, second.value);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert_eq!(adapter.cache_stats().hits, 1);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let client = Arc::new(ScriptedClient::failing(
            EfaError::Http {
                status: 503,
                retry_after_secs: None,
                message: "Service Unavailable".to_string(),
            },
            2,
        ));
        let adapter = adapter(Arc::clone(&client));

        let stops = adapter.find_stops("Bozen", Language::De).await.unwrap();
        assert_eq!(stops.value.len(), 1);
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn timeouts_surface_after_budget() {
        let client = Arc::new(ScriptedClient::failing(
            EfaError::Timeout { timeout_secs: 2 },
            u32::MAX,
        ));
        let adapter = adapter(Arc::clone(&client));

        let err = adapter
            .find_stops("Bozen", Language::De)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::UpstreamTimeout { attempts: 3, .. }
        ));
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let client = Arc::new(ScriptedClient::failing(
            EfaError::Http {
                status: 404,
                retry_after_secs: None,
                message: "Not Found".to_string(),
            },
            u32::MAX,
        ));
        let adapter = adapter(Arc::clone(&client));

        let err = adapter
            .find_stops("Bozen", Language::De)
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::UpstreamHttp { status: 404, .. }));
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn departure_time_is_shifted_into_network_zone() {
        let client = Arc::new(ScriptedClient::new(r#"{"stopEvents":[]}"#));
        let adapter = adapter(Arc::clone(&client));
        let utc = FixedOffset::east_opt(0).unwrap();
        let query = DepartureQuery {
            stop_id: "66000001".to_string(),
            when: utc.with_ymd_and_hms(2024, 5, 13, 8, 15, 0).unwrap(),
            duration_minutes: Some(60),
            limit: 10,
            include_delays: true,
            language: Language::De,
        };

        let board = adapter.fetch_departures(&query).await.unwrap();
        assert!(board.value.is_empty());
        assert!(!board.from_cache);
    }
}
