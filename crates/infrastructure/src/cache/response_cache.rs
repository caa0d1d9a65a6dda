//! Moka-backed response cache with request coalescing
//!
//! Entries are keyed by request fingerprint and expire after a TTL chosen by
//! request kind. Concurrent lookups for the same fingerprint share a single
//! upstream fetch; only the caller that drove the fetch sees a fresh value.
//! The fetch runs on its own task and stays registered until it lands, so
//! waiters keep joining it even after the caller that started it is gone.

use std::{
    collections::HashMap,
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use application::ApplicationError;
use domain::{Departure, Stop, TripPlan};
use futures::future::{BoxFuture, FutureExt, Shared};
use integration_efa::{EfaConfig, RequestKind};
use moka::{Expiry, future::Cache};
use parking_lot::Mutex;
use tracing::{debug, error};

/// Normalized records stored under one fingerprint
#[derive(Debug, Clone)]
pub enum CachedRecords {
    /// Stop finder result
    Stops(Arc<Vec<Stop>>),
    /// Departure board
    Departures(Arc<Vec<Departure>>),
    /// Trip plans
    Trips(Arc<Vec<TripPlan>>),
}

impl CachedRecords {
    /// Request kind the records answer
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        match self {
            Self::Stops(_) => RequestKind::StopFinder,
            Self::Departures(_) => RequestKind::Departures,
            Self::Trips(_) => RequestKind::Trip,
        }
    }
}

/// Time-to-live per request kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    /// Stop finder results
    pub stops: Duration,
    /// Departure boards
    pub departures: Duration,
    /// Trip plans
    pub trips: Duration,
}

impl CacheTtls {
    /// TTLs from the EFA configuration
    #[must_use]
    pub const fn from_config(config: &EfaConfig) -> Self {
        Self {
            stops: Duration::from_secs(config.stop_cache_ttl_secs),
            departures: Duration::from_secs(config.departure_cache_ttl_secs),
            trips: Duration::from_secs(config.trip_cache_ttl_secs),
        }
    }

    const fn for_kind(&self, kind: RequestKind) -> Duration {
        match kind {
            RequestKind::StopFinder => self.stops,
            RequestKind::Departures => self.departures,
            RequestKind::Trip => self.trips,
        }
    }
}

struct KindExpiry(CacheTtls);

impl Expiry<String, CachedRecords> for KindExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedRecords,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(self.0.for_kind(value.kind()))
    }
}

/// Hit and miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered without an upstream call
    pub hits: u64,
    /// Lookups that drove an upstream call
    pub misses: u64,
    /// Approximate live entries
    pub entries: u64,
}

type SharedFetch = Shared<BoxFuture<'static, Result<CachedRecords, ApplicationError>>>;

/// Upstream fetches that have not landed yet, by fingerprint
type InFlight = Arc<Mutex<HashMap<String, SharedFetch>>>;

/// Unregisters a fetch when its task ends, after any result was cached
struct Landing {
    in_flight: InFlight,
    key: String,
}

impl Drop for Landing {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.key);
    }
}

/// Fingerprint-keyed cache of normalized upstream responses
pub struct ResponseCache {
    cache: Cache<String, CachedRecords>,
    in_flight: InFlight,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.cache.entry_count())
            .field("in_flight", &self.in_flight.lock().len())
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}

impl ResponseCache {
    /// Create a cache bounded to `max_entries`
    #[must_use]
    pub fn new(max_entries: u64, ttls: CacheTtls) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(KindExpiry(ttls))
            .build();

        Self {
            cache,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Create a cache sized and timed from the EFA configuration
    #[must_use]
    pub fn from_config(config: &EfaConfig) -> Self {
        Self::new(config.cache_max_entries, CacheTtls::from_config(config))
    }

    /// Return the cached records for `key`, or run `fetch` once to fill it
    ///
    /// The second element is `true` when the value did not come from this
    /// caller's own fetch. `fetch` runs on a spawned task, so a caller that
    /// gives up does not cancel a fetch other callers are waiting on.
    /// Failures are returned to every waiting caller and never cached.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `fetch`.
    pub async fn get_or_fetch<Fut>(
        &self,
        key: &str,
        fetch: Fut,
    ) -> Result<(CachedRecords, bool), ApplicationError>
    where
        Fut: Future<Output = Result<CachedRecords, ApplicationError>> + Send + 'static,
    {
        let mut fetch = Some(fetch);
        let (flight, started) = loop {
            if let Some(records) = self.cache.get(key).await {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Cache hit");
                return Ok((records, true));
            }

            let mut in_flight = self.in_flight.lock();
            if let Some(flight) = in_flight.get(key) {
                break (flight.clone(), false);
            }
            // A fetch may have landed between the lookup and the lock
            if self.cache.contains_key(key) {
                continue;
            }
            let Some(fetch) = fetch.take() else {
                continue;
            };
            let flight = self.spawn_fetch(key, fetch);
            in_flight.insert(key.to_string(), flight.clone());
            break (flight, true);
        };

        if started {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache miss");
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Joined in-flight fetch");
        }

        let records = flight.await?;
        Ok((records, !started))
    }

    fn spawn_fetch<Fut>(&self, key: &str, fetch: Fut) -> SharedFetch
    where
        Fut: Future<Output = Result<CachedRecords, ApplicationError>> + Send + 'static,
    {
        let cache = self.cache.clone();
        let landing = Landing {
            in_flight: Arc::clone(&self.in_flight),
            key: key.to_string(),
        };
        let task = tokio::spawn(async move {
            let result = fetch.await;
            if let Ok(records) = &result {
                cache.insert(landing.key.clone(), records.clone()).await;
            }
            drop(landing);
            result
        });

        async move {
            task.await.map_err(|e| {
                error!(error = %e, "Upstream fetch task failed");
                ApplicationError::UpstreamHttp {
                    status: 502,
                    retry_after_seconds: None,
                    message: "upstream fetch was aborted".to_string(),
                }
            })?
        }
        .boxed()
        .shared()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.entry_count(),
        }
    }
}
