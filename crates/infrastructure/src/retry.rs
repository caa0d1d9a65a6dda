//! Bounded exponential backoff for upstream EFA calls
//!
//! Only transient failures are repeated: connection errors, timeouts, 5xx
//! and 429. A `Retry-After` hint lengthens the wait for that attempt, capped
//! at `max_delay_ms`.

use std::{
    future::Future,
    time::{Duration, Instant},
};

use integration_efa::EfaError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Backoff settings, loaded from the `[retry]` config section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Wait before the first retry, in milliseconds
    pub initial_delay_ms: u64,
    /// Upper bound for any single wait, in milliseconds
    pub max_delay_ms: u64,
    /// Growth factor between consecutive waits
    pub multiplier: f64,
    /// Retries after the first attempt; 0 disables retrying
    pub max_retries: u32,
    /// Random spread applied to each wait as a fraction (0.0 disables)
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 100,
            max_delay_ms: 10_000,
            multiplier: 2.0,
            max_retries: 3,
            jitter: 0.1,
        }
    }
}

impl RetryConfig {
    /// Backoff with the default jitter
    #[must_use]
    pub const fn new(
        initial_delay_ms: u64,
        max_delay_ms: u64,
        multiplier: f64,
        max_retries: u32,
    ) -> Self {
        Self {
            initial_delay_ms,
            max_delay_ms,
            multiplier,
            max_retries,
            jitter: 0.1,
        }
    }

    /// Millisecond waits and two retries, for mock servers
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            initial_delay_ms: 1,
            max_delay_ms: 10,
            multiplier: 2.0,
            max_retries: 2,
            jitter: 0.0,
        }
    }

    /// Deterministic waits
    #[must_use]
    pub const fn without_jitter(mut self) -> Self {
        self.jitter = 0.0;
        self
    }

    /// Check the settings for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.multiplier < 1.0 {
            return Err("retry.multiplier must be at least 1.0".to_string());
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err("retry.initial_delay_ms must not exceed retry.max_delay_ms".to_string());
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err("retry.jitter must be within 0.0..=1.0".to_string());
        }
        Ok(())
    }

    /// Wait before retry number `retry` (0 = first retry)
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss,
        clippy::cast_possible_truncation
    )]
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        let ceiling = self.max_delay_ms as f64;
        let mut millis =
            (self.initial_delay_ms as f64 * self.multiplier.powi(retry as i32)).min(ceiling);
        if self.jitter > 0.0 {
            let spread = millis * self.jitter;
            millis += rand::rng().random_range(-spread..=spread);
        }
        Duration::from_millis(millis.clamp(0.0, ceiling) as u64)
    }

    /// Wait before retry number `retry`, at least `retry_after` when given
    ///
    /// Never longer than `max_delay_ms`.
    #[must_use]
    pub fn delay_with_hint(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        let backoff = self.delay_for_attempt(retry);
        let wait = retry_after.map_or(backoff, |hint| hint.max(backoff));
        wait.min(Duration::from_millis(self.max_delay_ms))
    }
}

/// Errors that know whether repeating the call can help
pub trait Retryable {
    /// Transient failure
    fn is_retryable(&self) -> bool;

    /// Minimum wait requested by the server
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl Retryable for EfaError {
    fn is_retryable(&self) -> bool {
        Self::is_retryable(self)
    }

    fn retry_after(&self) -> Option<Duration> {
        Self::retry_after(self)
    }
}

/// Final result of a retried call plus how many upstream calls it took
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    /// Last result
    pub result: Result<T, E>,
    /// Calls made, including the first
    pub attempts: u32,
    /// Wall time including waits
    pub elapsed: Duration,
}

impl<T, E> RetryOutcome<T, E> {
    /// Drop the bookkeeping
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Run `call` until it succeeds, fails permanently, or the budget is spent
#[allow(clippy::cast_possible_truncation)]
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut call: F) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let started = Instant::now();
    let mut retry = 0u32;

    let result = loop {
        let err = match call().await {
            Ok(value) => break Ok(value),
            Err(err) => err,
        };
        if !err.is_retryable() {
            debug!(attempts = retry + 1, error = %err, "Upstream call failed permanently");
            break Err(err);
        }
        if retry >= config.max_retries {
            warn!(attempts = retry + 1, error = %err, "Retry budget exhausted");
            break Err(err);
        }

        let wait = config.delay_with_hint(retry, err.retry_after());
        warn!(
            attempt = retry + 1,
            wait_ms = wait.as_millis() as u64,
            error = %err,
            "Transient upstream failure, retrying"
        );
        tokio::time::sleep(wait).await;
        retry += 1;
    };

    RetryOutcome {
        result,
        attempts: retry + 1,
        elapsed: started.elapsed(),
    }
}
