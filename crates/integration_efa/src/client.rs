//! EFA HTTP client
//!
//! Executes typed requests against an EFA rapidJSON endpoint. The client
//! caps concurrent requests and spaces them by a minimum interval; caching
//! and retries are layered on top by the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::HeaderMap};
use tokio::{
    sync::{Mutex, Semaphore},
    time::Instant,
};
use tracing::{debug, instrument, warn};

use crate::{
    config::EfaConfig,
    error::EfaError,
    payload::EfaPayload,
    request::EfaRequest,
};

/// Trait for EFA backend clients
#[async_trait]
pub trait EfaClient: Send + Sync {
    /// Execute one request and decode the payload
    async fn execute(&self, request: &EfaRequest) -> Result<EfaPayload, EfaError>;

    /// Check if the backend is reachable
    async fn is_healthy(&self) -> bool;
}

/// reqwest-based EFA client
#[derive(Debug)]
pub struct HttpEfaClient {
    client: Client,
    config: EfaConfig,
    permits: Semaphore,
    last_request: Mutex<Option<Instant>>,
}

impl HttpEfaClient {
    /// Create a new EFA client
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be initialized.
    pub fn new(config: &EfaConfig) -> Result<Self, EfaError> {
        config.validate().map_err(EfaError::Configuration)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| EfaError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            config: config.clone(),
            permits: Semaphore::new(config.max_connections),
            last_request: Mutex::new(None),
        })
    }

    /// Active configuration
    pub const fn config(&self) -> &EfaConfig {
        &self.config
    }

    fn url(&self, request: &EfaRequest) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            request.endpoint()
        )
    }

    /// Keep successive requests at least `min_interval_ms` apart
    async fn throttle(&self) {
        let min_interval = Duration::from_millis(self.config.min_interval_ms);
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < min_interval {
                tokio::time::sleep(min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn transport_error(&self, error: &reqwest::Error) -> EfaError {
        if error.is_timeout() {
            EfaError::Timeout {
                timeout_secs: self.config.timeout_secs,
            }
        } else {
            EfaError::ConnectionFailed(error.to_string())
        }
    }
}

/// Seconds from a numeric `Retry-After` header
fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

#[async_trait]
impl EfaClient for HttpEfaClient {
    #[instrument(skip(self, request), fields(endpoint = request.endpoint()))]
    async fn execute(&self, request: &EfaRequest) -> Result<EfaPayload, EfaError> {
        let url = self.url(request);
        let params = request.params();

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| EfaError::ConnectionFailed(e.to_string()))?;
        self.throttle().await;

        debug!(?url, "Calling EFA backend");

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_secs = retry_after_secs(response.headers());
            if status == StatusCode::TOO_MANY_REQUESTS {
                warn!(?retry_after_secs, "EFA rate limit hit");
            }
            return Err(EfaError::Http {
                status: status.as_u16(),
                retry_after_secs,
                message: status
                    .canonical_reason()
                    .unwrap_or("upstream error")
                    .to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let payload = EfaPayload::decode(request.kind(), &body)?.check_messages()?;
        debug!(results = payload.result_count(), "EFA response decoded");
        Ok(payload)
    }

    async fn is_healthy(&self) -> bool {
        let url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            crate::request::RequestKind::StopFinder.endpoint()
        );
        self.client
            .get(&url)
            .query(&[("outputFormat", "rapidJSON"), ("name_sf", "Bozen")])
            .send()
            .await
            .is_ok_and(|r| r.status().is_success())
    }
}
