//! Infrastructure layer - Adapters and ambient concerns
//!
//! Implements the application ports over the EFA client and an
//! Ollama-compatible inference server, and hosts the response cache,
//! retry policy, configuration loading and logging setup.

pub mod adapters;
pub mod cache;
pub mod config;
pub mod retry;
pub mod telemetry;

pub use adapters::*;
pub use cache::{CacheStats, CacheTtls, CachedRecords, ResponseCache};
pub use config::{AppConfig, InferenceConfig};
pub use retry::{RetryConfig, RetryOutcome, Retryable, with_retry};
pub use telemetry::{TelemetryConfig, TelemetryError, init_telemetry};
