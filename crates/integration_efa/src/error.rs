//! EFA error types

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur talking to the EFA backend
#[derive(Debug, Clone, Error)]
pub enum EfaError {
    /// Connection to the backend failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request exceeded the configured timeout
    #[error("Request timed out after {timeout_secs} seconds")]
    Timeout {
        /// The timeout in seconds
        timeout_secs: u64,
    },

    /// Non-success HTTP status
    #[error("HTTP {status}: {message}")]
    Http {
        /// Status code
        status: u16,
        /// Seconds from a `Retry-After` header
        retry_after_secs: Option<u64>,
        /// Short description
        message: String,
    },

    /// The backend answered with an error system message and no results
    #[error("EFA rejected request ({code}): {message}")]
    Api {
        /// Status the failure is reported as
        status: u16,
        /// Upstream message code
        code: String,
        /// Upstream message text
        message: String,
    },

    /// Body was not the expected JSON shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Payload lacks data needed for the requested records
    #[error("Normalization failed: {0}")]
    Normalization(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl EfaError {
    /// Returns true if a retry may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionFailed(_) | Self::Timeout { .. } => true,
            Self::Http { status, .. } | Self::Api { status, .. } => {
                *status == 429 || *status >= 500
            },
            Self::Decode(_) | Self::Normalization(_) | Self::Configuration(_) => false,
        }
    }

    /// Server-provided wait before the next attempt
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Http {
                retry_after_secs: Some(secs),
                ..
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }

    /// HTTP-like status of the failure, if any
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
