//! Application-level errors
//!
//! The closed taxonomy surfaced to callers of the transit query service.

use domain::{DomainError, Stop};
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Clone, Error)]
pub enum ApplicationError {
    /// Input text could not be classified into a query type
    #[error("Could not understand query: {text}")]
    Parse {
        /// The original input
        text: String,
    },

    /// Date/time phrase was not recognized
    #[error("Unrecognized date/time expression: {phrase}")]
    TemporalParse {
        /// The offending phrase
        phrase: String,
    },

    /// Several equally plausible stops matched
    #[error("Ambiguous stop '{query}': {} candidates", candidates.len())]
    AmbiguousStop {
        /// Place name as typed
        query: String,
        /// Candidates the caller can choose from
        candidates: Vec<Stop>,
    },

    /// Structurally invalid query, rejected before any upstream call
    #[error("Invalid query: {0}")]
    Validation(String),

    /// Non-2xx response from the transit backend
    #[error("Transit backend returned HTTP {status}: {message}")]
    UpstreamHttp {
        /// HTTP status code
        status: u16,
        /// Server-provided back-off hint
        retry_after_seconds: Option<u64>,
        /// Sanitized description
        message: String,
    },

    /// Upstream call timed out after exhausting retries
    #[error("Transit backend timed out after {attempts} attempts: {message}")]
    UpstreamTimeout {
        /// Attempts made
        attempts: u32,
        /// Sanitized description
        message: String,
    },

    /// Upstream payload could not be mapped to the canonical schema
    #[error("Unexpected transit response: {0}")]
    Normalization(String),

    /// Inference/LLM error
    #[error("Inference error: {0}")]
    Inference(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Problems with the user's input, recovered by asking for clarification
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. }
                | Self::TemporalParse { .. }
                | Self::AmbiguousStop { .. }
                | Self::Validation(_)
        )
    }

    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::UpstreamHttp { status, .. } => *status == 429 || *status >= 500,
            Self::UpstreamTimeout { .. } => true,
            _ => false,
        }
    }

    /// Server-provided back-off hint, if any
    pub const fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            Self::UpstreamHttp {
                retry_after_seconds,
                ..
            } => *retry_after_seconds,
            _ => None,
        }
    }
}

impl From<DomainError> for ApplicationError {
    fn from(err: DomainError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_errors() {
        assert!(
            ApplicationError::Parse {
                text: "hm".to_string()
            }
            .is_user_error()
        );
        assert!(ApplicationError::Validation("x".to_string()).is_user_error());
        assert!(!ApplicationError::Normalization("x".to_string()).is_user_error());
    }

    #[test]
    fn retryable_statuses() {
        let http = |status| ApplicationError::UpstreamHttp {
            status,
            retry_after_seconds: None,
            message: String::new(),
        };
        assert!(http(503).is_retryable());
        assert!(http(429).is_retryable());
        assert!(!http(404).is_retryable());
        assert!(!ApplicationError::Validation(String::new()).is_retryable());
    }

    #[test]
    fn ambiguous_stop_message_counts_candidates() {
        let err = ApplicationError::AmbiguousStop {
            query: "Meran".to_string(),
            candidates: vec![
                Stop::new("1", "Meran Bahnhof").unwrap(),
                Stop::new("2", "Meran Theaterplatz").unwrap(),
            ],
        };
        assert_eq!(err.to_string(), "Ambiguous stop 'Meran': 2 candidates");
    }

    #[test]
    fn domain_errors_become_validation() {
        let err: ApplicationError = DomainError::validation("empty").into();
        assert!(matches!(err, ApplicationError::Validation(_)));
    }

    #[test]
    fn retry_after_only_on_http() {
        let err = ApplicationError::UpstreamHttp {
            status: 429,
            retry_after_seconds: Some(30),
            message: "rate limited".to_string(),
        };
        assert_eq!(err.retry_after_seconds(), Some(30));
        assert_eq!(
            ApplicationError::UpstreamTimeout {
                attempts: 4,
                message: String::new()
            }
            .retry_after_seconds(),
            None
        );
    }
}
