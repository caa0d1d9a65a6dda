//! Domain-level errors

use thiserror::Error;

/// Errors that can occur in the domain layer
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    /// A stop record violated its invariants
    #[error("Invalid stop: {0}")]
    InvalidStop(String),

    /// Coordinates out of range
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    /// Unknown IANA timezone name
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// Unknown language code
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// Date/time invariant violated
    #[error("Invalid date/time: {0}")]
    InvalidDateTime(String),
}

impl DomainError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_helper_builds_variant() {
        let err = DomainError::validation("origin missing");
        assert_eq!(err, DomainError::ValidationError("origin missing".to_string()));
    }

    #[test]
    fn validation_error_message() {
        let err = DomainError::validation("field is required");
        assert_eq!(err.to_string(), "Validation failed: field is required");
    }

    #[test]
    fn invalid_stop_error_message() {
        let err = DomainError::InvalidStop("empty name".to_string());
        assert_eq!(err.to_string(), "Invalid stop: empty name");
    }

    #[test]
    fn invalid_timezone_error_message() {
        let err = DomainError::InvalidTimezone("Mars/Olympus".to_string());
        assert_eq!(err.to_string(), "Invalid timezone: Mars/Olympus");
    }
}
