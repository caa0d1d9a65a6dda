//! EFA client configuration

use serde::{Deserialize, Serialize};

/// Configuration for the EFA backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EfaConfig {
    /// Base URL of the EFA instance, endpoints are appended
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Concurrent upstream requests
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Minimum spacing between successive requests in milliseconds
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Cache TTL for stop finder responses in seconds
    #[serde(default = "default_stop_cache_ttl_secs")]
    pub stop_cache_ttl_secs: u64,

    /// Cache TTL for departure boards in seconds
    #[serde(default = "default_departure_cache_ttl_secs")]
    pub departure_cache_ttl_secs: u64,

    /// Cache TTL for trip requests in seconds
    #[serde(default = "default_trip_cache_ttl_secs")]
    pub trip_cache_ttl_secs: u64,

    /// Upper bound of cached responses
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: u64,

    /// Itineraries requested per trip query
    #[serde(default = "default_max_trips")]
    pub max_trips: u32,

    /// User agent header
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "https://efa.sta.bz.it/apb".to_string()
}

const fn default_timeout_secs() -> u64 {
    15
}

const fn default_max_connections() -> usize {
    4
}

const fn default_min_interval_ms() -> u64 {
    200
}

const fn default_stop_cache_ttl_secs() -> u64 {
    120
}

const fn default_departure_cache_ttl_secs() -> u64 {
    30
}

const fn default_trip_cache_ttl_secs() -> u64 {
    30
}

const fn default_cache_max_entries() -> u64 {
    1000
}

const fn default_max_trips() -> u32 {
    5
}

fn default_user_agent() -> String {
    format!("efa-transit/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for EfaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_connections: default_max_connections(),
            min_interval_ms: default_min_interval_ms(),
            stop_cache_ttl_secs: default_stop_cache_ttl_secs(),
            departure_cache_ttl_secs: default_departure_cache_ttl_secs(),
            trip_cache_ttl_secs: default_trip_cache_ttl_secs(),
            cache_max_entries: default_cache_max_entries(),
            max_trips: default_max_trips(),
            user_agent: default_user_agent(),
        }
    }
}

impl EfaConfig {
    /// Create a configuration suitable for testing
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            timeout_secs: 2,
            min_interval_ms: 0,
            max_trips: 2,
            ..Default::default()
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("base_url must not be empty".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }

        if self.max_connections == 0 {
            return Err("max_connections must be greater than 0".to_string());
        }

        if self.max_trips == 0 || self.max_trips > 10 {
            return Err("max_trips must be within 1..=10".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EfaConfig::default();
        assert_eq!(config.base_url, "https://efa.sta.bz.it/apb");
        assert_eq!(config.timeout_secs, 15);
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.min_interval_ms, 200);
        assert_eq!(config.stop_cache_ttl_secs, 120);
        assert_eq!(config.departure_cache_ttl_secs, 30);
        assert_eq!(config.trip_cache_ttl_secs, 30);
        assert_eq!(config.max_trips, 5);
        assert!(config.user_agent.starts_with("efa-transit/"));
    }

    #[test]
    fn test_testing_config() {
        let config = EfaConfig::for_testing();
        assert_eq!(config.min_interval_ms, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_empty_base_url() {
        let config = EfaConfig {
            base_url: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_connections() {
        let config = EfaConfig {
            max_connections: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EfaConfig = serde_json::from_str(r#"{"max_trips": 3}"#).unwrap();
        assert_eq!(config.max_trips, 3);
        assert_eq!(config.base_url, "https://efa.sta.bz.it/apb");
    }
}
