//! Application configuration
//!
//! `AppConfig` aggregates the settings of every layer:
//! - `efa`: upstream endpoint, timeouts, throttling, cache TTLs
//! - `retry`: backoff for transient upstream failures
//! - `query`: timezone, limits, stop ambiguity threshold
//! - `inference`: optional LLM extraction backend
//! - `telemetry`: log filter and output format
//!
//! Sources are layered: built-in defaults, then an optional TOML file, then
//! environment variables such as `EFA__EFA__BASE_URL`.

mod inference;

use std::{collections::HashMap, path::Path};

use application::QueryConfig;
use integration_efa::EfaConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use inference::InferenceConfig;

use crate::{retry::RetryConfig, telemetry::TelemetryConfig};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "EFA";

/// Separator between prefix and nested keys in environment variable names
pub const ENV_SEPARATOR: &str = "__";

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Upstream EFA backend
    #[serde(default)]
    pub efa: EfaConfig,

    /// Retry policy for upstream calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Query resolution settings
    #[serde(default)]
    pub query: QueryConfig,

    /// LLM extraction backend
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Logging
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from defaults, a TOML file and the environment
    ///
    /// With `path`, that file must exist. Without it, `config.toml` in the
    /// working directory is used when present.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or parsed, or if the
    /// merged configuration fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        Self::build(path, None)
    }

    fn build(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, config::ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let merged: Self = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        merged.validate().map_err(config::ConfigError::Message)?;
        debug!(base_url = %merged.efa.base_url, timezone = %merged.query.timezone, "Configuration loaded");
        Ok(merged)
    }

    /// Validate every section
    ///
    /// # Errors
    ///
    /// Returns the first section error found.
    pub fn validate(&self) -> Result<(), String> {
        self.efa.validate()?;
        self.retry.validate()?;
        self.query.validate()?;
        self.inference.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    #[test]
    fn defaults_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.efa.base_url, "https://efa.sta.bz.it/apb");
        assert_eq!(config.query.timezone, "Europe/Rome");
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[efa]\nbase_url = \"http://localhost:9000\"\ntimeout_secs = 5\n\n[query]\nambiguity_threshold = 800"
        )
        .unwrap();

        let config = AppConfig::build(Some(file.path()), env(&[])).unwrap();
        assert_eq!(config.efa.base_url, "http://localhost:9000");
        assert_eq!(config.efa.timeout_secs, 5);
        assert_eq!(config.efa.max_trips, 5);
        assert_eq!(config.query.ambiguity_threshold, 800);
    }

    #[test]
    fn environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[retry]\nmax_retries = 5").unwrap();

        let config = AppConfig::build(
            Some(file.path()),
            env(&[("EFA__RETRY__MAX_RETRIES", "1"), ("EFA__EFA__MAX_TRIPS", "3")]),
        )
        .unwrap();
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.efa.max_trips, 3);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = AppConfig::build(Some(Path::new("/nonexistent/efa.toml")), env(&[]));
        assert!(result.is_err());
    }

    #[test]
    fn invalid_merged_config_is_rejected() {
        let result = AppConfig::build(None, env(&[("EFA__QUERY__TIMEZONE", "Mars/Olympus")]));
        assert!(result.is_err());
    }
}
