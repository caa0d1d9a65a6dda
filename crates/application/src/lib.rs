//! Application layer - Use cases and orchestration
//!
//! Classifies free-text transit questions, resolves date phrases and stop
//! names, and drives the transit backend through ports implemented by the
//! infrastructure layer.

pub mod datetime_resolver;
pub mod error;
pub mod intent;
pub mod ports;
pub mod query_builder;
pub mod services;
pub mod stop_disambiguator;

pub use datetime_resolver::{DateTimeResolver, ResolvedTime};
pub use error::ApplicationError;
pub use intent::{IntentClassifier, LlmExtractor, RuleBasedExtractor, detect_language};
pub use ports::*;
pub use query_builder::QueryBuilder;
pub use services::*;
pub use stop_disambiguator::StopDisambiguator;
