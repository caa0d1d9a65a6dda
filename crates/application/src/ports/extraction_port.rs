//! Slot extraction port
//!
//! A capability that turns raw text into partial intent fields. Implemented by
//! the rule engine and by the LLM-backed extractor; the classifier works with
//! either.

use async_trait::async_trait;
use domain::{DepArr, Language, ModeFlags, QueryType, RawQueryText};
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Partial intent fields; every slot is optional
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    /// Query type, if the extractor could tell
    pub query_type: Option<QueryType>,
    /// Origin / single place
    pub origin: Option<String>,
    /// Destination
    pub destination: Option<String>,
    /// Literal date/time phrase
    pub date_phrase: Option<String>,
    /// Literal arrival phrase
    pub arrival_phrase: Option<String>,
    /// Explicit dep/arr anchor
    pub dep_or_arr: Option<DepArr>,
    /// Mode filters, when any were mentioned
    pub modes: Option<ModeFlags>,
    /// Detected language
    pub language: Option<Language>,
}

impl ExtractedFields {
    /// Number of place slots filled
    pub fn place_count(&self) -> usize {
        [&self.origin, &self.destination]
            .iter()
            .filter(|p| p.as_ref().is_some_and(|s| !s.trim().is_empty()))
            .count()
    }
}

/// Port for text slot extraction
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ExtractionPort: Send + Sync {
    /// Extract whatever slots the implementation can find
    async fn extract(&self, text: &RawQueryText) -> Result<ExtractedFields, ApplicationError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}
