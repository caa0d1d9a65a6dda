//! LLM-backed slot extraction

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use domain::{DepArr, Language, ModeFlags, QueryType, RawQueryText};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::{
    error::ApplicationError,
    ports::{ExtractedFields, ExtractionPort, InferencePort},
};

/// System prompt for transit slot extraction
pub(super) const EXTRACTION_SYSTEM_PROMPT: &str = r#"You extract public transport queries for South Tyrol.
The user writes German, Italian or English. Analyze the input and reply ONLY with valid JSON:
{
  "type": "trip" | "departure" | "stop",
  "from": "origin or the single stop name" (optional),
  "to": "destination" (optional, trips only),
  "datetime": "the date/time words exactly as the user wrote them" (optional),
  "arrival_datetime": "a separate arrive-by time, exactly as written" (optional),
  "datetime_mode": "dep" | "arr",
  "language": "de" | "it" | "en",
  "bus": true | false,
  "train": true | false,
  "cable_car": true | false,
  "long_distance": true | false
}

Never convert dates or times; copy the phrase verbatim.
Omit mode flags the user did not mention.

Examples:
- "Bozen-Meran" → {"type":"trip","from":"Bozen","to":"Meran","language":"de"}
- "Abfahrten Neumarkt Busbahnhof" → {"type":"departure","from":"Neumarkt Busbahnhof","language":"de"}
- "da Bolzano a Merano domani alle 8 senza autobus" → {"type":"trip","from":"Bolzano","to":"Merano","datetime":"domani alle 8","language":"it","bus":false}
- "arrive in Brixen by 9:00 from Klausen" → {"type":"trip","from":"Klausen","to":"Brixen","datetime":"by 9:00","datetime_mode":"arr","language":"en"}
- "fermata Piazza Walther" → {"type":"stop","from":"Piazza Walther","language":"it"}"#;

/// Extraction result as returned by the model
#[derive(Debug, Default, Deserialize)]
pub(super) struct ParsedQuery {
    #[serde(default, rename = "type")]
    pub query_type: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub datetime: Option<String>,
    #[serde(default)]
    pub arrival_datetime: Option<String>,
    #[serde(default)]
    pub datetime_mode: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub bus: Option<bool>,
    #[serde(default)]
    pub train: Option<bool>,
    #[serde(default)]
    pub cable_car: Option<bool>,
    #[serde(default)]
    pub long_distance: Option<bool>,
}

impl ParsedQuery {
    fn into_fields(self) -> ExtractedFields {
        let non_empty = |s: Option<String>| s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let modes = if self.bus.is_some()
            || self.train.is_some()
            || self.cable_car.is_some()
            || self.long_distance.is_some()
        {
            let defaults = ModeFlags::default();
            Some(ModeFlags {
                bus: self.bus.unwrap_or(defaults.bus),
                train: self.train.unwrap_or(defaults.train),
                cable_car: self.cable_car.unwrap_or(defaults.cable_car),
                long_distance: self.long_distance.unwrap_or(defaults.long_distance),
            })
        } else {
            None
        };

        ExtractedFields {
            query_type: self.query_type.and_then(|t| t.parse::<QueryType>().ok()),
            origin: non_empty(self.from),
            destination: non_empty(self.to),
            date_phrase: non_empty(self.datetime),
            arrival_phrase: non_empty(self.arrival_datetime),
            dep_or_arr: self.datetime_mode.and_then(|m| m.parse::<DepArr>().ok()),
            modes,
            language: self.language.and_then(|l| l.parse::<Language>().ok()),
        }
    }
}

/// Extractor delegating to a language model
pub struct LlmExtractor {
    inference: Arc<dyn InferencePort>,
}

impl fmt::Debug for LlmExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmExtractor")
            .field("model", &self.inference.model_name())
            .finish()
    }
}

impl LlmExtractor {
    /// Create an extractor over an inference backend
    pub fn new(inference: Arc<dyn InferencePort>) -> Self {
        Self { inference }
    }

    /// Parse the model reply into extracted fields
    pub(super) fn parse_response(response: &str) -> Result<ExtractedFields, String> {
        let json_str = Self::extract_json(response);
        let parsed: ParsedQuery =
            serde_json::from_str(json_str).map_err(|e| format!("JSON parse error: {e}"))?;
        Ok(parsed.into_fields())
    }

    /// Extract JSON from a response that may be wrapped in markdown code blocks
    fn extract_json(response: &str) -> &str {
        let response = response.trim();

        // Handle ```json ... ``` blocks
        if let Some(start) = response.find("```json") {
            if let Some(end) = response[start + 7..].find("```") {
                return response[start + 7..start + 7 + end].trim();
            }
        }

        // Handle ``` ... ``` blocks
        if let Some(start) = response.find("```") {
            if let Some(end) = response[start + 3..].find("```") {
                return response[start + 3..start + 3 + end].trim();
            }
        }

        // Ensure start < end to avoid panics with malformed input like "} {"
        if let Some(start) = response.find('{') {
            if let Some(end) = response.rfind('}') {
                if start <= end {
                    return &response[start..=end];
                }
            }
        }

        response
    }
}

#[async_trait]
impl ExtractionPort for LlmExtractor {
    #[instrument(skip(self, text), fields(input_len = text.text().len()))]
    async fn extract(&self, text: &RawQueryText) -> Result<ExtractedFields, ApplicationError> {
        let result = self
            .inference
            .complete_json(EXTRACTION_SYSTEM_PROMPT, text.text())
            .await?;

        match Self::parse_response(&result.json) {
            Ok(fields) => {
                debug!(fields = ?fields, model = %result.model, "LLM-extracted query slots");
                Ok(fields)
            },
            Err(e) => {
                warn!(error = %e, response = %result.json, "Failed to parse LLM extraction response");
                Err(ApplicationError::Inference(e))
            },
        }
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}
