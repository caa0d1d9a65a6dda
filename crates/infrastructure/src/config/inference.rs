//! `[inference]` section: the optional LLM slot extractor

use serde::{Deserialize, Serialize};

/// Ollama-compatible chat server used before the rule engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Consult the LLM on every `search` (the CLI `--llm` flag forces it)
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    /// Per-request budget; a slow model falls back to the rule engine
    pub timeout_ms: u64,
    /// 0.0 keeps the extraction deterministic
    pub temperature: f32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://localhost:11434".to_string(),
            model: "qwen2.5-1.5b-instruct".to_string(),
            timeout_ms: 20_000,
            temperature: 0.0,
        }
    }
}

impl InferenceConfig {
    /// Point the defaults at another server
    #[must_use]
    pub fn for_server(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let problem = if self.base_url.trim().is_empty() {
            "inference.base_url must not be empty"
        } else if self.model.trim().is_empty() {
            "inference.model must not be empty"
        } else if self.timeout_ms == 0 {
            "inference.timeout_ms must be greater than zero"
        } else if !(0.0..=2.0).contains(&self.temperature) {
            "inference.temperature must be within 0.0..=2.0"
        } else {
            return Ok(());
        };
        Err(problem.to_string())
    }
}
