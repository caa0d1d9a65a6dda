//! LLM port used by the extraction fallback

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Raw model reply to a JSON-mode prompt
#[derive(Debug, Clone)]
pub struct LlmReply {
    /// Reply body; expected to be a JSON object but not yet validated
    pub json: String,
    /// Model that answered
    pub model: String,
    /// Prompt plus completion tokens, when the server reports both
    pub tokens: Option<u32>,
    pub latency_ms: u64,
}

/// A chat model answering in JSON mode
#[cfg_attr(test, automock)]
#[async_trait]
pub trait InferencePort: Send + Sync {
    /// Ask the model to turn `text` into JSON following `instructions`
    async fn complete_json(
        &self,
        instructions: &str,
        text: &str,
    ) -> Result<LlmReply, ApplicationError>;

    /// Whether the server answers at all
    async fn is_healthy(&self) -> bool;

    fn model_name(&self) -> &str;
}
