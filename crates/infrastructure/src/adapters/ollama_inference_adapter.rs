//! Ollama inference adapter - Implements `InferencePort` over the Ollama chat API
//!
//! Works with any Ollama-compatible server exposing `/api/chat` and
//! `/api/tags`. Used by the LLM extractor to pull structured fields out of
//! free-text queries.

use std::time::{Duration, Instant};

use application::{
    ApplicationError,
    ports::{InferencePort, LlmReply},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::InferenceConfig;

/// Ollama-format chat request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    stream: bool,
    format: &'static str,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

/// Ollama-format chat response
#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    message: ResponseMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Adapter for Ollama-compatible inference servers
#[derive(Debug)]
pub struct OllamaInferenceAdapter {
    client: Client,
    config: InferenceConfig,
}

impl OllamaInferenceAdapter {
    /// Create a new adapter with the given configuration
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the config is invalid, or `Inference` if
    /// the HTTP client cannot be built.
    pub fn new(config: &InferenceConfig) -> Result<Self, ApplicationError> {
        config.validate().map_err(ApplicationError::Configuration)?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ApplicationError::Inference(e.to_string()))?;

        info!(
            base_url = %config.base_url,
            model = %config.model,
            "Initialized Ollama inference adapter"
        );

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/api/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint
        )
    }
}

#[async_trait]
impl InferencePort for OllamaInferenceAdapter {
    #[instrument(skip(self, instructions, text), fields(model = %self.config.model, text_len = text.len()))]
    async fn complete_json(
        &self,
        instructions: &str,
        text: &str,
    ) -> Result<LlmReply, ApplicationError> {
        let start = Instant::now();
        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: instructions,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            stream: false,
            format: "json",
            options: ChatOptions {
                temperature: self.config.temperature,
            },
        };

        let response = self
            .client
            .post(self.api_url("chat"))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApplicationError::Inference(format!(
                        "inference timed out after {}ms",
                        self.config.timeout_ms
                    ))
                } else {
                    ApplicationError::Inference(format!("inference server unreachable: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Inference request failed");
            return Err(ApplicationError::Inference(format!(
                "inference server returned {status}"
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ApplicationError::Inference(format!("invalid inference response: {e}")))?;

        #[allow(clippy::cast_possible_truncation)]
        let latency_ms = start.elapsed().as_millis() as u64;
        let tokens = chat
            .prompt_eval_count
            .zip(chat.eval_count)
            .map(|(prompt, completion)| prompt + completion);

        debug!(model = %chat.model, tokens = ?tokens, latency_ms, "Inference completed");

        Ok(LlmReply {
            json: chat.message.content,
            model: chat.model,
            tokens,
            latency_ms,
        })
    }

    async fn is_healthy(&self) -> bool {
        match self.client.get(self.api_url("tags")).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "Inference health check failed");
                false
            },
        }
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
