// OpenAI Protocol LLM Driver
//
// Implementation of LlmDriver for OpenAI-compatible chat completion APIs.
// DeepSeek speaks the same protocol, so this is the production driver.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::config::LlmSettings;
use crate::error::{GeneratorError, Result};
use crate::llm_drivers::{
    LlmCallConfig, LlmCompletionMetadata, LlmDriver, LlmMessage, LlmMessageRole,
    LlmResponseStream, LlmStreamEvent,
};

const DEFAULT_API_URL: &str = "https://api.deepseek.com/chat/completions";

/// OpenAI Protocol LLM Driver
///
/// # Example
///
/// ```ignore
/// use uiforge_core::openai::OpenAIProtocolLlmDriver;
///
/// let driver = OpenAIProtocolLlmDriver::new("your-api-key");
/// // or with custom endpoint
/// let driver = OpenAIProtocolLlmDriver::with_base_url("your-api-key", "https://api.example.com/v1/chat/completions");
/// ```
#[derive(Clone)]
pub struct OpenAIProtocolLlmDriver {
    client: Client,
    api_key: String,
    api_url: String,
}

impl OpenAIProtocolLlmDriver {
    /// Create a new driver with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_API_URL)
    }

    /// Create a new driver with a custom API URL (full chat completions URL)
    pub fn with_base_url(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: api_url.into(),
        }
    }

    /// Create a driver from settings; fails when no API key is set
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| GeneratorError::config("DEEPSEEK_API_KEY environment variable not set"))?;
        Ok(Self::with_base_url(api_key, settings.chat_completions_url()))
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn convert_role(role: LlmMessageRole) -> &'static str {
        match role {
            LlmMessageRole::System => "system",
            LlmMessageRole::User => "user",
            LlmMessageRole::Assistant => "assistant",
        }
    }

    fn convert_message(msg: &LlmMessage) -> OpenAiMessage {
        OpenAiMessage {
            role: Self::convert_role(msg.role).to_string(),
            content: msg.content.clone(),
        }
    }
}

#[async_trait]
impl LlmDriver for OpenAIProtocolLlmDriver {
    async fn chat_completion_stream(
        &self,
        messages: Vec<LlmMessage>,
        config: &LlmCallConfig,
    ) -> Result<LlmResponseStream> {
        let request = OpenAiRequest {
            model: config.model.clone(),
            messages: messages.iter().map(Self::convert_message).collect(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            stream: true,
        };

        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| GeneratorError::llm(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GeneratorError::llm(format!(
                "LLM API error ({}): {}",
                status, error_text
            )));
        }

        let event_stream = response.bytes_stream().eventsource();

        let model = config.model.clone();
        let chunks = Arc::new(AtomicU32::new(0));

        let converted_stream: LlmResponseStream = Box::pin(event_stream.map(move |result| {
            let event = match result {
                Ok(event) => event,
                Err(e) => return Ok(LlmStreamEvent::Error(format!("Stream error: {}", e))),
            };

            if event.data == "[DONE]" {
                return Ok(LlmStreamEvent::Done(LlmCompletionMetadata {
                    total_tokens: Some(chunks.load(Ordering::Relaxed)),
                    model: Some(model.clone()),
                    finish_reason: Some("stop".to_string()),
                }));
            }

            let chunk = match serde_json::from_str::<OpenAiStreamChunk>(&event.data) {
                Ok(chunk) => chunk,
                Err(e) => {
                    return Ok(LlmStreamEvent::Error(format!(
                        "Failed to parse chunk: {}",
                        e
                    )))
                }
            };

            let Some(choice) = chunk.choices.first() else {
                return Ok(LlmStreamEvent::TextDelta(String::new()));
            };

            if let Some(content) = &choice.delta.content {
                chunks.fetch_add(1, Ordering::Relaxed);
                return Ok(LlmStreamEvent::TextDelta(content.clone()));
            }

            if let Some(finish_reason) = &choice.finish_reason {
                return Ok(LlmStreamEvent::Done(LlmCompletionMetadata {
                    total_tokens: Some(chunks.load(Ordering::Relaxed)),
                    model: Some(model.clone()),
                    finish_reason: Some(finish_reason.clone()),
                }));
            }

            Ok(LlmStreamEvent::TextDelta(String::new()))
        }));

        Ok(converted_stream)
    }
}

impl std::fmt::Debug for OpenAIProtocolLlmDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIProtocolLlmDriver")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// OpenAI API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiDelta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_api_key() {
        let driver = OpenAIProtocolLlmDriver::new("sk-secret");
        let debug = format!("{:?}", driver);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-secret"));
    }

    #[test]
    fn test_from_settings_requires_key() {
        let settings = LlmSettings::default();
        assert!(OpenAIProtocolLlmDriver::from_settings(&settings).is_err());

        let settings = LlmSettings {
            api_key: Some("key".to_string()),
            base_url: "https://llm.internal/".to_string(),
            ..LlmSettings::default()
        };
        let driver = OpenAIProtocolLlmDriver::from_settings(&settings).unwrap();
        assert_eq!(driver.api_url(), "https://llm.internal/chat/completions");
    }
}
