// LLM Driver Abstractions
//
// This module encapsulates the abstractions needed to talk to an LLM provider:
// - LlmDriver trait with streaming as the primitive and buffered helpers on top
// - Provider-agnostic message and call configuration types
// - UnconfiguredLlmDriver for deployments without an API key
//
// Generation steps only need `complete(system, user, config) -> text`; the
// streaming primitive is what concrete drivers implement.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::error::{GeneratorError, Result};

// ============================================================================
// LlmDriver Trait
// ============================================================================

/// Type alias for the LLM response stream
pub type LlmResponseStream = Pin<Box<dyn Stream<Item = Result<LlmStreamEvent>> + Send>>;

/// Events emitted during LLM streaming
#[derive(Debug, Clone)]
pub enum LlmStreamEvent {
    /// Text delta (incremental content)
    TextDelta(String),
    /// Streaming completed
    Done(LlmCompletionMetadata),
    /// Error during streaming
    Error(String),
}

/// Metadata about LLM completion
#[derive(Debug, Clone, Default)]
pub struct LlmCompletionMetadata {
    /// Number of content chunks received
    pub total_tokens: Option<u32>,
    /// Model used
    pub model: Option<String>,
    /// Finish reason
    pub finish_reason: Option<String>,
}

/// Buffered LLM response
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub metadata: LlmCompletionMetadata,
}

/// Trait for LLM drivers
///
/// Implementations handle provider-specific API calls and response parsing.
#[async_trait]
pub trait LlmDriver: Send + Sync {
    /// Call the LLM with streaming response
    async fn chat_completion_stream(
        &self,
        messages: Vec<LlmMessage>,
        config: &LlmCallConfig,
    ) -> Result<LlmResponseStream>;

    /// Call the LLM without streaming (convenience method)
    async fn chat_completion(
        &self,
        messages: Vec<LlmMessage>,
        config: &LlmCallConfig,
    ) -> Result<LlmResponse> {
        use futures::StreamExt;

        let mut stream = self.chat_completion_stream(messages, config).await?;
        let mut text = String::new();
        let mut metadata = LlmCompletionMetadata::default();

        while let Some(event) = stream.next().await {
            match event? {
                LlmStreamEvent::TextDelta(delta) => text.push_str(&delta),
                LlmStreamEvent::Done(meta) => metadata = meta,
                LlmStreamEvent::Error(err) => return Err(GeneratorError::llm(err)),
            }
        }

        Ok(LlmResponse { text, metadata })
    }

    /// Single-turn completion: system prompt + user prompt in, text out
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        config: &LlmCallConfig,
    ) -> Result<String> {
        let messages = vec![
            LlmMessage::system(system_prompt),
            LlmMessage::user(user_prompt),
        ];
        Ok(self.chat_completion(messages, config).await?.text)
    }
}

// ============================================================================
// Message Types
// ============================================================================

/// Role of a message sent to the LLM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmMessageRole {
    System,
    User,
    Assistant,
}

/// Message format for LLM calls (provider-agnostic)
#[derive(Debug, Clone, PartialEq)]
pub struct LlmMessage {
    pub role: LlmMessageRole,
    pub content: String,
}

impl LlmMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: LlmMessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: LlmMessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: LlmMessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Configuration for a single LLM call
#[derive(Debug, Clone, PartialEq)]
pub struct LlmCallConfig {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl LlmCallConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

// ============================================================================
// UnconfiguredLlmDriver
// ============================================================================

/// Driver used when no API key is configured; every call fails
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredLlmDriver;

#[async_trait]
impl LlmDriver for UnconfiguredLlmDriver {
    async fn chat_completion_stream(
        &self,
        _messages: Vec<LlmMessage>,
        _config: &LlmCallConfig,
    ) -> Result<LlmResponseStream> {
        Err(GeneratorError::config(
            "LLM API key is not configured (set DEEPSEEK_API_KEY)",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_driver_fails_with_configuration_error() {
        let driver = UnconfiguredLlmDriver;
        let result = driver
            .complete("system", "user", &LlmCallConfig::new("deepseek-chat"))
            .await;
        assert!(matches!(result, Err(GeneratorError::Configuration(_))));
    }

    #[test]
    fn test_call_config_builder() {
        let config = LlmCallConfig::new("deepseek-chat")
            .with_temperature(0.3)
            .with_max_tokens(512);
        assert_eq!(config.temperature, Some(0.3));
        assert_eq!(config.max_tokens, Some(512));
    }
}
