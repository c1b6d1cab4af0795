// In-memory implementations for testing and local runs
//
// - InMemoryEventEmitter records every emitted event
// - InMemoryStateSink records every committed snapshot
// - MockLlmDriver replays queued responses and logs each call

use async_trait::async_trait;
use futures::stream;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{GeneratorError, Result};
use crate::events::GeneratorEvent;
use crate::llm_drivers::{
    LlmCallConfig, LlmCompletionMetadata, LlmDriver, LlmMessage, LlmResponseStream, LlmStreamEvent,
};
use crate::traits::{EventEmitter, StateSink};

// ============================================================================
// InMemoryEventEmitter
// ============================================================================

/// Emitter that keeps every event in order
#[derive(Debug, Default, Clone)]
pub struct InMemoryEventEmitter {
    events: Arc<RwLock<Vec<GeneratorEvent>>>,
}

impl InMemoryEventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<GeneratorEvent> {
        self.events.read().await.clone()
    }

    /// Event names in emission order
    pub async fn event_types(&self) -> Vec<&'static str> {
        self.events
            .read()
            .await
            .iter()
            .map(GeneratorEvent::event_type)
            .collect()
    }

    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}

#[async_trait]
impl EventEmitter for InMemoryEventEmitter {
    async fn emit(&self, event: GeneratorEvent) -> Result<()> {
        self.events.write().await.push(event);
        Ok(())
    }
}

// ============================================================================
// InMemoryStateSink
// ============================================================================

/// Sink that keeps every committed snapshot
#[derive(Debug, Clone)]
pub struct InMemoryStateSink<S> {
    snapshots: Arc<RwLock<Vec<S>>>,
}

impl<S> Default for InMemoryStateSink<S> {
    fn default() -> Self {
        Self {
            snapshots: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl<S: Clone> InMemoryStateSink<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshots(&self) -> Vec<S> {
        self.snapshots.read().await.clone()
    }

    /// Most recent committed snapshot
    pub async fn latest(&self) -> Option<S> {
        self.snapshots.read().await.last().cloned()
    }
}

#[async_trait]
impl<S: Clone + Send + Sync> StateSink<S> for InMemoryStateSink<S> {
    async fn emit_state(&self, state: &S) -> Result<()> {
        self.snapshots.write().await.push(state.clone());
        Ok(())
    }
}

// ============================================================================
// MockLlmDriver - Returns predefined responses
// ============================================================================

/// A queued mock response
#[derive(Debug, Clone)]
pub enum MockLlmResponse {
    Text(String),
    Error(String),
}

impl MockLlmResponse {
    pub fn text(text: impl Into<String>) -> Self {
        MockLlmResponse::Text(text.into())
    }

    /// The call fails with an LLM error
    pub fn error(message: impl Into<String>) -> Self {
        MockLlmResponse::Error(message.into())
    }
}

/// Mock LLM driver for testing
///
/// Returns queued responses in order, then the fallback response.
#[derive(Debug)]
pub struct MockLlmDriver {
    responses: Arc<RwLock<VecDeque<MockLlmResponse>>>,
    fallback: MockLlmResponse,
    call_log: Arc<RwLock<Vec<(Vec<LlmMessage>, LlmCallConfig)>>>,
}

impl Default for MockLlmDriver {
    fn default() -> Self {
        Self {
            responses: Arc::new(RwLock::new(VecDeque::new())),
            fallback: MockLlmResponse::text("Mock response (no more responses configured)"),
            call_log: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl MockLlmDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver that always answers with `response` once the queue is empty
    pub fn with_fallback(mut self, response: MockLlmResponse) -> Self {
        self.fallback = response;
        self
    }

    pub async fn add_response(&self, response: MockLlmResponse) {
        self.responses.write().await.push_back(response);
    }

    pub async fn set_responses(&self, responses: Vec<MockLlmResponse>) {
        *self.responses.write().await = responses.into();
    }

    /// Messages of every call, in order
    pub async fn calls(&self) -> Vec<Vec<LlmMessage>> {
        self.call_log
            .read()
            .await
            .iter()
            .map(|(messages, _)| messages.clone())
            .collect()
    }

    /// Call configurations of every call, in order
    pub async fn configs(&self) -> Vec<LlmCallConfig> {
        self.call_log
            .read()
            .await
            .iter()
            .map(|(_, config)| config.clone())
            .collect()
    }

    pub async fn call_count(&self) -> usize {
        self.call_log.read().await.len()
    }
}

#[async_trait]
impl LlmDriver for MockLlmDriver {
    async fn chat_completion_stream(
        &self,
        messages: Vec<LlmMessage>,
        config: &LlmCallConfig,
    ) -> Result<LlmResponseStream> {
        self.call_log.write().await.push((messages, config.clone()));

        let response = self
            .responses
            .write()
            .await
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match response {
            MockLlmResponse::Text(text) => {
                let events = vec![
                    Ok(LlmStreamEvent::TextDelta(text)),
                    Ok(LlmStreamEvent::Done(LlmCompletionMetadata {
                        model: Some(config.model.clone()),
                        finish_reason: Some("stop".to_string()),
                        ..Default::default()
                    })),
                ];
                Ok(Box::pin(stream::iter(events)))
            }
            MockLlmResponse::Error(message) => Err(GeneratorError::llm(message)),
        }
    }
}
