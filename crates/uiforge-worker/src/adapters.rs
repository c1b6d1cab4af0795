// Adapters from core traits to the run stream and the session store
//
// - ChannelEventEmitter: forwards events to the SSE response over mpsc
// - ThreadStateSink: persists each merged state and publishes it as `values`

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use uiforge_core::{EventEmitter, GeneratorError, GeneratorEvent, Result, StateSink};
use uiforge_storage::{SessionStore, ThreadValues};

// ============================================================================
// ChannelEventEmitter
// ============================================================================

/// Event emitter backed by an unbounded channel
///
/// A closed receiver (client went away) is not an error; the run continues.
#[derive(Debug, Clone)]
pub struct ChannelEventEmitter {
    tx: mpsc::UnboundedSender<GeneratorEvent>,
}

impl ChannelEventEmitter {
    pub fn new(tx: mpsc::UnboundedSender<GeneratorEvent>) -> Self {
        Self { tx }
    }

    /// Emitter plus the receiving half
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<GeneratorEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl EventEmitter for ChannelEventEmitter {
    async fn emit(&self, event: GeneratorEvent) -> Result<()> {
        if let Err(e) = self.tx.send(event) {
            debug!(event = e.0.event_type(), "Stream receiver closed, dropping event");
        }
        Ok(())
    }
}

// ============================================================================
// ThreadStateSink
// ============================================================================

/// Commits merged state to the thread record and emits a `values` event
pub struct ThreadStateSink<'a> {
    store: Arc<dyn SessionStore>,
    thread_id: String,
    emitter: &'a dyn EventEmitter,
}

impl<'a> ThreadStateSink<'a> {
    pub fn new(
        store: Arc<dyn SessionStore>,
        thread_id: impl Into<String>,
        emitter: &'a dyn EventEmitter,
    ) -> Self {
        Self {
            store,
            thread_id: thread_id.into(),
            emitter,
        }
    }
}

#[async_trait]
impl<'a, S> StateSink<S> for ThreadStateSink<'a>
where
    S: Clone + Send + Sync + 'static,
    ThreadValues: From<S>,
{
    async fn emit_state(&self, state: &S) -> Result<()> {
        let values = ThreadValues::from(state.clone());
        let payload = values.to_json();
        self.store
            .update_values(&self.thread_id, values)
            .await
            .map_err(|e| GeneratorError::sink(e.to_string()))?;
        self.emitter.emit(GeneratorEvent::Values(payload)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uiforge_core::{memory::InMemoryEventEmitter, SessionState};
    use uiforge_storage::InMemorySessionStore;

    #[tokio::test]
    async fn test_channel_emitter_survives_closed_receiver() {
        let (emitter, rx) = ChannelEventEmitter::channel();
        emitter.emit(GeneratorEvent::log("first")).await.unwrap();
        drop(rx);
        assert!(emitter.emit(GeneratorEvent::log("second")).await.is_ok());
    }

    #[tokio::test]
    async fn test_state_sink_persists_and_emits_values() {
        let store = Arc::new(InMemorySessionStore::new());
        store.create(Some("t1".into()), None).await.unwrap();
        let emitter = InMemoryEventEmitter::new();
        let sink = ThreadStateSink::new(store.clone(), "t1", &emitter);

        let state = SessionState::new("t1");
        sink.emit_state(&state).await.unwrap();

        let record = store.get("t1").await.unwrap();
        assert_eq!(
            record.values.as_ref().and_then(|v| v.as_supervisor()),
            Some(&state)
        );
        assert_eq!(emitter.event_types().await, vec!["values"]);
    }

    #[tokio::test]
    async fn test_state_sink_fails_for_unknown_thread() {
        let store = Arc::new(InMemorySessionStore::new());
        let emitter = InMemoryEventEmitter::new();
        let sink = ThreadStateSink::new(store, "missing", &emitter);

        let result = sink.emit_state(&SessionState::new("missing")).await;
        assert!(matches!(result, Err(GeneratorError::StateSink(_))));
    }
}
