// Core traits for pluggable backends
//
// These traits keep the engine independent of transport and storage:
// - Channel-based implementations for SSE streaming
// - Store-backed implementations for thread persistence
// - In-memory implementations for testing

use async_trait::async_trait;

use crate::error::Result;
use crate::events::GeneratorEvent;

// ============================================================================
// EventEmitter - For streaming events during execution
// ============================================================================

/// Trait for emitting events during a run
#[async_trait]
pub trait EventEmitter: Send + Sync {
    /// Emit a single event
    async fn emit(&self, event: GeneratorEvent) -> Result<()>;

    /// Emit multiple events
    async fn emit_batch(&self, events: Vec<GeneratorEvent>) -> Result<()> {
        for event in events {
            self.emit(event).await?;
        }
        Ok(())
    }
}

// ============================================================================
// StateSink - For committing merged state
// ============================================================================

/// Receives the full state after every successful merge.
///
/// Implementations persist the snapshot (so a later failure leaves the last
/// merge committed) and publish it as a `values` event.
#[async_trait]
pub trait StateSink<S>: Send + Sync {
    async fn emit_state(&self, state: &S) -> Result<()>;
}

// ============================================================================
// NoopEventEmitter
// ============================================================================

/// Emitter that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventEmitter;

#[async_trait]
impl EventEmitter for NoopEventEmitter {
    async fn emit(&self, _event: GeneratorEvent) -> Result<()> {
        Ok(())
    }
}
