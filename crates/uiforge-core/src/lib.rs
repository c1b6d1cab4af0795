// UI Generator Core
//
// This crate provides a storage-agnostic, streamable implementation of the
// natural-language-to-UI generator: a state model with per-field reducers, a
// small FSM engine, and two workflow tables built on it.
//
// Key design decisions:
// - Uses traits (EventEmitter, StateSink, LlmDriver) for pluggable backends
// - Steps return partial updates; only the engine merges them into state
// - Supervisor pipeline: requirements -> design -> code -> preview, with a
//   human-in-the-loop gate at preview
// - Linear scaffold pipeline: spec -> schema -> ui -> apis -> build -> fix -> done,
//   with an approval gate after the PRD
// - Suspension at a gate is an explicit engine outcome, not an error

pub mod channels;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod linear;
pub mod llm_drivers;
pub mod markup;
pub mod message;
pub mod state;
pub mod step;
pub mod steps;
pub mod supervisor;
pub mod traits;

// In-memory implementations for testing
pub mod memory;

// LLM driver implementations
pub mod openai;

// Re-exports for convenience
pub use channels::{merge, Channels, StateUpdate};
pub use config::{LlmSettings, SupervisorConfig};
pub use engine::{Advance, Engine, HaltReason, NextAction, RunContext, RunOutcome, Workflow};
pub use error::{GeneratorError, Result};
pub use events::{ApprovalRequest, GeneratorEvent};
pub use linear::{
    ApprovalDecision, ApprovalStatus, Artifact, ScaffoldInput, ScaffoldStage, ScaffoldState,
    ScaffoldStep, ScaffoldUpdate, ScaffoldWorkflow, SCAFFOLD_WORKFLOW_ID,
};
pub use llm_drivers::{
    LlmCallConfig, LlmCompletionMetadata, LlmDriver, LlmMessage, LlmMessageRole, LlmResponse,
    LlmResponseStream, LlmStreamEvent, UnconfiguredLlmDriver,
};
pub use message::{ContentPart, IncomingMessage, Message, MessageRole};
pub use openai::OpenAIProtocolLlmDriver;
pub use state::{
    ComponentState, DesignSpec, Requirements, SessionState, Stage, Styling, Theme,
};
pub use step::{
    Control, GenerationStep, StepContext, StepKey, StepOutcome, StepState, StepStatusEntry,
};
pub use steps::SupervisorStep;
pub use supervisor::{Supervisor, SupervisorInput, SUPERVISOR_WORKFLOW_ID};
pub use traits::{EventEmitter, NoopEventEmitter, StateSink};
