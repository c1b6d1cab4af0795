// Step abstractions
//
// A generation step is a unit of work over a state type: it reads the full
// state and returns a partial update plus a control signal. Steps do not
// mutate state themselves; the engine merges their output.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::channels::Channels;
use crate::error::Result;
use crate::events::GeneratorEvent;
use crate::traits::EventEmitter;

/// Typed identifier for a step in a workflow table
pub trait StepKey: Copy + Eq + std::fmt::Debug + Send + Sync + 'static {
    /// Stable wire id ("requirements", "spec", ...)
    fn id(&self) -> &'static str;

    /// Human-readable label
    fn label(&self) -> &'static str;
}

/// Status of a step as reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
    Queued,
    Running,
    Waiting,
    Success,
    Error,
}

/// Status record for one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepStatusEntry {
    pub id: String,
    pub label: String,
    pub status: StepState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl StepStatusEntry {
    pub fn new<K: StepKey>(step: K, status: StepState, note: Option<String>) -> Self {
        Self {
            id: step.id().to_string(),
            label: step.label().to_string(),
            status,
            note,
        }
    }

    pub fn queued<K: StepKey>(step: K) -> Self {
        Self::new(step, StepState::Queued, None)
    }
}

/// What the engine should do after a step's update has been merged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Re-route and keep going
    Continue,
    /// Yield to the human; the run ends suspended at this step
    Suspend,
}

/// Output of one step execution
#[derive(Debug, Clone)]
pub struct StepOutcome<U> {
    pub update: U,
    pub control: Control,
    /// Optional note attached to the step's final status
    pub note: Option<String>,
}

impl<U> StepOutcome<U> {
    pub fn proceed(update: U) -> Self {
        Self {
            update,
            control: Control::Continue,
            note: None,
        }
    }

    pub fn suspend(update: U, note: impl Into<String>) -> Self {
        Self {
            update,
            control: Control::Suspend,
            note: Some(note.into()),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Capabilities handed to a step for the duration of one execution
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub emitter: &'a dyn EventEmitter,
}

impl<'a> StepContext<'a> {
    pub fn new(emitter: &'a dyn EventEmitter) -> Self {
        Self { emitter }
    }

    pub async fn emit(&self, event: GeneratorEvent) -> Result<()> {
        self.emitter.emit(event).await
    }
}

/// A single unit of generation work over state `S`
#[async_trait]
pub trait GenerationStep<S: Channels>: Send + Sync {
    /// Step name used in logs and errors
    fn name(&self) -> &'static str;

    /// Execute against the current state, returning a partial update
    async fn execute(&self, state: &S, ctx: &StepContext<'_>) -> Result<StepOutcome<S::Update>>;
}
