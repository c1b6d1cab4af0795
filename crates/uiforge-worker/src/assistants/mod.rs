// Assistants
//
// An assistant is a published pipeline: descriptor metadata plus a run entry
// point that folds run input into the thread's prior values and drives its
// workflow table through the engine.

mod scaffold;
mod supervisor;

pub use scaffold::ScaffoldAssistant;
pub use supervisor::SupervisorAssistant;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use uiforge_core::EventEmitter;
use uiforge_storage::{SessionStore, ThreadValues};

use crate::error::Result;
use crate::models::{AssistantSummary, GraphInfo, GraphSchemas};

/// Everything one assistant run needs
pub struct AssistantRun<'a> {
    pub run_id: &'a str,
    pub thread_id: &'a str,
    /// Raw run input from the request body
    pub input: Value,
    /// Thread values before this run
    pub prior: Option<ThreadValues>,
    pub store: Arc<dyn SessionStore>,
    pub emitter: &'a dyn EventEmitter,
}

/// What a completed (or suspended) run reports in `run-finished`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub summary: String,
    pub completed_step: String,
}

#[async_trait]
pub trait Assistant: Send + Sync {
    fn summary(&self) -> AssistantSummary;

    fn graph(&self) -> GraphInfo;

    fn schemas(&self) -> GraphSchemas;

    fn assistant_id(&self) -> String {
        self.summary().assistant_id
    }

    /// True when `values` were produced by this assistant's pipeline
    fn owns(&self, values: &ThreadValues) -> bool;

    /// Execute one run; state is persisted through the store as it merges
    async fn run<'a>(&self, run: AssistantRun<'a>) -> Result<RunResult>;

    /// Merge a client-supplied partial update into the thread's values.
    ///
    /// Unknown fields are rejected.
    fn apply_state_update(
        &self,
        prior: Option<&ThreadValues>,
        values: Value,
        thread_id: &str,
    ) -> Result<ThreadValues>;
}
