// Run adapter using Tokio tasks
//
// A run is accepted synchronously (assistant resolved, thread created, run
// lock taken, status set to running) and then executed in a spawned task
// that streams events over a channel. The task owns the run lock, so the
// thread is released only when the run is fully committed or failed.
// Dropping the event receiver does not stop the task.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uiforge_core::{EventEmitter, GeneratorEvent};
use uiforge_storage::{
    Checkpoint, RunGuard, SessionStore, StoreError, ThreadMetadata, ThreadStatus,
};
use uuid::Uuid;

use crate::adapters::ChannelEventEmitter;
use crate::assistants::{Assistant, AssistantRun, RunResult};
use crate::error::Result;
use crate::registry::AssistantRegistry;

/// Metadata key recording which assistant last ran on a thread
pub const ASSISTANT_METADATA_KEY: &str = "assistant_id";

/// Request to start a streamed run
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub thread_id: String,
    /// Registered assistant id; the default assistant when absent
    pub assistant_id: Option<String>,
    pub input: Value,
}

/// A started run and its event stream
#[derive(Debug)]
pub struct RunHandle {
    pub run_id: String,
    pub thread_id: String,
    pub assistant_id: String,
    pub events: mpsc::UnboundedReceiver<GeneratorEvent>,
}

/// Runs assistants against threads in the session store
#[derive(Clone)]
pub struct RunAdapter {
    store: Arc<dyn SessionStore>,
    registry: Arc<AssistantRegistry>,
    /// Active runs (run_id -> task handle)
    active_runs: Arc<RwLock<HashMap<String, JoinHandle<()>>>>,
}

impl RunAdapter {
    pub fn new(store: Arc<dyn SessionStore>, registry: Arc<AssistantRegistry>) -> Self {
        Self {
            store,
            registry,
            active_runs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<AssistantRegistry> {
        &self.registry
    }

    /// Accept a run and execute it in the background
    pub async fn start(&self, request: RunRequest) -> Result<RunHandle> {
        let assistant = self.registry.resolve(request.assistant_id.as_deref())?;
        let assistant_id = assistant.assistant_id();

        let thread = match self.store.get(&request.thread_id).await {
            Ok(thread) => thread,
            Err(StoreError::ThreadNotFound(_)) => {
                self.store
                    .create(Some(request.thread_id.clone()), None)
                    .await?
            }
            Err(err) => return Err(err.into()),
        };
        let thread_id = thread.thread_id;

        let guard = self.store.acquire_run(&thread_id).await?;

        let mut metadata = ThreadMetadata::new();
        metadata.insert(ASSISTANT_METADATA_KEY.to_string(), json!(assistant_id));
        self.store.update_metadata(&thread_id, metadata).await?;
        self.store
            .set_status(&thread_id, ThreadStatus::Running)
            .await?;

        let run_id = Uuid::now_v7().to_string();
        let (emitter, events) = ChannelEventEmitter::channel();

        info!(
            run_id = %run_id,
            thread_id = %thread_id,
            assistant_id = %assistant_id,
            "Starting run"
        );

        let task = RunTask {
            store: Arc::clone(&self.store),
            assistant,
            run_id: run_id.clone(),
            thread_id: thread_id.clone(),
            input: request.input,
            emitter,
        };

        // Holding the map lock across spawn keeps the task's own removal
        // ordered after this insert.
        let mut active = self.active_runs.write().await;
        let active_runs = Arc::clone(&self.active_runs);
        let task_run_id = run_id.clone();
        let handle = tokio::spawn(async move {
            task.execute(guard).await;
            active_runs.write().await.remove(&task_run_id);
        });
        active.insert(run_id.clone(), handle);

        Ok(RunHandle {
            run_id,
            thread_id,
            assistant_id,
            events,
        })
    }

    /// Merge client-supplied values into a thread and record a checkpoint.
    ///
    /// The pipeline is chosen from the thread's current values, then from the
    /// assistant that last ran on it, then the default assistant. The thread's
    /// run lock is held throughout, so a thread with an active run is refused.
    pub async fn update_state(
        &self,
        thread_id: &str,
        values: Option<Value>,
        as_node: Option<String>,
    ) -> Result<Checkpoint> {
        let _guard = self.store.acquire_run(thread_id).await?;
        let thread = self.store.get(thread_id).await?;

        if let Some(values) = values {
            let assistant = match thread.values.as_ref().and_then(|v| self.registry.owner_of(v)) {
                Some(assistant) => assistant,
                None => {
                    let last = thread
                        .metadata
                        .get(ASSISTANT_METADATA_KEY)
                        .and_then(Value::as_str);
                    self.registry.resolve(last)?
                }
            };
            let merged = assistant.apply_state_update(thread.values.as_ref(), values, thread_id)?;
            self.store.update_values(thread_id, merged).await?;
        }

        if let Some(node) = as_node {
            let mut metadata = ThreadMetadata::new();
            metadata.insert("next".to_string(), json!([node]));
            self.store.update_metadata(thread_id, metadata).await?;
        }

        let checkpoint_id = Uuid::now_v7().to_string();
        self.store
            .set_checkpoint(thread_id, Some(checkpoint_id.clone()))
            .await?;
        self.store.record_history(thread_id, &checkpoint_id).await?;
        info!(thread_id = %thread_id, checkpoint_id = %checkpoint_id, "Thread state updated");

        Ok(Checkpoint::new(checkpoint_id))
    }

    pub async fn is_running(&self, run_id: &str) -> bool {
        self.active_runs.read().await.contains_key(run_id)
    }

    pub async fn active_count(&self) -> usize {
        self.active_runs.read().await.len()
    }

    /// Abort every in-flight run
    pub async fn shutdown(&self) {
        info!("Shutting down run adapter");
        let mut runs = self.active_runs.write().await;
        for (run_id, handle) in runs.drain() {
            info!(run_id = %run_id, "Aborting run on shutdown");
            handle.abort();
        }
    }
}

// ============================================================================
// RunTask
// ============================================================================

struct RunTask {
    store: Arc<dyn SessionStore>,
    assistant: Arc<dyn Assistant>,
    run_id: String,
    thread_id: String,
    input: Value,
    emitter: ChannelEventEmitter,
}

impl RunTask {
    async fn execute(self, _guard: RunGuard) {
        self.send(GeneratorEvent::RunStarted {
            run_id: self.run_id.clone(),
            thread_id: self.thread_id.clone(),
        })
        .await;

        match self.drive().await {
            Ok(result) => {
                info!(
                    run_id = %self.run_id,
                    thread_id = %self.thread_id,
                    completed_step = %result.completed_step,
                    "Run finished"
                );
                self.send(GeneratorEvent::RunFinished {
                    run_id: self.run_id.clone(),
                    summary: result.summary,
                    completed_step: result.completed_step,
                })
                .await;
            }
            Err(e) => {
                error!(
                    run_id = %self.run_id,
                    thread_id = %self.thread_id,
                    error = %e,
                    "Run failed"
                );
                self.send(GeneratorEvent::Error {
                    run_id: self.run_id.clone(),
                    message: e.to_string(),
                })
                .await;
                if let Err(err) = self.store.set_status(&self.thread_id, ThreadStatus::Idle).await {
                    warn!(thread_id = %self.thread_id, error = %err, "Failed to reset thread status");
                }
            }
        }
    }

    /// Run the assistant, then mark the thread completed and checkpoint it
    async fn drive(&self) -> Result<RunResult> {
        let prior = self.store.get(&self.thread_id).await?.values;

        let result = self
            .assistant
            .run(AssistantRun {
                run_id: &self.run_id,
                thread_id: &self.thread_id,
                input: self.input.clone(),
                prior,
                store: Arc::clone(&self.store),
                emitter: &self.emitter,
            })
            .await?;

        self.store
            .set_status(&self.thread_id, ThreadStatus::Completed)
            .await?;
        let checkpoint_id = Uuid::now_v7().to_string();
        self.store
            .set_checkpoint(&self.thread_id, Some(checkpoint_id.clone()))
            .await?;
        self.store
            .record_history(&self.thread_id, &checkpoint_id)
            .await?;

        Ok(result)
    }

    async fn send(&self, event: GeneratorEvent) {
        if let Err(e) = self.emitter.emit(event).await {
            warn!(run_id = %self.run_id, error = %e, "Failed to emit run event");
        }
    }
}
