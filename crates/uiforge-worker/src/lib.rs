// Run execution for UIForge
//
// This crate connects the generator engine to threads and clients:
// - RunAdapter: accepts runs, executes them in background tasks, commits
//   status/checkpoints and streams events over a channel
// - AssistantRegistry: the published pipelines (v0-generator, v0-generator-subgraphs)
// - Adapters: channel-backed EventEmitter and store-backed StateSink

pub mod adapters;
pub mod assistants;
pub mod error;
pub mod models;
pub mod registry;
pub mod runner;

pub use adapters::{ChannelEventEmitter, ThreadStateSink};
pub use assistants::{Assistant, AssistantRun, RunResult, ScaffoldAssistant, SupervisorAssistant};
pub use error::{Result, RunError};
pub use models::{AssistantSummary, GraphEdge, GraphInfo, GraphNode, GraphSchemas};
pub use registry::AssistantRegistry;
pub use runner::{RunAdapter, RunHandle, RunRequest, ASSISTANT_METADATA_KEY};
