// Generator events for streaming
//
// GeneratorEvent is the vocabulary of the run stream. Each variant maps to
// one SSE frame: `event_type()` is the frame name, `payload()` its JSON data.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::linear::Artifact;
use crate::step::StepStatusEntry;

/// Payload of an `approval-required` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub step_id: String,
    pub label: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

/// Events emitted while a run executes
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratorEvent {
    /// Run accepted and started
    RunStarted { run_id: String, thread_id: String },

    /// A step changed status
    StepStatus(StepStatusEntry),

    /// Overall pipeline progress in percent
    Progress { pct: u8 },

    /// PRD markdown produced or revised
    Prd { prd: String },

    /// A generated file
    Artifact { file: Artifact },

    /// Human-readable log line
    Log { text: String },

    /// The run suspended at a human approval gate
    ApprovalRequired(ApprovalRequest),

    /// A reviewer rejected a gated step
    ApprovalRejected { step_id: String, feedback: String },

    /// Full state snapshot after a merge
    Values(Value),

    /// The run failed
    Error { run_id: String, message: String },

    /// The run ended (suspended or halted)
    RunFinished {
        run_id: String,
        summary: String,
        completed_step: String,
    },
}

impl GeneratorEvent {
    pub fn log(text: impl Into<String>) -> Self {
        GeneratorEvent::Log { text: text.into() }
    }

    pub fn progress(pct: u8) -> Self {
        GeneratorEvent::Progress { pct }
    }

    pub fn artifact(file: Artifact) -> Self {
        GeneratorEvent::Artifact { file }
    }

    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            GeneratorEvent::RunStarted { .. } => "run-started",
            GeneratorEvent::StepStatus(_) => "step-status",
            GeneratorEvent::Progress { .. } => "progress",
            GeneratorEvent::Prd { .. } => "prd",
            GeneratorEvent::Artifact { .. } => "artifact",
            GeneratorEvent::Log { .. } => "log",
            GeneratorEvent::ApprovalRequired(_) => "approval-required",
            GeneratorEvent::ApprovalRejected { .. } => "approval-rejected",
            GeneratorEvent::Values(_) => "values",
            GeneratorEvent::Error { .. } => "error",
            GeneratorEvent::RunFinished { .. } => "run-finished",
        }
    }

    /// SSE data payload
    pub fn payload(&self) -> Value {
        match self {
            GeneratorEvent::RunStarted { run_id, thread_id } => {
                json!({ "runId": run_id, "threadId": thread_id })
            }
            GeneratorEvent::StepStatus(entry) => json!(entry),
            GeneratorEvent::Progress { pct } => json!({ "pct": pct }),
            GeneratorEvent::Prd { prd } => json!({ "prd": prd }),
            GeneratorEvent::Artifact { file } => json!({ "file": file }),
            GeneratorEvent::Log { text } => json!({ "text": text }),
            GeneratorEvent::ApprovalRequired(request) => json!(request),
            GeneratorEvent::ApprovalRejected { step_id, feedback } => {
                json!({ "stepId": step_id, "feedback": feedback })
            }
            GeneratorEvent::Values(values) => values.clone(),
            GeneratorEvent::Error { run_id, message } => {
                json!({ "runId": run_id, "message": message })
            }
            GeneratorEvent::RunFinished {
                run_id,
                summary,
                completed_step,
            } => json!({
                "runId": run_id,
                "summary": summary,
                "completedStep": completed_step,
            }),
        }
    }
}
