// Scaffold assistant (v0-generator)
//
// The seven-step linear pipeline with an approval gate after the PRD.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};
use uiforge_core::{
    Channels, Engine, LlmDriver, LlmSettings, RunContext, RunOutcome, ScaffoldInput,
    ScaffoldState, ScaffoldStep, ScaffoldUpdate, ScaffoldWorkflow, StateSink, StepKey,
    SCAFFOLD_WORKFLOW_ID,
};
use uiforge_storage::ThreadValues;

use super::{Assistant, AssistantRun, RunResult};
use crate::adapters::ThreadStateSink;
use crate::error::{Result, RunError};
use crate::models::{AssistantSummary, GraphInfo, GraphSchemas};

pub struct ScaffoldAssistant {
    workflow: ScaffoldWorkflow,
    engine: Engine,
}

impl ScaffoldAssistant {
    pub fn new(llm: Arc<dyn LlmDriver>, settings: &LlmSettings) -> Self {
        Self {
            workflow: ScaffoldWorkflow::new(llm, settings),
            engine: Engine::new(),
        }
    }
}

#[async_trait]
impl Assistant for ScaffoldAssistant {
    fn summary(&self) -> AssistantSummary {
        AssistantSummary {
            assistant_id: SCAFFOLD_WORKFLOW_ID.to_string(),
            graph_id: SCAFFOLD_WORKFLOW_ID.to_string(),
            name: "V0 Generator".to_string(),
            description: "Transforms natural language briefs into Tailwind UI previews."
                .to_string(),
            metadata: json!({ "tags": ["ui", "preview", "ag-ui"] }),
        }
    }

    fn graph(&self) -> GraphInfo {
        let steps: Vec<(&str, &str)> = ScaffoldStep::ALL
            .iter()
            .map(|step| (step.id(), step.label()))
            .collect();
        GraphInfo::chain(&steps)
    }

    fn schemas(&self) -> GraphSchemas {
        GraphSchemas {
            graph_id: SCAFFOLD_WORKFLOW_ID.to_string(),
            input_schema: json!({
                "type": "object",
                "title": "GeneratorInput",
                "properties": {
                    "messages": { "type": "array" },
                    "prompt": { "type": "string" },
                    "approval": {
                        "type": "object",
                        "properties": {
                            "step": { "type": "string" },
                            "status": { "type": "string", "enum": ["approved", "rejected"] },
                            "feedback": { "type": "string" },
                        },
                    },
                },
            }),
            output_schema: json!({
                "type": "object",
                "title": "GeneratorOutput",
                "properties": {
                    "componentCode": { "type": "string" },
                    "approved": { "type": "boolean" },
                    "currentStep": { "type": "string" },
                    "steps": { "type": "object" },
                    "artifacts": { "type": "array" },
                    "logs": { "type": "array" },
                    "prd": { "type": "string" },
                    "progress": { "type": "number" },
                    "awaitingApproval": { "type": "boolean" },
                    "pendingApprovalStep": { "type": ["string", "null"] },
                },
            }),
            state_schema: json!({
                "type": "object",
                "title": "GeneratorState",
                "properties": {
                    "prompt": { "type": ["string", "null"] },
                    "feedback": { "type": ["string", "null"] },
                    "currentStep": {
                        "type": "string",
                        "enum": ["idle", "spec", "schema", "ui", "apis", "build", "fix", "done", "complete"],
                    },
                },
            }),
            config_schema: json!({
                "type": "object",
                "title": "GeneratorConfig",
                "properties": {},
            }),
        }
    }

    fn owns(&self, values: &ThreadValues) -> bool {
        values.as_linear().is_some()
    }

    async fn run<'a>(&self, run: AssistantRun<'a>) -> Result<RunResult> {
        let input: ScaffoldInput =
            serde_json::from_value(run.input).map_err(RunError::invalid_input)?;
        let mut state = match run.prior {
            Some(ThreadValues::Linear(state)) => *state,
            Some(ThreadValues::Supervisor(_)) => {
                warn!(
                    thread_id = %run.thread_id,
                    "Thread holds supervisor values; starting a new scaffold"
                );
                ScaffoldState::default()
            }
            None => ScaffoldState::default(),
        };

        ScaffoldWorkflow::accept_input(&mut state, input, run.emitter).await?;
        let sink = ThreadStateSink::new(Arc::clone(&run.store), run.thread_id, run.emitter);
        sink.emit_state(&state).await?;

        info!(
            run_id = %run.run_id,
            thread_id = %run.thread_id,
            step = state.current_step.as_str(),
            "Scaffold run resumed"
        );

        let ctx: RunContext<'_, ScaffoldState> = RunContext::new(run.emitter, &sink);
        let outcome = self.engine.run(&self.workflow, &mut state, &ctx).await?;

        let completed_step = match outcome {
            RunOutcome::Suspended(step) => step.id().to_string(),
            RunOutcome::Halted(_) => state.current_step.as_str().to_string(),
        };
        Ok(RunResult {
            summary: state.status_summary(),
            completed_step,
        })
    }

    fn apply_state_update(
        &self,
        prior: Option<&ThreadValues>,
        values: Value,
        _thread_id: &str,
    ) -> Result<ThreadValues> {
        let update: ScaffoldUpdate =
            serde_json::from_value(values).map_err(RunError::invalid_input)?;
        let mut state = prior
            .and_then(ThreadValues::as_linear)
            .cloned()
            .unwrap_or_default();
        state.apply(update);
        Ok(state.into())
    }
}
