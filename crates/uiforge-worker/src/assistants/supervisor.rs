// Supervisor assistant (v0-generator-subgraphs)
//
// Requirements -> design -> code -> preview, with a review gate at preview.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};
use uiforge_core::{
    Channels, Engine, LlmDriver, RunContext, SessionState, StateSink, StateUpdate, StepKey,
    Supervisor, SupervisorConfig, SupervisorInput, SupervisorStep, SUPERVISOR_WORKFLOW_ID,
};
use uiforge_storage::ThreadValues;

use super::{Assistant, AssistantRun, RunResult};
use crate::adapters::ThreadStateSink;
use crate::error::{Result, RunError};
use crate::models::{AssistantSummary, GraphEdge, GraphInfo, GraphNode, GraphSchemas};

pub struct SupervisorAssistant {
    workflow: Supervisor,
    engine: Engine,
    max_iterations: u32,
}

impl SupervisorAssistant {
    pub fn new(llm: Arc<dyn LlmDriver>, config: &SupervisorConfig) -> Self {
        Self {
            workflow: Supervisor::new(llm, config),
            engine: Engine::new(),
            max_iterations: config.max_iterations,
        }
    }

    fn node_id(step: SupervisorStep) -> &'static str {
        match step {
            SupervisorStep::Requirements => "requirements_parser",
            SupervisorStep::Design => "component_designer",
            SupervisorStep::Code => "code_generator",
            SupervisorStep::Preview => "preview_iteration",
        }
    }

    fn prior_session(prior: Option<ThreadValues>, thread_id: &str) -> Option<SessionState> {
        match prior {
            Some(ThreadValues::Supervisor(state)) => Some(*state),
            Some(ThreadValues::Linear(_)) => {
                warn!(
                    thread_id = %thread_id,
                    "Thread holds scaffold values; starting a new supervisor session"
                );
                None
            }
            None => None,
        }
    }
}

/// The parts of a session that run input can change
#[derive(Debug, Default, PartialEq)]
struct InputMark {
    messages: usize,
    user_approval: bool,
    feedback: Option<String>,
}

impl InputMark {
    fn of(state: &SessionState) -> Self {
        Self {
            messages: state.messages.len(),
            user_approval: state.user_approval,
            feedback: state.feedback.clone(),
        }
    }
}

#[async_trait]
impl Assistant for SupervisorAssistant {
    fn summary(&self) -> AssistantSummary {
        AssistantSummary {
            assistant_id: SUPERVISOR_WORKFLOW_ID.to_string(),
            graph_id: SUPERVISOR_WORKFLOW_ID.to_string(),
            name: "V0 Generator (Subgraph Architecture)".to_string(),
            description:
                "Multi-agent system with 4 specialized subgraphs for component generation"
                    .to_string(),
            metadata: json!({
                "tags": ["ui", "preview", "ag-ui", "subgraphs"],
                "version": "2.0.0",
            }),
        }
    }

    fn graph(&self) -> GraphInfo {
        let mut nodes = vec![
            GraphNode::new("__start__", "Start"),
            GraphNode::new("router", "Router"),
        ];
        let mut edges = vec![GraphEdge::new("__start__", "router")];

        let descriptions = [
            "Extracts structured requirements from the request",
            "Maps requirements to a layout and styling plan",
            "Renders the design as self-contained HTML",
            "Waits for approval or feedback on the preview",
        ];
        for (step, description) in SupervisorStep::ALL.into_iter().zip(descriptions) {
            let id = Self::node_id(step);
            nodes.push(GraphNode::new(id, step.label()).describe(description));
            edges.push(GraphEdge::new("router", id));
            edges.push(GraphEdge::new(id, "router"));
        }

        nodes.push(GraphNode::new("__end__", "End"));
        edges.push(GraphEdge::new("router", "__end__"));
        GraphInfo { nodes, edges }
    }

    fn schemas(&self) -> GraphSchemas {
        GraphSchemas {
            graph_id: SUPERVISOR_WORKFLOW_ID.to_string(),
            input_schema: json!({
                "type": "object",
                "title": "V0GeneratorInput",
                "properties": {
                    "messages": { "type": "array" },
                    "userApproval": { "type": "boolean" },
                    "feedback": { "type": ["string", "null"] },
                },
            }),
            output_schema: json!({
                "type": "object",
                "title": "V0GeneratorOutput",
                "properties": {
                    "messages": { "type": "array" },
                    "componentState": { "type": "object" },
                    "currentStep": { "type": "string" },
                    "requirements": { "type": "object" },
                    "designSpec": { "type": "object" },
                },
            }),
            state_schema: json!({
                "type": "object",
                "title": "V0GeneratorState",
                "properties": {
                    "sessionId": { "type": "string" },
                    "currentStep": {
                        "type": "string",
                        "enum": ["requirements", "design", "code", "preview", "approved", "rejected"],
                    },
                    "userApproval": { "type": "boolean" },
                    "feedback": { "type": ["string", "null"] },
                    "iterationCount": { "type": "integer" },
                },
            }),
            config_schema: json!({
                "type": "object",
                "title": "V0GeneratorConfig",
                "properties": {
                    "maxIterations": {
                        "type": "integer",
                        "minimum": 1,
                        "default": self.max_iterations,
                    },
                },
            }),
        }
    }

    fn owns(&self, values: &ThreadValues) -> bool {
        values.as_supervisor().is_some()
    }

    async fn run<'a>(&self, run: AssistantRun<'a>) -> Result<RunResult> {
        let input: SupervisorInput =
            serde_json::from_value(run.input).map_err(RunError::invalid_input)?;
        let prior = Self::prior_session(run.prior, run.thread_id);
        let before = prior.as_ref().map(InputMark::of).unwrap_or_default();
        let mut state = Supervisor::accept_input(prior, input, run.thread_id);

        // Input that adds nothing is not committed; a run that then fails
        // leaves the thread untouched.
        let sink = ThreadStateSink::new(Arc::clone(&run.store), run.thread_id, run.emitter);
        if InputMark::of(&state) != before {
            sink.emit_state(&state).await?;
        }

        info!(
            run_id = %run.run_id,
            thread_id = %run.thread_id,
            step = %state.current_step,
            "Supervisor run resumed"
        );

        let ctx: RunContext<'_, SessionState> = RunContext::new(run.emitter, &sink);
        self.engine.run(&self.workflow, &mut state, &ctx).await?;

        Ok(RunResult {
            summary: state.status_summary(),
            completed_step: state.current_step.to_string(),
        })
    }

    fn apply_state_update(
        &self,
        prior: Option<&ThreadValues>,
        values: Value,
        thread_id: &str,
    ) -> Result<ThreadValues> {
        let update: StateUpdate = serde_json::from_value(values).map_err(RunError::invalid_input)?;
        let mut state = prior
            .and_then(ThreadValues::as_supervisor)
            .cloned()
            .unwrap_or_else(|| SessionState::new(thread_id));
        state.apply(update.touch());
        Ok(state.into())
    }
}
