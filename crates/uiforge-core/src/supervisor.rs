// Supervisor / Router
//
// The supervisor table decides which generation step runs next from the
// session's FSM position and its transient decision fields:
//
//   requirements            -> run requirements
//   design                  -> run design
//   code                    -> run code
//   preview + approval      -> halt(approved)
//   preview + feedback      -> run requirements (loop back)
//   preview                 -> run preview (suspends for review)
//   approved                -> halt
//   rejected                -> run requirements
//   anything else           -> run requirements (warns)
//
// The preview step owns the human decision. When the route leaves preview
// (approval or feedback), the engine first dispatches preview as a gate so
// the decision is committed (approval message, feedback turned into a user
// message, iteration count bumped) before the routed action proceeds.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use crate::channels::{Channels, StateUpdate};
use crate::config::SupervisorConfig;
use crate::engine::{HaltReason, NextAction, Workflow};
use crate::error::{GeneratorError, Result};
use crate::events::{ApprovalRequest, GeneratorEvent};
use crate::llm_drivers::{LlmCallConfig, LlmDriver};
use crate::markup::excerpt;
use crate::message::IncomingMessage;
use crate::state::{SessionState, Stage};
use crate::step::{GenerationStep, StepKey};
use crate::steps::{
    CodeGenerator, ComponentDesigner, PreviewIteration, RequirementsParser, SupervisorStep,
    READY_MESSAGE,
};
use crate::traits::EventEmitter;

/// Assistant id of the supervisor pipeline
pub const SUPERVISOR_WORKFLOW_ID: &str = "v0-generator-subgraphs";

/// Route a session to its next action; total over every state
pub fn route(state: &SessionState) -> NextAction<SupervisorStep> {
    match &state.current_step {
        Stage::Requirements => NextAction::Run(SupervisorStep::Requirements),
        Stage::Design => NextAction::Run(SupervisorStep::Design),
        Stage::Code => NextAction::Run(SupervisorStep::Code),
        Stage::Preview if state.user_approval => NextAction::Halt(HaltReason::Approved),
        Stage::Preview if state.pending_feedback().is_some() => {
            NextAction::Run(SupervisorStep::Requirements)
        }
        Stage::Preview => NextAction::Run(SupervisorStep::Preview),
        Stage::Approved => NextAction::Halt(HaltReason::End),
        Stage::Rejected => NextAction::Run(SupervisorStep::Requirements),
        Stage::Unknown(name) => {
            warn!(
                session_id = %state.session_id,
                error = %GeneratorError::UnknownStep(name.clone()),
                "Unrecognized step"
            );
            NextAction::Run(SupervisorStep::Requirements)
        }
    }
}

// ============================================================================
// Supervisor workflow
// ============================================================================

/// The four-step supervisor table with its collaborators
pub struct Supervisor {
    requirements: RequirementsParser,
    design: ComponentDesigner,
    code: CodeGenerator,
    preview: PreviewIteration,
}

impl Supervisor {
    pub fn new(llm: Arc<dyn LlmDriver>, config: &SupervisorConfig) -> Self {
        let requirements_config = LlmCallConfig::new(config.model.clone())
            .with_temperature(config.requirements_temperature);
        let code_config =
            LlmCallConfig::new(config.model.clone()).with_temperature(config.code_temperature);

        Self {
            requirements: RequirementsParser::new(Arc::clone(&llm), requirements_config),
            design: ComponentDesigner,
            code: CodeGenerator::new(llm, code_config),
            preview: PreviewIteration::new(config.max_iterations),
        }
    }

    /// Fold run input into the prior session (or start a new one)
    pub fn accept_input(
        prior: Option<SessionState>,
        input: SupervisorInput,
        session_id: &str,
    ) -> SessionState {
        let mut state = prior.unwrap_or_else(|| SessionState::new(session_id));

        let mut update = StateUpdate::new().touch();
        for incoming in input.messages {
            let message = incoming.into_message();
            let seen = state.messages.iter().any(|m| m.id == message.id)
                || update.messages.iter().any(|m| m.id == message.id);
            if !seen {
                update.messages.push(message);
            }
        }

        let approved = input.user_approval.unwrap_or(false);
        let feedback = input
            .feedback
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());
        update = update
            .user_approval(approved)
            .feedback(if approved { None } else { feedback });

        state.apply(update);
        state
    }
}

/// Run input for the supervisor pipeline
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SupervisorInput {
    pub messages: Vec<IncomingMessage>,
    pub user_approval: Option<bool>,
    pub feedback: Option<String>,
}

#[async_trait]
impl Workflow for Supervisor {
    type State = SessionState;
    type Step = SupervisorStep;

    fn id(&self) -> &'static str {
        SUPERVISOR_WORKFLOW_ID
    }

    fn steps(&self) -> &'static [SupervisorStep] {
        &SupervisorStep::ALL
    }

    fn route(&self, state: &SessionState) -> NextAction<SupervisorStep> {
        route(state)
    }

    fn handler(&self, step: SupervisorStep) -> &dyn GenerationStep<SessionState> {
        match step {
            SupervisorStep::Requirements => &self.requirements,
            SupervisorStep::Design => &self.design,
            SupervisorStep::Code => &self.code,
            SupervisorStep::Preview => &self.preview,
        }
    }

    fn gate_commit(
        &self,
        state: &SessionState,
        action: &NextAction<SupervisorStep>,
    ) -> Option<SupervisorStep> {
        let leaving_preview = state.current_step == Stage::Preview
            && *action != NextAction::Run(SupervisorStep::Preview);
        leaving_preview.then_some(SupervisorStep::Preview)
    }

    async fn on_suspend(
        &self,
        step: SupervisorStep,
        state: &SessionState,
        emitter: &dyn EventEmitter,
    ) -> Result<()> {
        let excerpt = state
            .component_state
            .as_ref()
            .map(|component| excerpt(&component.code, 10));
        emitter
            .emit(GeneratorEvent::ApprovalRequired(ApprovalRequest {
                step_id: step.id().to_string(),
                label: step.label().to_string(),
                message: READY_MESSAGE.to_string(),
                artifact_path: None,
                excerpt,
            }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn at(stage: Stage) -> SessionState {
        let mut state = SessionState::new("s");
        state.current_step = stage;
        state
    }

    #[test]
    fn test_route_table() {
        assert_eq!(
            route(&at(Stage::Requirements)),
            NextAction::Run(SupervisorStep::Requirements)
        );
        assert_eq!(route(&at(Stage::Design)), NextAction::Run(SupervisorStep::Design));
        assert_eq!(route(&at(Stage::Code)), NextAction::Run(SupervisorStep::Code));
        assert_eq!(route(&at(Stage::Preview)), NextAction::Run(SupervisorStep::Preview));
        assert_eq!(
            route(&at(Stage::Rejected)),
            NextAction::Run(SupervisorStep::Requirements)
        );

        let mut approved = at(Stage::Preview);
        approved.user_approval = true;
        assert_eq!(route(&approved), NextAction::Halt(HaltReason::Approved));

        let mut feedback = at(Stage::Preview);
        feedback.feedback = Some("make it blue".to_string());
        assert_eq!(route(&feedback), NextAction::Run(SupervisorStep::Requirements));

        let mut blank = at(Stage::Preview);
        blank.feedback = Some("  ".to_string());
        assert_eq!(route(&blank), NextAction::Run(SupervisorStep::Preview));
    }

    #[test]
    fn test_route_is_total_over_arbitrary_names() {
        for name in ["", "export", "PREVIEW", "design ", "🚀", "requirements\n"] {
            let state = at(Stage::from(name));
            assert_eq!(route(&state), NextAction::Run(SupervisorStep::Requirements));
        }
    }

    #[test]
    fn test_approved_always_halts() {
        for (approval, feedback) in [(false, None), (true, None), (false, Some("x")), (true, Some("y"))] {
            let mut state = at(Stage::Approved);
            state.user_approval = approval;
            state.feedback = feedback.map(str::to_string);
            state.iteration_count = 9;
            assert_eq!(route(&state), NextAction::Halt(HaltReason::End));
        }
    }

    #[test]
    fn test_accept_input_new_session() {
        let input: SupervisorInput = serde_json::from_value(serde_json::json!({
            "messages": [{"id": "m1", "role": "user", "content": "Build a todo app"}]
        }))
        .unwrap();
        let state = Supervisor::accept_input(None, input, "thread-1");

        assert_eq!(state.session_id, "thread-1");
        assert_eq!(state.current_step, Stage::Requirements);
        assert_eq!(state.messages.len(), 1);
        assert!(!state.user_approval);
    }

    #[test]
    fn test_accept_input_skips_known_messages_and_prefers_approval() {
        let mut prior = at(Stage::Preview);
        let mut first = Message::user("hello");
        first.id = "m1".to_string();
        prior.messages.push(first);

        let input: SupervisorInput = serde_json::from_value(serde_json::json!({
            "messages": [
                {"id": "m1", "role": "user", "content": "hello"},
                {"id": "m2", "role": "user", "content": "looks good"},
                {"id": "m2", "role": "user", "content": "looks good"}
            ],
            "userApproval": true,
            "feedback": "but bigger"
        }))
        .unwrap();
        let state = Supervisor::accept_input(Some(prior), input, "ignored");

        assert_eq!(state.session_id, "s");
        assert_eq!(state.messages.len(), 2);
        assert!(state.user_approval);
        assert_eq!(state.feedback, None);
    }

    #[test]
    fn test_accept_input_clears_stale_decision() {
        let mut prior = at(Stage::Preview);
        prior.user_approval = true;
        prior.feedback = Some("old".to_string());

        let state = Supervisor::accept_input(Some(prior), SupervisorInput::default(), "s");
        assert!(!state.user_approval);
        assert_eq!(state.feedback, None);
    }
}
