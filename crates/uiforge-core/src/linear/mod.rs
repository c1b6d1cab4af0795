// Linear scaffold pipeline
//
// Seven fixed steps: spec -> schema -> ui -> apis -> build -> fix -> done.
// Routing runs the first step that has not succeeded. The `spec` step parks the
// run at an approval gate; the next run's input carries the reviewer's
// decision, which is folded into state before the engine resumes:
//
//   approved -> spec marked success, pipeline continues with schema
//   rejected -> spec marked error with the feedback, spec runs again
//
// The fix step is skipped whenever the build step succeeded.

mod documents;
mod state;
mod steps;
mod template;

pub use documents::{generate_api_routes, generate_prd, generate_schema, infer_modules, prd_title};
pub use state::{
    Artifact, ScaffoldStage, ScaffoldState, ScaffoldStep, ScaffoldUpdate, MAX_LOG_LINES,
};
pub use steps::{
    ApiDraft, AutoFix, BuildCheck, Finish, SchemaDraft, SpecDraft, UiScaffold, PREVIEW_PATH,
    PRD_PATH, ROUTES_PATH, SCHEMA_PATH,
};
pub use template::fallback_component;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::channels::Channels;
use crate::config::LlmSettings;
use crate::engine::{HaltReason, NextAction, Workflow};
use crate::error::Result;
use crate::events::{ApprovalRequest, GeneratorEvent};
use crate::llm_drivers::{LlmCallConfig, LlmDriver};
use crate::markup::excerpt;
use crate::message::{latest_user_text, IncomingMessage, Message};
use crate::step::{GenerationStep, StepKey, StepState, StepStatusEntry};
use crate::traits::EventEmitter;

/// Assistant id of the linear pipeline
pub const SCAFFOLD_WORKFLOW_ID: &str = "v0-generator";

/// Feedback recorded when a reviewer rejects without comment
pub const DEFAULT_REJECTION_FEEDBACK: &str = "Changes requested by reviewer.";

// ============================================================================
// Run input
// ============================================================================

/// Reviewer decision on a gated step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalDecision {
    /// Step id the decision applies to ("spec")
    pub step: String,
    pub status: ApprovalStatus,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Run input for the scaffold pipeline
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScaffoldInput {
    pub messages: Vec<IncomingMessage>,
    pub prompt: Option<String>,
    pub approval: Option<ApprovalDecision>,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Prompt for this run: latest user message, then the explicit prompt, then
/// whatever the thread already knows, then a timestamped default
fn resolve_prompt(messages: &[Message], explicit: Option<&str>, state: &ScaffoldState) -> String {
    latest_user_text(messages)
        .and_then(|text| non_blank(Some(&text)))
        .or_else(|| non_blank(explicit))
        .or_else(|| non_blank(state.prompt.as_deref()))
        .or_else(|| {
            state
                .prd
                .as_deref()
                .and_then(|prd| prd.lines().next())
                .map(|line| line.trim_start_matches('#').trim().to_string())
                .filter(|title| !title.is_empty())
        })
        .unwrap_or_else(|| format!("Generate a dashboard for: {}", Utc::now().to_rfc3339()))
}

// ============================================================================
// ScaffoldWorkflow
// ============================================================================

pub struct ScaffoldWorkflow {
    spec: SpecDraft,
    schema: SchemaDraft,
    ui: UiScaffold,
    apis: ApiDraft,
    build: BuildCheck,
    fix: AutoFix,
    done: Finish,
}

impl ScaffoldWorkflow {
    pub fn new(llm: Arc<dyn LlmDriver>, settings: &LlmSettings) -> Self {
        let ui_config =
            LlmCallConfig::new(settings.model.clone()).with_temperature(settings.temperature);
        Self {
            spec: SpecDraft,
            schema: SchemaDraft,
            ui: UiScaffold::new(llm, ui_config),
            apis: ApiDraft,
            build: BuildCheck,
            fix: AutoFix,
            done: Finish,
        }
    }

    /// Fold run input into thread state, committing any reviewer decision
    /// for the pending gate. Decisions for other steps are ignored.
    pub async fn accept_input(
        state: &mut ScaffoldState,
        input: ScaffoldInput,
        emitter: &dyn EventEmitter,
    ) -> Result<()> {
        let messages: Vec<Message> = input
            .messages
            .into_iter()
            .map(IncomingMessage::into_message)
            .collect();
        let prompt = resolve_prompt(&messages, input.prompt.as_deref(), state);

        let mut update = ScaffoldUpdate {
            prompt: Some(prompt),
            ..Default::default()
        };
        let mut events = Vec::new();

        let decision = state
            .pending_gate()
            .zip(input.approval)
            .filter(|(gate, decision)| decision.step == gate.id());

        if let Some((gate, decision)) = decision {
            match decision.status {
                ApprovalStatus::Approved => {
                    info!(step = gate.id(), "Gate approved");
                    let entry = StepStatusEntry::new(
                        gate,
                        StepState::Success,
                        Some("Approved by reviewer".to_string()),
                    );
                    let line = format!("{} approved by human reviewer.", gate.label());
                    events.push(GeneratorEvent::StepStatus(entry.clone()));
                    events.push(GeneratorEvent::log(line.clone()));

                    update.steps.push(entry);
                    update.logs.push(line);
                    update.approved = Some(true);
                    update.feedback = Some(None);
                }
                ApprovalStatus::Rejected => {
                    let feedback = non_blank(decision.feedback.as_deref())
                        .unwrap_or_else(|| DEFAULT_REJECTION_FEEDBACK.to_string());
                    info!(step = gate.id(), %feedback, "Gate rejected");
                    let entry =
                        StepStatusEntry::new(gate, StepState::Error, Some(feedback.clone()));
                    let line = format!("{} rejected: {}", gate.label(), feedback);
                    events.push(GeneratorEvent::StepStatus(entry.clone()));
                    events.push(GeneratorEvent::log(line.clone()));
                    events.push(GeneratorEvent::ApprovalRejected {
                        step_id: gate.id().to_string(),
                        feedback: feedback.clone(),
                    });

                    update.steps.push(entry);
                    update.logs.push(line);
                    update.approved = Some(false);
                    update.feedback = Some(Some(feedback));
                }
            }
            update.awaiting_approval = Some(false);
            update.pending_approval_step = Some(None);
        }

        state.apply(update);
        emitter.emit_batch(events).await
    }
}

/// First step still to run; fix only runs when the build did not succeed
pub fn route(state: &ScaffoldState) -> NextAction<ScaffoldStep> {
    if let Some(gate) = state.pending_gate() {
        return NextAction::Suspend(gate);
    }

    let build_ok = state.status_of(ScaffoldStep::Build) == StepState::Success;
    ScaffoldStep::ALL
        .into_iter()
        .filter(|step| state.status_of(*step) != StepState::Success)
        .find(|step| !(*step == ScaffoldStep::Fix && build_ok))
        .map(NextAction::Run)
        .unwrap_or(NextAction::Halt(HaltReason::End))
}

#[async_trait]
impl Workflow for ScaffoldWorkflow {
    type State = ScaffoldState;
    type Step = ScaffoldStep;

    fn id(&self) -> &'static str {
        SCAFFOLD_WORKFLOW_ID
    }

    fn steps(&self) -> &'static [ScaffoldStep] {
        &ScaffoldStep::ALL
    }

    fn route(&self, state: &ScaffoldState) -> NextAction<ScaffoldStep> {
        route(state)
    }

    fn handler(&self, step: ScaffoldStep) -> &dyn GenerationStep<ScaffoldState> {
        match step {
            ScaffoldStep::Spec => &self.spec,
            ScaffoldStep::Schema => &self.schema,
            ScaffoldStep::Ui => &self.ui,
            ScaffoldStep::Apis => &self.apis,
            ScaffoldStep::Build => &self.build,
            ScaffoldStep::Fix => &self.fix,
            ScaffoldStep::Done => &self.done,
        }
    }

    fn status_update(&self, entry: &StepStatusEntry, step: ScaffoldStep) -> Option<ScaffoldUpdate> {
        let update = ScaffoldUpdate::new().step_status(entry.clone());
        Some(if entry.status == StepState::Running {
            update.current_step(step.into())
        } else {
            update
        })
    }

    async fn on_suspend(
        &self,
        step: ScaffoldStep,
        state: &ScaffoldState,
        emitter: &dyn EventEmitter,
    ) -> Result<()> {
        let (message, artifact_path) = match step {
            ScaffoldStep::Spec => (
                "Review the PRD draft and approve to continue.".to_string(),
                Some(PRD_PATH.to_string()),
            ),
            other => (format!("Review {} and approve to continue.", other.label()), None),
        };
        emitter
            .emit(GeneratorEvent::ApprovalRequired(ApprovalRequest {
                step_id: step.id().to_string(),
                label: step.label().to_string(),
                message,
                artifact_path,
                excerpt: state.prd.as_deref().map(|prd| excerpt(prd, 10)),
            }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_fresh_state_runs_spec() {
        assert_eq!(
            route(&ScaffoldState::default()),
            NextAction::Run(ScaffoldStep::Spec)
        );
    }

    #[test]
    fn test_route_suspends_at_pending_gate() {
        let mut state = ScaffoldState::default();
        state.prd = Some("# PRD".into());
        state.awaiting_approval = true;
        state.pending_approval_step = Some(ScaffoldStep::Spec);
        assert_eq!(route(&state), NextAction::Suspend(ScaffoldStep::Spec));
    }

    #[test]
    fn test_route_skips_fix_after_green_build() {
        let mut state = ScaffoldState::default();
        for step in [
            ScaffoldStep::Spec,
            ScaffoldStep::Schema,
            ScaffoldStep::Ui,
            ScaffoldStep::Apis,
            ScaffoldStep::Build,
        ] {
            state
                .steps
                .insert(step.id().into(), StepStatusEntry::new(step, StepState::Success, None));
        }
        assert_eq!(route(&state), NextAction::Run(ScaffoldStep::Done));

        state.steps.insert(
            "build".into(),
            StepStatusEntry::new(ScaffoldStep::Build, StepState::Error, None),
        );
        assert_eq!(route(&state), NextAction::Run(ScaffoldStep::Build));
    }

    #[test]
    fn test_route_halts_when_everything_succeeded() {
        let mut state = ScaffoldState::default();
        for step in ScaffoldStep::ALL {
            if step != ScaffoldStep::Fix {
                state
                    .steps
                    .insert(step.id().into(), StepStatusEntry::new(step, StepState::Success, None));
            }
        }
        assert_eq!(route(&state), NextAction::Halt(HaltReason::End));
    }

    #[test]
    fn test_resolve_prompt_order() {
        let mut state = ScaffoldState::default();
        let messages = vec![Message::user("  a clinic app ")];
        assert_eq!(resolve_prompt(&messages, Some("other"), &state), "a clinic app");
        assert_eq!(resolve_prompt(&[], Some("other"), &state), "other");

        state.prd = Some("# Task Tracker\n\n## Overview".into());
        assert_eq!(resolve_prompt(&[], None, &state), "Task Tracker");

        state.prompt = Some("stored brief".into());
        assert_eq!(resolve_prompt(&[], Some("  "), &state), "stored brief");

        let fallback = resolve_prompt(&[], None, &ScaffoldState::default());
        assert!(fallback.starts_with("Generate a dashboard for: "));
    }

    #[tokio::test]
    async fn test_decision_for_other_step_is_ignored() {
        let mut state = ScaffoldState::default();
        state.prd = Some("# PRD".into());
        state.awaiting_approval = true;
        state.pending_approval_step = Some(ScaffoldStep::Spec);

        let input: ScaffoldInput = serde_json::from_value(serde_json::json!({
            "approval": {"step": "ui", "status": "approved"}
        }))
        .unwrap();
        ScaffoldWorkflow::accept_input(&mut state, input, &crate::traits::NoopEventEmitter)
            .await
            .unwrap();

        assert_eq!(state.pending_gate(), Some(ScaffoldStep::Spec));
        assert!(!state.approved);
    }
}
