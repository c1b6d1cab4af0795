// Integration tests for the linear scaffold pipeline
//
// spec -> schema -> ui -> apis -> build -> fix -> done, with the PRD approval
// gate after spec and the fix step skipped on a green build.

use std::sync::Arc;
use uiforge_core::{
    linear::{PREVIEW_PATH, PRD_PATH, ROUTES_PATH, SCHEMA_PATH},
    memory::{InMemoryEventEmitter, InMemoryStateSink, MockLlmDriver, MockLlmResponse},
    Engine, GeneratorEvent, HaltReason, LlmSettings, RunContext, RunOutcome, ScaffoldInput,
    ScaffoldStage, ScaffoldState, ScaffoldStep, ScaffoldWorkflow, StepState,
};

struct Harness {
    llm: Arc<MockLlmDriver>,
    workflow: ScaffoldWorkflow,
    emitter: InMemoryEventEmitter,
    sink: InMemoryStateSink<ScaffoldState>,
}

impl Harness {
    fn new(llm: MockLlmDriver) -> Self {
        let llm = Arc::new(llm);
        Self {
            workflow: ScaffoldWorkflow::new(llm.clone(), &LlmSettings::default()),
            llm,
            emitter: InMemoryEventEmitter::new(),
            sink: InMemoryStateSink::new(),
        }
    }

    async fn run(&self, state: &mut ScaffoldState, input: serde_json::Value) -> RunOutcome<ScaffoldStep> {
        let input: ScaffoldInput = serde_json::from_value(input).unwrap();
        ScaffoldWorkflow::accept_input(state, input, &self.emitter)
            .await
            .unwrap();
        Engine::new()
            .run(&self.workflow, state, &RunContext::new(&self.emitter, &self.sink))
            .await
            .unwrap()
    }
}

fn approve() -> serde_json::Value {
    serde_json::json!({ "approval": { "step": "spec", "status": "approved" } })
}

#[tokio::test]
async fn test_first_run_suspends_at_prd_gate() {
    let h = Harness::new(MockLlmDriver::new());
    let mut state = ScaffoldState::default();

    let outcome = h
        .run(
            &mut state,
            serde_json::json!({
                "messages": [{"type": "human", "content": "A clinic app for patients and appointments"}]
            }),
        )
        .await;

    assert_eq!(outcome, RunOutcome::Suspended(ScaffoldStep::Spec));
    assert_eq!(
        state.prompt.as_deref(),
        Some("A clinic app for patients and appointments")
    );
    assert!(state.awaiting_approval);
    assert_eq!(state.pending_approval_step, Some(ScaffoldStep::Spec));
    assert_eq!(state.status_of(ScaffoldStep::Spec), StepState::Waiting);
    assert_eq!(state.status_of(ScaffoldStep::Schema), StepState::Queued);
    assert_eq!(state.current_step, ScaffoldStage::Spec);
    assert_eq!(state.progress, 14);

    let prd = state.prd.as_deref().unwrap();
    assert!(prd.starts_with("# A Clinic App For Patients And Appointments"));
    assert!(prd.contains("- Patients"));
    assert!(prd.contains("- Appointments"));
    assert!(state.artifact(PRD_PATH).is_some());
    assert_eq!(h.llm.call_count().await, 0);

    let events = h.emitter.events().await;
    match events.last() {
        Some(GeneratorEvent::ApprovalRequired(request)) => {
            assert_eq!(request.step_id, "spec");
            assert_eq!(request.label, "PRD & Decisions");
            assert_eq!(request.artifact_path.as_deref(), Some(PRD_PATH));
            assert_eq!(
                request.excerpt.as_deref().map(|e| e.lines().count()),
                Some(10)
            );
        }
        other => panic!("expected approval-required, got {:?}", other),
    }
    let types = h.emitter.event_types().await;
    assert!(types.contains(&"prd"));
    assert!(types.contains(&"artifact"));
    assert!(types.contains(&"progress"));
}

#[tokio::test]
async fn test_run_without_decision_stays_suspended() {
    let h = Harness::new(MockLlmDriver::new());
    let mut state = ScaffoldState::default();
    h.run(&mut state, serde_json::json!({ "prompt": "task tracker" }))
        .await;
    let prd = state.prd.clone();
    h.emitter.clear().await;

    let outcome = h.run(&mut state, serde_json::json!({})).await;

    assert_eq!(outcome, RunOutcome::Suspended(ScaffoldStep::Spec));
    assert_eq!(state.prd, prd);
    assert_eq!(state.prompt.as_deref(), Some("task tracker"));
    assert_eq!(
        h.emitter.event_types().await,
        vec!["step-status", "approval-required"]
    );
}

#[tokio::test]
async fn test_approval_runs_to_completion_and_skips_fix() {
    let llm = MockLlmDriver::new();
    llm.add_response(MockLlmResponse::text(
        "```html\n<html><body><main class=\"p-6\">Inventory</main></body></html>\n```",
    ))
    .await;
    let h = Harness::new(llm);
    let mut state = ScaffoldState::default();
    h.run(&mut state, serde_json::json!({ "prompt": "inventory tracker" }))
        .await;

    let outcome = h.run(&mut state, approve()).await;

    assert_eq!(outcome, RunOutcome::Halted(HaltReason::End));
    assert!(state.approved);
    assert!(!state.awaiting_approval);
    assert_eq!(state.pending_approval_step, None);
    assert_eq!(state.current_step, ScaffoldStage::Complete);
    assert_eq!(state.progress, 100);
    assert_eq!(
        state.status_summary(),
        "Scaffold generated for: inventory tracker"
    );

    for step in ScaffoldStep::ALL {
        let expected = if step == ScaffoldStep::Fix {
            StepState::Queued
        } else {
            StepState::Success
        };
        assert_eq!(state.status_of(step), expected, "step {:?}", step);
    }

    assert_eq!(state.component_code, "<main class=\"p-6\">Inventory</main>");
    for path in [PRD_PATH, SCHEMA_PATH, PREVIEW_PATH, ROUTES_PATH] {
        assert!(state.artifact(path).is_some(), "missing {}", path);
    }
    assert!(state
        .logs
        .iter()
        .any(|line| line == "PRD & Decisions approved by human reviewer."));
    assert_eq!(
        state.logs.last().map(String::as_str),
        Some("All steps completed. Project ready for review.")
    );
    assert_eq!(h.llm.call_count().await, 1);

    // a finished pipeline halts immediately
    let before = state.clone();
    let outcome = h.run(&mut state, serde_json::json!({})).await;
    assert_eq!(outcome, RunOutcome::Halted(HaltReason::End));
    assert_eq!(state.steps, before.steps);
}

#[tokio::test]
async fn test_rejection_reenters_spec_with_feedback() {
    let h = Harness::new(MockLlmDriver::new());
    let mut state = ScaffoldState::default();
    h.run(&mut state, serde_json::json!({ "prompt": "project planner" }))
        .await;
    h.emitter.clear().await;

    let outcome = h
        .run(
            &mut state,
            serde_json::json!({
                "approval": { "step": "spec", "status": "rejected", "feedback": "add billing" }
            }),
        )
        .await;

    assert_eq!(outcome, RunOutcome::Suspended(ScaffoldStep::Spec));
    assert_eq!(state.feedback.as_deref(), Some("add billing"));
    assert!(state.awaiting_approval);
    assert!(!state.approved);
    assert!(state
        .prd
        .as_deref()
        .unwrap()
        .contains("## Reviewer Feedback\n- add billing"));

    let events = h.emitter.events().await;
    assert!(events.iter().any(|event| matches!(
        event,
        GeneratorEvent::ApprovalRejected { step_id, feedback }
            if step_id == "spec" && feedback == "add billing"
    )));
    assert!(events.iter().any(|event| matches!(
        event,
        GeneratorEvent::StepStatus(entry)
            if entry.id == "spec" && entry.status == StepState::Error
    )));

    // approving the revision clears the feedback
    h.run(&mut state, approve()).await;
    assert_eq!(state.feedback, None);
    assert_eq!(state.current_step, ScaffoldStage::Complete);
}

#[tokio::test]
async fn test_rejection_without_comment_uses_default_feedback() {
    let h = Harness::new(MockLlmDriver::new());
    let mut state = ScaffoldState::default();
    h.run(&mut state, serde_json::json!({ "prompt": "ticket desk" }))
        .await;

    h.run(
        &mut state,
        serde_json::json!({ "approval": { "step": "spec", "status": "rejected", "feedback": "  " } }),
    )
    .await;

    assert_eq!(
        state.feedback.as_deref(),
        Some("Changes requested by reviewer.")
    );
}

#[tokio::test]
async fn test_ui_step_falls_back_when_llm_fails() {
    let llm = MockLlmDriver::new().with_fallback(MockLlmResponse::error("401 unauthorized"));
    let h = Harness::new(llm);
    let mut state = ScaffoldState::default();
    h.run(&mut state, serde_json::json!({ "prompt": "patient portal" }))
        .await;

    let outcome = h.run(&mut state, approve()).await;

    assert_eq!(outcome, RunOutcome::Halted(HaltReason::End));
    assert!(state.component_code.contains("Patient Portal"));
    assert_eq!(state.status_of(ScaffoldStep::Ui), StepState::Success);
    assert_eq!(
        state
            .artifact(PREVIEW_PATH)
            .map(|artifact| artifact.contents.clone()),
        Some(state.component_code.clone())
    );
}

#[tokio::test]
async fn test_every_merge_is_committed() {
    let h = Harness::new(MockLlmDriver::new());
    let mut state = ScaffoldState::default();
    h.run(&mut state, serde_json::json!({ "prompt": "task board" }))
        .await;

    // running, merged output, waiting
    let snapshots = h.sink.snapshots().await;
    assert_eq!(snapshots.len(), 3);
    assert_eq!(snapshots[0].status_of(ScaffoldStep::Spec), StepState::Running);
    assert_eq!(snapshots.last(), Some(&state));
}
