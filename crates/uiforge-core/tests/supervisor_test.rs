// Integration tests for the supervisor pipeline
//
// These drive the Supervisor workflow through the Engine with a mock LLM and
// in-memory emitter/sink, covering the requirements -> design -> code ->
// preview flow and the human-in-the-loop gate.

use std::sync::Arc;
use uiforge_core::{
    memory::{InMemoryEventEmitter, InMemoryStateSink, MockLlmDriver, MockLlmResponse},
    steps::{design_from_requirements, parse_requirements, APPROVED_MESSAGE, READY_MESSAGE},
    Advance, ComponentState, Engine, GeneratorError, GeneratorEvent, HaltReason, Message,
    MessageRole, RunContext, RunOutcome, SessionState, Stage, StepState, Supervisor,
    SupervisorConfig, SupervisorInput, SupervisorStep,
};

const TODO_REQUIREMENTS: &str = r#"```json
{
  "features": ["add todo", "toggle complete", "dark mode"],
  "styling": { "theme": "dark", "colorScheme": "indigo", "layout": "modern" },
  "components": ["TodoList", "TodoItem"],
  "clarificationNeeded": false
}
```"#;

const TODO_MARKUP: &str = "```html\n<div class=\"bg-gray-900 p-4\">\n  <ul id=\"todos\"></ul>\n</div>\n```";

struct Harness {
    llm: Arc<MockLlmDriver>,
    supervisor: Supervisor,
    emitter: InMemoryEventEmitter,
    sink: InMemoryStateSink<SessionState>,
}

impl Harness {
    fn new(config: SupervisorConfig) -> Self {
        let llm = Arc::new(MockLlmDriver::new());
        Self {
            supervisor: Supervisor::new(llm.clone(), &config),
            llm,
            emitter: InMemoryEventEmitter::new(),
            sink: InMemoryStateSink::new(),
        }
    }

    fn ctx(&self) -> RunContext<'_, SessionState> {
        RunContext::new(&self.emitter, &self.sink)
    }
}

fn default_harness() -> Harness {
    Harness::new(SupervisorConfig::default())
}

fn user_input(text: &str) -> SupervisorInput {
    serde_json::from_value(serde_json::json!({
        "messages": [{"role": "user", "content": text}]
    }))
    .unwrap()
}

/// A session that has been through code generation and waits at preview
fn session_at_preview() -> SessionState {
    let mut state = SessionState::new("thread-1");
    state
        .messages
        .push(Message::user("Build a todo app with dark mode"));
    let requirements =
        parse_requirements("Build a todo app with dark mode", TODO_REQUIREMENTS).unwrap();
    state.design_spec = Some(design_from_requirements(&requirements));
    state.requirements = Some(requirements);
    state.component_state = Some(ComponentState {
        code: "<div>v1</div>".to_string(),
        language: "html".to_string(),
        framework: "tailwind".to_string(),
        dependencies: vec!["tailwindcss".to_string()],
        validated: true,
        errors: vec![],
    });
    state.current_step = Stage::Preview;
    state
}

// =============================================================================
// Scenario: fresh request runs to the preview gate
// =============================================================================

#[tokio::test]
async fn test_new_session_runs_to_preview_and_suspends() {
    let h = default_harness();
    h.llm
        .set_responses(vec![
            MockLlmResponse::text(TODO_REQUIREMENTS),
            MockLlmResponse::text(TODO_MARKUP),
        ])
        .await;

    let mut state = Supervisor::accept_input(
        None,
        user_input("Build a todo app with dark mode"),
        "thread-1",
    );
    let outcome = Engine::new()
        .run(&h.supervisor, &mut state, &h.ctx())
        .await
        .unwrap();

    assert_eq!(outcome, RunOutcome::Suspended(SupervisorStep::Preview));
    assert_eq!(state.current_step, Stage::Preview);

    let component = state.component_state.as_ref().expect("component generated");
    assert!(!component.code.is_empty());
    assert!(!component.code.contains("```"));
    assert_eq!(component.framework, "tailwind");

    let requirements = state.requirements.as_ref().unwrap();
    assert_eq!(requirements.features.len(), 3);
    let design = state.design_spec.as_ref().unwrap();
    assert_eq!(design.component_hierarchy, vec!["TodoList", "TodoItem"]);

    // user message, then the ready-for-preview message
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[1].role, MessageRole::Assistant);
    assert_eq!(state.messages[1].text_content(), READY_MESSAGE);

    // requirements + code, no call for design or preview
    assert_eq!(h.llm.call_count().await, 2);
    let configs = h.llm.configs().await;
    assert_eq!(configs[0].temperature, Some(0.3));
    assert_eq!(configs[1].temperature, Some(0.7));

    let events = h.emitter.events().await;
    assert!(matches!(
        events.last(),
        Some(GeneratorEvent::ApprovalRequired(request)) if request.step_id == "preview"
    ));
    let statuses: Vec<(String, StepState)> = events
        .iter()
        .filter_map(|event| match event {
            GeneratorEvent::StepStatus(entry) => Some((entry.id.clone(), entry.status)),
            _ => None,
        })
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("requirements".to_string(), StepState::Running),
            ("requirements".to_string(), StepState::Success),
            ("design".to_string(), StepState::Running),
            ("design".to_string(), StepState::Success),
            ("code".to_string(), StepState::Running),
            ("code".to_string(), StepState::Success),
            ("preview".to_string(), StepState::Running),
            ("preview".to_string(), StepState::Waiting),
        ]
    );

    // one commit per merged step
    let snapshots = h.sink.snapshots().await;
    assert_eq!(snapshots.len(), 4);
    assert_eq!(snapshots.last(), Some(&state));
}

// =============================================================================
// Scenario: approval at preview
// =============================================================================

#[tokio::test]
async fn test_approval_commits_and_halts() {
    let h = default_harness();
    let prior = session_at_preview();
    let input: SupervisorInput =
        serde_json::from_value(serde_json::json!({ "userApproval": true })).unwrap();
    let mut state = Supervisor::accept_input(Some(prior), input, "thread-1");

    let outcome = Engine::new()
        .run(&h.supervisor, &mut state, &h.ctx())
        .await
        .unwrap();

    assert_eq!(outcome, RunOutcome::Halted(HaltReason::Approved));
    assert_eq!(state.current_step, Stage::Approved);
    assert!(!state.user_approval);
    let last = state.messages.last().unwrap();
    assert_eq!(last.role, MessageRole::Assistant);
    assert_eq!(last.text_content(), APPROVED_MESSAGE);
    assert_eq!(h.llm.call_count().await, 0);

    // a later run on an approved session halts without dispatching anything
    let before = state.clone();
    let outcome = Engine::new()
        .run(&h.supervisor, &mut state, &h.ctx())
        .await
        .unwrap();
    assert_eq!(outcome, RunOutcome::Halted(HaltReason::End));
    assert_eq!(state, before);
}

// =============================================================================
// Scenario: feedback loops back through requirements
// =============================================================================

#[tokio::test]
async fn test_feedback_revisits_requirements_in_one_tick() {
    let h = default_harness();
    h.llm
        .add_response(MockLlmResponse::text(
            r#"{"features": ["add todo"], "styling": {"theme": "dark", "colorScheme": "blue"}}"#,
        ))
        .await;

    let prior = session_at_preview();
    let input: SupervisorInput =
        serde_json::from_value(serde_json::json!({ "feedback": "make it blue" })).unwrap();
    let mut state = Supervisor::accept_input(Some(prior), input, "thread-1");
    assert_eq!(state.iteration_count, 0);

    let advance = Engine::new()
        .advance(&h.supervisor, &mut state, &h.ctx())
        .await
        .unwrap();

    assert_eq!(advance, Advance::Continue);
    assert_eq!(state.current_step, Stage::Design);
    assert_eq!(state.iteration_count, 1);
    assert_eq!(state.feedback, None);
    assert!(!state.user_approval);
    assert_eq!(
        state.requirements.as_ref().map(|r| r.raw_input.as_str()),
        Some("make it blue")
    );

    // the feedback became a user message and the revision prompt carried the old requirements
    let feedback_message = state
        .messages
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::User)
        .unwrap();
    assert_eq!(feedback_message.text_content(), "make it blue");
    let calls = h.llm.calls().await;
    assert!(calls[0][1].content.contains("Previous requirements"));
    assert!(calls[0][1].content.contains("make it blue"));
}

#[tokio::test]
async fn test_each_feedback_round_increments_once_until_limit() {
    let h = Harness::new(SupervisorConfig {
        max_iterations: 2,
        ..SupervisorConfig::default()
    });
    let revised = MockLlmResponse::text(r#"{"features": ["add todo"]}"#);
    let markup = MockLlmResponse::text("<div>revised</div>");

    let mut state = session_at_preview();
    for round in 1..=2u32 {
        h.llm
            .set_responses(vec![revised.clone(), markup.clone()])
            .await;
        let input: SupervisorInput = serde_json::from_value(serde_json::json!({
            "feedback": format!("round {round}")
        }))
        .unwrap();
        state = Supervisor::accept_input(Some(state), input, "thread-1");

        let outcome = Engine::new()
            .run(&h.supervisor, &mut state, &h.ctx())
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Suspended(SupervisorStep::Preview));
        assert_eq!(state.iteration_count, round);
        assert_eq!(state.feedback, None);
        assert_eq!(state.current_step, Stage::Preview);
    }

    let input: SupervisorInput =
        serde_json::from_value(serde_json::json!({ "feedback": "one more" })).unwrap();
    state = Supervisor::accept_input(Some(state), input, "thread-1");
    let result = Engine::new()
        .run(&h.supervisor, &mut state, &h.ctx())
        .await;
    assert!(matches!(result, Err(GeneratorError::IterationLimit(2))));
    assert_eq!(state.iteration_count, 2);
}

// =============================================================================
// Scenario: failures leave state as of the last merge
// =============================================================================

#[tokio::test]
async fn test_requirements_without_user_message_fails_without_commit() {
    let h = default_harness();
    let mut state = SessionState::new("thread-1");
    let before = state.clone();

    let result = Engine::new()
        .run(&h.supervisor, &mut state, &h.ctx())
        .await;

    assert!(matches!(result, Err(GeneratorError::MissingInput)));
    assert_eq!(state, before);
    assert!(h.sink.snapshots().await.is_empty());
    assert_eq!(h.llm.call_count().await, 0);

    let events = h.emitter.events().await;
    assert!(matches!(
        events.last(),
        Some(GeneratorEvent::StepStatus(entry))
            if entry.id == "requirements" && entry.status == StepState::Error
    ));
}

#[tokio::test]
async fn test_code_generation_failure_keeps_previous_component() {
    let h = default_harness();
    h.llm
        .add_response(MockLlmResponse::error("connection reset by peer"))
        .await;

    let mut state = session_at_preview();
    state.current_step = Stage::Code;
    let previous_component = state.component_state.clone();

    let result = Engine::new()
        .run(&h.supervisor, &mut state, &h.ctx())
        .await;

    match result {
        Err(GeneratorError::CodeGeneration(message)) => {
            assert!(message.contains("connection reset by peer"))
        }
        other => panic!("expected code generation error, got {:?}", other),
    }
    assert_eq!(state.component_state, previous_component);
    assert_eq!(state.current_step, Stage::Code);
    assert!(h.sink.snapshots().await.is_empty());
}

#[tokio::test]
async fn test_malformed_requirements_response_is_propagated() {
    let h = default_harness();
    h.llm
        .add_response(MockLlmResponse::text("I'd be happy to help with that!"))
        .await;

    let mut state = Supervisor::accept_input(None, user_input("a login form"), "thread-1");
    let result = Engine::new()
        .run(&h.supervisor, &mut state, &h.ctx())
        .await;

    assert!(matches!(
        result,
        Err(GeneratorError::MalformedLlmResponse { .. })
    ));
    assert_eq!(state.current_step, Stage::Requirements);
    assert!(state.requirements.is_none());
}

#[tokio::test]
async fn test_unknown_step_restarts_at_requirements() {
    let h = default_harness();
    h.llm
        .set_responses(vec![
            MockLlmResponse::text(TODO_REQUIREMENTS),
            MockLlmResponse::text(TODO_MARKUP),
        ])
        .await;

    let mut state = session_at_preview();
    state.current_step = Stage::from("export");

    let outcome = Engine::new()
        .run(&h.supervisor, &mut state, &h.ctx())
        .await
        .unwrap();
    assert_eq!(outcome, RunOutcome::Suspended(SupervisorStep::Preview));
    assert_eq!(h.llm.call_count().await, 2);
}
