// State channels and reducers
//
// Every state shape has a partial update type whose fields mirror the state
// fields one-to-one. Each field declares how it combines with prior state:
//
// - append:             new items are concatenated onto history
// - last-write-wins:    `Some(v)` replaces, `None` keeps prior
// - explicit-overwrite: `Some(v)` replaces even when v is false/null/0,
//                       `None` means "not provided"
//
// Nullable explicit-overwrite fields use `Option<Option<T>>` so that an
// explicit JSON `null` is distinguishable from an absent key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::message::Message;
use crate::state::{ComponentState, DesignSpec, Requirements, SessionState, Stage};

/// A state type that accepts partial updates through per-field reducers
pub trait Channels: Clone + Send + Sync + 'static {
    /// Partial update produced by a step
    type Update: Default + Send + Sync + 'static;

    /// Merge an update into this state in place
    fn apply(&mut self, update: Self::Update);

    /// Pure form of `apply`
    fn merged(&self, update: Self::Update) -> Self {
        let mut next = self.clone();
        next.apply(update);
        next
    }
}

/// Deserialize a present key (including `null`) as `Some(..)`.
///
/// Pair with `#[serde(default)]` so an absent key stays `None`.
pub fn explicit<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ============================================================================
// StateUpdate - partial SessionState
// ============================================================================

/// Partial update for `SessionState`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StateUpdate {
    /// append
    #[serde(default)]
    pub messages: Vec<Message>,
    /// last-write-wins
    #[serde(default)]
    pub current_step: Option<Stage>,
    #[serde(default)]
    pub requirements: Option<Requirements>,
    #[serde(default)]
    pub design_spec: Option<DesignSpec>,
    #[serde(default)]
    pub component_state: Option<ComponentState>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// explicit-overwrite
    #[serde(default)]
    pub user_approval: Option<bool>,
    #[serde(default, deserialize_with = "explicit")]
    pub feedback: Option<Option<String>>,
    #[serde(default)]
    pub iteration_count: Option<u32>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn current_step(mut self, stage: Stage) -> Self {
        self.current_step = Some(stage);
        self
    }

    pub fn requirements(mut self, requirements: Requirements) -> Self {
        self.requirements = Some(requirements);
        self
    }

    pub fn design_spec(mut self, design_spec: DesignSpec) -> Self {
        self.design_spec = Some(design_spec);
        self
    }

    pub fn component_state(mut self, component_state: ComponentState) -> Self {
        self.component_state = Some(component_state);
        self
    }

    pub fn user_approval(mut self, approved: bool) -> Self {
        self.user_approval = Some(approved);
        self
    }

    pub fn feedback(mut self, feedback: Option<String>) -> Self {
        self.feedback = Some(feedback);
        self
    }

    pub fn iteration_count(mut self, count: u32) -> Self {
        self.iteration_count = Some(count);
        self
    }

    /// Stamp `updated_at` with the current time
    pub fn touch(mut self) -> Self {
        self.updated_at = Some(Utc::now());
        self
    }

    /// True when applying this update would change nothing
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Channels for SessionState {
    type Update = StateUpdate;

    fn apply(&mut self, update: StateUpdate) {
        self.messages.extend(update.messages);

        if let Some(stage) = update.current_step {
            self.current_step = stage;
        }
        if let Some(requirements) = update.requirements {
            self.requirements = Some(requirements);
        }
        if let Some(design_spec) = update.design_spec {
            self.design_spec = Some(design_spec);
        }
        if let Some(component_state) = update.component_state {
            self.component_state = Some(component_state);
        }
        if let Some(session_id) = update.session_id {
            self.session_id = session_id;
        }
        if let Some(created_at) = update.created_at {
            self.created_at = created_at;
        }
        if let Some(updated_at) = update.updated_at {
            self.updated_at = updated_at;
        }

        if let Some(approved) = update.user_approval {
            self.user_approval = approved;
        }
        if let Some(feedback) = update.feedback {
            self.feedback = feedback;
        }
        if let Some(count) = update.iteration_count {
            self.iteration_count = count;
        }
    }
}

/// Merge a partial update into a session, returning the new state
pub fn merge(state: &SessionState, update: StateUpdate) -> SessionState {
    state.merged(update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Styling, Theme};

    fn populated_state() -> SessionState {
        let mut state = SessionState::new("session-1");
        state.messages.push(Message::user("Build a todo app"));
        state.current_step = Stage::Preview;
        state.requirements = Some(Requirements {
            raw_input: "Build a todo app".to_string(),
            features: vec!["add todo".to_string()],
            styling: Styling {
                theme: Theme::Dark,
                ..Styling::default()
            },
            components: vec![],
            clarification_needed: false,
            clarification_questions: vec![],
        });
        state.user_approval = true;
        state.feedback = Some("make it blue".to_string());
        state.iteration_count = 3;
        state
    }

    #[test]
    fn test_empty_update_is_identity() {
        let state = populated_state();
        assert_eq!(merge(&state, StateUpdate::default()), state);

        let fresh = SessionState::new("fresh");
        assert_eq!(merge(&fresh, StateUpdate::new()), fresh);
    }

    #[test]
    fn test_messages_append_and_keep_prefix() {
        let state = populated_state();
        let initial = state.messages.clone();

        let m1 = vec![Message::assistant("one"), Message::assistant("two")];
        let m2 = vec![Message::user("three")];

        let mut next = state.clone();
        next.apply(StateUpdate {
            messages: m1.clone(),
            ..Default::default()
        });
        next.apply(StateUpdate {
            messages: m2.clone(),
            ..Default::default()
        });

        assert_eq!(next.messages.len(), initial.len() + m1.len() + m2.len());
        assert_eq!(&next.messages[..initial.len()], &initial[..]);
        assert_eq!(next.messages[initial.len()], m1[0]);
        assert_eq!(next.messages.last(), m2.last());
    }

    #[test]
    fn test_explicit_falsy_values_overwrite() {
        let state = populated_state();
        let next = merge(
            &state,
            StateUpdate::new()
                .user_approval(false)
                .feedback(None)
                .iteration_count(0),
        );

        assert!(!next.user_approval);
        assert_eq!(next.feedback, None);
        assert_eq!(next.iteration_count, 0);
    }

    #[test]
    fn test_last_write_wins_keeps_prior_when_absent() {
        let state = populated_state();
        let next = merge(&state, StateUpdate::new().current_step(Stage::Design));

        assert_eq!(next.current_step, Stage::Design);
        assert_eq!(next.requirements, state.requirements);
        assert_eq!(next.session_id, state.session_id);
    }

    #[test]
    fn test_deserialize_distinguishes_null_from_absent() {
        let absent: StateUpdate = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.feedback, None);
        assert!(absent.is_empty());

        let null: StateUpdate = serde_json::from_str(r#"{"feedback": null}"#).unwrap();
        assert_eq!(null.feedback, Some(None));

        let set: StateUpdate =
            serde_json::from_str(r#"{"feedback": "bigger", "userApproval": false}"#).unwrap();
        assert_eq!(set.feedback, Some(Some("bigger".to_string())));
        assert_eq!(set.user_approval, Some(false));
    }

    #[test]
    fn test_deserialize_rejects_unknown_fields() {
        let result = serde_json::from_str::<StateUpdate>(r#"{"currentStepp": "design"}"#);
        assert!(result.is_err());
    }
}
