// State for the linear scaffold pipeline

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::channels::{explicit, Channels};
use crate::step::{StepKey, StepState, StepStatusEntry};

/// Number of log lines retained in state
pub const MAX_LOG_LINES: usize = 200;

// ============================================================================
// Steps
// ============================================================================

/// The seven scaffold steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaffoldStep {
    Spec,
    Schema,
    Ui,
    Apis,
    Build,
    Fix,
    Done,
}

impl ScaffoldStep {
    pub const ALL: [ScaffoldStep; 7] = [
        ScaffoldStep::Spec,
        ScaffoldStep::Schema,
        ScaffoldStep::Ui,
        ScaffoldStep::Apis,
        ScaffoldStep::Build,
        ScaffoldStep::Fix,
        ScaffoldStep::Done,
    ];

    pub fn index(&self) -> usize {
        Self::ALL
            .iter()
            .position(|step| step == self)
            .unwrap_or_default()
    }

    /// Progress after this step completes, in percent
    pub fn progress(&self) -> u8 {
        let total = Self::ALL.len() as f64;
        (((self.index() + 1) as f64 / total) * 100.0).round() as u8
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|step| step.id() == value)
    }
}

impl StepKey for ScaffoldStep {
    fn id(&self) -> &'static str {
        match self {
            ScaffoldStep::Spec => "spec",
            ScaffoldStep::Schema => "schema",
            ScaffoldStep::Ui => "ui",
            ScaffoldStep::Apis => "apis",
            ScaffoldStep::Build => "build",
            ScaffoldStep::Fix => "fix",
            ScaffoldStep::Done => "done",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ScaffoldStep::Spec => "PRD & Decisions",
            ScaffoldStep::Schema => "Data Schema",
            ScaffoldStep::Ui => "UI Scaffolding",
            ScaffoldStep::Apis => "APIs",
            ScaffoldStep::Build => "Build",
            ScaffoldStep::Fix => "Auto-Fix",
            ScaffoldStep::Done => "Done",
        }
    }
}

/// Position of the scaffold pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaffoldStage {
    #[default]
    Idle,
    Spec,
    Schema,
    Ui,
    Apis,
    Build,
    Fix,
    Done,
    Complete,
}

impl ScaffoldStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScaffoldStage::Idle => "idle",
            ScaffoldStage::Spec => "spec",
            ScaffoldStage::Schema => "schema",
            ScaffoldStage::Ui => "ui",
            ScaffoldStage::Apis => "apis",
            ScaffoldStage::Build => "build",
            ScaffoldStage::Fix => "fix",
            ScaffoldStage::Done => "done",
            ScaffoldStage::Complete => "complete",
        }
    }
}

impl From<ScaffoldStep> for ScaffoldStage {
    fn from(step: ScaffoldStep) -> Self {
        match step {
            ScaffoldStep::Spec => ScaffoldStage::Spec,
            ScaffoldStep::Schema => ScaffoldStage::Schema,
            ScaffoldStep::Ui => ScaffoldStage::Ui,
            ScaffoldStep::Apis => ScaffoldStage::Apis,
            ScaffoldStep::Build => ScaffoldStage::Build,
            ScaffoldStep::Fix => ScaffoldStage::Fix,
            ScaffoldStep::Done => ScaffoldStage::Done,
        }
    }
}

// ============================================================================
// Artifacts
// ============================================================================

/// A generated file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: String,
    pub title: String,
    pub language: String,
    pub contents: String,
}

impl Artifact {
    pub fn new(
        path: impl Into<String>,
        title: impl Into<String>,
        language: impl Into<String>,
        contents: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
            language: language.into(),
            contents: contents.into(),
        }
    }
}

// ============================================================================
// ScaffoldState
// ============================================================================

/// Full state of one scaffold thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaffoldState {
    pub component_code: String,
    pub approved: bool,
    pub current_step: ScaffoldStage,
    pub feedback: Option<String>,
    pub steps: BTreeMap<String, StepStatusEntry>,
    pub logs: Vec<String>,
    pub artifacts: Vec<Artifact>,
    pub prd: Option<String>,
    pub progress: u8,
    pub awaiting_approval: bool,
    pub pending_approval_step: Option<ScaffoldStep>,
    #[serde(default)]
    pub prompt: Option<String>,
}

impl Default for ScaffoldState {
    fn default() -> Self {
        Self {
            component_code: String::new(),
            approved: false,
            current_step: ScaffoldStage::Idle,
            feedback: None,
            steps: ScaffoldStep::ALL
                .iter()
                .map(|step| (step.id().to_string(), StepStatusEntry::queued(*step)))
                .collect(),
            logs: Vec::new(),
            artifacts: Vec::new(),
            prd: None,
            progress: 0,
            awaiting_approval: false,
            pending_approval_step: None,
            prompt: None,
        }
    }
}

impl ScaffoldState {
    pub fn status_of(&self, step: ScaffoldStep) -> StepState {
        self.steps
            .get(step.id())
            .map(|entry| entry.status)
            .unwrap_or(StepState::Queued)
    }

    /// The step whose human approval is outstanding, if any.
    ///
    /// A pending spec gate without a PRD is stale and does not hold the run.
    pub fn pending_gate(&self) -> Option<ScaffoldStep> {
        if !self.awaiting_approval {
            return None;
        }
        self.pending_approval_step
            .filter(|step| *step != ScaffoldStep::Spec || self.prd.is_some())
    }

    pub fn artifact(&self, path: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.path == path)
    }

    /// Summary line for a finished or suspended run
    pub fn status_summary(&self) -> String {
        if let Some(step) = self.pending_gate() {
            return format!("Awaiting approval for {}", step.label());
        }
        match self.current_step {
            ScaffoldStage::Complete => format!(
                "Scaffold generated for: {}",
                self.prompt.as_deref().unwrap_or("untitled project")
            ),
            other => format!("Processing: {}", other.as_str()),
        }
    }
}

// ============================================================================
// ScaffoldUpdate - partial ScaffoldState
// ============================================================================

/// Partial update for `ScaffoldState`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScaffoldUpdate {
    /// last-write-wins
    #[serde(default)]
    pub component_code: Option<String>,
    #[serde(default)]
    pub current_step: Option<ScaffoldStage>,
    #[serde(default)]
    pub prd: Option<String>,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default)]
    pub prompt: Option<String>,
    /// upsert by step id
    #[serde(default)]
    pub steps: Vec<StepStatusEntry>,
    /// append, capped to the last MAX_LOG_LINES
    #[serde(default)]
    pub logs: Vec<String>,
    /// upsert by path
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    /// explicit-overwrite
    #[serde(default)]
    pub approved: Option<bool>,
    #[serde(default, deserialize_with = "explicit")]
    pub feedback: Option<Option<String>>,
    #[serde(default)]
    pub awaiting_approval: Option<bool>,
    #[serde(default, deserialize_with = "explicit")]
    pub pending_approval_step: Option<Option<ScaffoldStep>>,
}

impl ScaffoldUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step_status(mut self, entry: StepStatusEntry) -> Self {
        self.steps.push(entry);
        self
    }

    pub fn log(mut self, line: impl Into<String>) -> Self {
        self.logs.push(line.into());
        self
    }

    pub fn current_step(mut self, stage: ScaffoldStage) -> Self {
        self.current_step = Some(stage);
        self
    }
}

impl Channels for ScaffoldState {
    type Update = ScaffoldUpdate;

    fn apply(&mut self, update: ScaffoldUpdate) {
        if let Some(code) = update.component_code {
            self.component_code = code;
        }
        if let Some(stage) = update.current_step {
            self.current_step = stage;
        }
        if let Some(prd) = update.prd {
            self.prd = Some(prd);
        }
        if let Some(progress) = update.progress {
            self.progress = progress.min(100);
        }
        if let Some(prompt) = update.prompt {
            self.prompt = Some(prompt);
        }

        for entry in update.steps {
            self.steps.insert(entry.id.clone(), entry);
        }

        if !update.logs.is_empty() {
            self.logs.extend(update.logs);
            if self.logs.len() > MAX_LOG_LINES {
                let excess = self.logs.len() - MAX_LOG_LINES;
                self.logs.drain(..excess);
            }
        }

        for artifact in update.artifacts {
            match self.artifacts.iter_mut().find(|a| a.path == artifact.path) {
                Some(existing) => *existing = artifact,
                None => self.artifacts.push(artifact),
            }
        }

        if let Some(approved) = update.approved {
            self.approved = approved;
        }
        if let Some(feedback) = update.feedback {
            self.feedback = feedback;
        }
        if let Some(awaiting) = update.awaiting_approval {
            self.awaiting_approval = awaiting;
        }
        if let Some(pending) = update.pending_approval_step {
            self.pending_approval_step = pending;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_queues_every_step() {
        let state = ScaffoldState::default();
        assert_eq!(state.steps.len(), 7);
        assert!(ScaffoldStep::ALL
            .iter()
            .all(|step| state.status_of(*step) == StepState::Queued));
        assert_eq!(state.steps["ui"].label, "UI Scaffolding");
    }

    #[test]
    fn test_progress_per_step() {
        assert_eq!(ScaffoldStep::Spec.progress(), 14);
        assert_eq!(ScaffoldStep::Ui.progress(), 43);
        assert_eq!(ScaffoldStep::Done.progress(), 100);
    }

    #[test]
    fn test_empty_update_is_identity() {
        let mut state = ScaffoldState::default();
        state.logs.push("hello".into());
        state.awaiting_approval = true;
        assert_eq!(state.merged(ScaffoldUpdate::default()), state);
    }

    #[test]
    fn test_logs_are_capped() {
        let mut state = ScaffoldState::default();
        let update = ScaffoldUpdate {
            logs: (0..250).map(|i| format!("line {i}")).collect(),
            ..Default::default()
        };
        state.apply(update);
        assert_eq!(state.logs.len(), MAX_LOG_LINES);
        assert_eq!(state.logs.first().map(String::as_str), Some("line 50"));
        assert_eq!(state.logs.last().map(String::as_str), Some("line 249"));
    }

    #[test]
    fn test_artifacts_upsert_by_path() {
        let mut state = ScaffoldState::default();
        state.apply(ScaffoldUpdate {
            artifacts: vec![Artifact::new("a.md", "A", "markdown", "v1")],
            ..Default::default()
        });
        state.apply(ScaffoldUpdate {
            artifacts: vec![
                Artifact::new("a.md", "A", "markdown", "v2"),
                Artifact::new("b.md", "B", "markdown", "b"),
            ],
            ..Default::default()
        });
        assert_eq!(state.artifacts.len(), 2);
        assert_eq!(state.artifact("a.md").map(|a| a.contents.as_str()), Some("v2"));
    }

    #[test]
    fn test_explicit_null_clears_gate_fields() {
        let mut state = ScaffoldState::default();
        state.awaiting_approval = true;
        state.pending_approval_step = Some(ScaffoldStep::Spec);
        state.feedback = Some("x".into());

        let update: ScaffoldUpdate = serde_json::from_str(
            r#"{"awaitingApproval": false, "pendingApprovalStep": null, "feedback": null}"#,
        )
        .unwrap();
        state.apply(update);

        assert!(!state.awaiting_approval);
        assert_eq!(state.pending_approval_step, None);
        assert_eq!(state.feedback, None);
    }

    #[test]
    fn test_pending_gate_requires_prd_for_spec() {
        let mut state = ScaffoldState::default();
        state.awaiting_approval = true;
        state.pending_approval_step = Some(ScaffoldStep::Spec);
        assert_eq!(state.pending_gate(), None);

        state.prd = Some("# PRD".into());
        assert_eq!(state.pending_gate(), Some(ScaffoldStep::Spec));
    }
}
