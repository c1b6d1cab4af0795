// Session state for the supervisor pipeline
//
// SessionState is the unit of truth for one conversation thread. Steps never
// replace it; they return a `StateUpdate` (see channels.rs) that is merged in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::message::Message;

// ============================================================================
// Stage - FSM position
// ============================================================================

/// Position of a session in the supervisor FSM.
///
/// Any string deserializes: names outside the known set are kept as
/// `Unknown` so that routing stays total over stored or client-supplied state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Stage {
    Requirements,
    Design,
    Code,
    Preview,
    Approved,
    Rejected,
    Unknown(String),
}

impl Stage {
    pub fn as_str(&self) -> &str {
        match self {
            Stage::Requirements => "requirements",
            Stage::Design => "design",
            Stage::Code => "code",
            Stage::Preview => "preview",
            Stage::Approved => "approved",
            Stage::Rejected => "rejected",
            Stage::Unknown(other) => other,
        }
    }
}

impl From<String> for Stage {
    fn from(value: String) -> Self {
        match value.as_str() {
            "requirements" => Stage::Requirements,
            "design" => Stage::Design,
            "code" => Stage::Code,
            "preview" => Stage::Preview,
            "approved" => Stage::Approved,
            "rejected" => Stage::Rejected,
            _ => Stage::Unknown(value),
        }
    }
}

impl From<&str> for Stage {
    fn from(value: &str) -> Self {
        Stage::from(value.to_string())
    }
}

impl From<Stage> for String {
    fn from(stage: Stage) -> Self {
        stage.as_str().to_string()
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Requirements
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Auto,
}

impl Theme {
    /// Lenient parse; anything unrecognized is light
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "dark" => Theme::Dark,
            "auto" | "system" => Theme::Auto,
            _ => Theme::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Auto => "auto",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Styling {
    pub theme: Theme,
    pub color_scheme: String,
    pub layout: String,
}

impl Default for Styling {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            color_scheme: "blue".to_string(),
            layout: "modern".to_string(),
        }
    }
}

/// Structured requirements extracted from the user's request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirements {
    pub raw_input: String,
    pub features: Vec<String>,
    pub styling: Styling,
    pub components: Vec<String>,
    pub clarification_needed: bool,
    #[serde(default)]
    pub clarification_questions: Vec<String>,
}

// ============================================================================
// Design spec
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutType {
    Flex,
    Grid,
    Stack,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSpec {
    #[serde(rename = "type")]
    pub kind: LayoutType,
    pub direction: String,
    pub spacing: String,
    pub padding: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignStyling {
    pub framework: String,
    pub theme: Theme,
    pub color_scheme: String,
    /// Tailwind class lists keyed by hierarchy element
    pub classes: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub trigger: String,
    pub action: String,
    pub target: String,
}

/// Deterministic design derived from requirements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignSpec {
    pub component_hierarchy: Vec<String>,
    pub layout: LayoutSpec,
    pub styling: DesignStyling,
    pub interactions: Vec<Interaction>,
}

// ============================================================================
// Component state
// ============================================================================

/// Generated component markup and its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentState {
    pub code: String,
    pub language: String,
    pub framework: String,
    pub dependencies: Vec<String>,
    pub validated: bool,
    pub errors: Vec<String>,
}

// ============================================================================
// SessionState
// ============================================================================

/// Full state of one supervisor session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub messages: Vec<Message>,
    pub current_step: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Requirements>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_spec: Option<DesignSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_state: Option<ComponentState>,
    pub user_approval: bool,
    pub feedback: Option<String>,
    pub iteration_count: u32,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    /// Fresh session positioned at requirements with counters zeroed
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            messages: Vec::new(),
            current_step: Stage::Requirements,
            requirements: None,
            design_spec: None,
            component_state: None,
            user_approval: false,
            feedback: None,
            iteration_count: 0,
            session_id: session_id.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Feedback text if present and non-blank
    pub fn pending_feedback(&self) -> Option<&str> {
        self.feedback
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    /// Human-readable one-liner describing where the session stands
    pub fn status_summary(&self) -> String {
        match &self.current_step {
            Stage::Requirements => {
                let clarify = self
                    .requirements
                    .as_ref()
                    .is_some_and(|r| r.clarification_needed);
                if clarify {
                    "I need clarification on your requirements.".to_string()
                } else {
                    "Requirements analyzed. Designing component...".to_string()
                }
            }
            Stage::Design => "Component structure designed. Generating code...".to_string(),
            Stage::Code => "Code generated. Preparing preview...".to_string(),
            Stage::Preview => "Component ready for preview!".to_string(),
            Stage::Approved => "Component approved! Ready to export.".to_string(),
            other => format!("Processing: {}", other),
        }
    }
}
