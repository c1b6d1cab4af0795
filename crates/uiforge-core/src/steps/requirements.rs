// Requirements parser step

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::channels::StateUpdate;
use crate::error::{GeneratorError, Result};
use crate::events::GeneratorEvent;
use crate::llm_drivers::{LlmCallConfig, LlmDriver};
use crate::markup::strip_code_fences;
use crate::message::{latest_user_text, Message};
use crate::state::{Requirements, SessionState, Stage, Styling, Theme};
use crate::step::{GenerationStep, StepContext, StepOutcome};

const SYSTEM_PROMPT: &str = r#"You turn a user's description of a UI component into structured requirements.
Respond with a single JSON object and nothing else:
{
  "features": ["short feature names"],
  "styling": { "theme": "light" | "dark" | "auto", "colorScheme": "tailwind color name", "layout": "modern" | "minimal" | "classic" },
  "components": ["PascalCase component names"],
  "clarificationNeeded": false,
  "clarificationQuestions": []
}
Only ask for clarification when the request is too vague to build anything."#;

/// Parses the latest user message into `Requirements` via the LLM
pub struct RequirementsParser {
    llm: Arc<dyn LlmDriver>,
    config: LlmCallConfig,
}

impl RequirementsParser {
    pub fn new(llm: Arc<dyn LlmDriver>, config: LlmCallConfig) -> Self {
        Self { llm, config }
    }

    fn user_prompt(raw_input: &str, previous: Option<&Requirements>) -> String {
        match previous.and_then(|r| serde_json::to_string(r).ok()) {
            Some(previous) => format!(
                "Previous requirements:\n{}\n\nRevise them according to this request:\n{}",
                previous, raw_input
            ),
            None => raw_input.to_string(),
        }
    }
}

#[async_trait]
impl GenerationStep<SessionState> for RequirementsParser {
    fn name(&self) -> &'static str {
        "requirements-parser"
    }

    async fn execute(
        &self,
        state: &SessionState,
        ctx: &StepContext<'_>,
    ) -> Result<StepOutcome<StateUpdate>> {
        let raw_input = latest_user_text(&state.messages).ok_or(GeneratorError::MissingInput)?;

        let prompt = Self::user_prompt(&raw_input, state.requirements.as_ref());
        let response = self.llm.complete(SYSTEM_PROMPT, &prompt, &self.config).await?;
        let requirements = parse_requirements(&raw_input, &response)?;

        tracing::debug!(
            session_id = %state.session_id,
            features = requirements.features.len(),
            clarification = requirements.clarification_needed,
            "Requirements parsed"
        );
        ctx.emit(GeneratorEvent::log(format!(
            "Requirements extracted: {} feature(s), {} theme",
            requirements.features.len(),
            requirements.styling.theme.as_str()
        )))
        .await?;

        let mut update = StateUpdate::new();
        if requirements.clarification_needed && !requirements.clarification_questions.is_empty() {
            let questions = requirements
                .clarification_questions
                .iter()
                .map(|q| format!("- {}", q))
                .collect::<Vec<_>>()
                .join("\n");
            update = update.message(Message::assistant(format!(
                "A few questions so I can get this right:\n{}",
                questions
            )));
        }

        Ok(StepOutcome::proceed(
            update
                .requirements(requirements)
                .current_step(Stage::Design)
                .touch(),
        ))
    }
}

// ============================================================================
// Response parsing
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawRequirements {
    features: Vec<String>,
    styling: Option<RawStyling>,
    components: Vec<String>,
    clarification_needed: bool,
    clarification_questions: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawStyling {
    theme: Option<String>,
    color_scheme: Option<String>,
    layout: Option<String>,
}

/// Parse an LLM response into `Requirements`, tolerating code fences and
/// defaulting every missing field
pub fn parse_requirements(raw_input: &str, response: &str) -> Result<Requirements> {
    let cleaned = strip_code_fences(response);
    let body = if cleaned.is_empty() { "{}" } else { &cleaned };

    let raw: RawRequirements = serde_json::from_str(body)
        .map_err(|e| GeneratorError::malformed(format!("requirements JSON: {}", e), response))?;

    let defaults = Styling::default();
    let styling = raw.styling.unwrap_or_default();
    let styling = Styling {
        theme: styling
            .theme
            .as_deref()
            .map(Theme::parse)
            .unwrap_or(defaults.theme),
        color_scheme: non_blank(styling.color_scheme).unwrap_or(defaults.color_scheme),
        layout: non_blank(styling.layout).unwrap_or(defaults.layout),
    };

    Ok(Requirements {
        raw_input: raw_input.to_string(),
        features: dedupe(raw.features),
        styling,
        components: dedupe(raw.components),
        clarification_needed: raw.clarification_needed,
        clarification_questions: raw.clarification_questions,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn dedupe(items: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim().to_string();
        if !item.is_empty() && !seen.contains(&item) {
            seen.push(item);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fenced_response() {
        let response = "```json\n{\"features\":[\"add todo\",\"add todo\",\"dark mode\"],\"styling\":{\"theme\":\"dark\"}}\n```";
        let requirements = parse_requirements("Build a todo app", response).unwrap();

        assert_eq!(requirements.raw_input, "Build a todo app");
        assert_eq!(requirements.features, vec!["add todo", "dark mode"]);
        assert_eq!(requirements.styling.theme, Theme::Dark);
        assert_eq!(requirements.styling.color_scheme, "blue");
        assert_eq!(requirements.styling.layout, "modern");
        assert!(requirements.components.is_empty());
        assert!(!requirements.clarification_needed);
    }

    #[test]
    fn test_parse_empty_response_uses_defaults() {
        let requirements = parse_requirements("anything", "").unwrap();
        assert_eq!(requirements.styling, Styling::default());
        assert!(requirements.features.is_empty());
    }

    #[test]
    fn test_parse_invalid_json_is_malformed() {
        let result = parse_requirements("x", "Sure! Here are your requirements: features...");
        assert!(matches!(
            result,
            Err(GeneratorError::MalformedLlmResponse { .. })
        ));
    }

    #[test]
    fn test_user_prompt_includes_previous_requirements() {
        let previous = parse_requirements("first", "{\"features\":[\"login\"]}").unwrap();
        let prompt = RequirementsParser::user_prompt("make it blue", Some(&previous));
        assert!(prompt.contains("\"login\""));
        assert!(prompt.ends_with("make it blue"));
        assert_eq!(RequirementsParser::user_prompt("hi", None), "hi");
    }
}
