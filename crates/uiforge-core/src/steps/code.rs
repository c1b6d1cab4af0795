// Code generator step

use async_trait::async_trait;
use std::sync::Arc;

use crate::channels::StateUpdate;
use crate::error::{GeneratorError, Result};
use crate::events::GeneratorEvent;
use crate::linear::Artifact;
use crate::llm_drivers::{LlmCallConfig, LlmDriver};
use crate::markup::strip_code_fences;
use crate::state::{ComponentState, SessionState, Stage};
use crate::step::{GenerationStep, StepContext, StepOutcome};

const SYSTEM_PROMPT: &str = r#"You write a single self-contained interactive UI component.
Output only HTML markup styled with Tailwind CSS utility classes, with any behaviour in one inline <script> using vanilla JavaScript.
Do not include <html>, <head> or <body> wrappers, explanations, or markdown.
Follow the supplied design spec for layout, theme, colours and interactions."#;

/// Path used for the generated component artifact
pub const COMPONENT_ARTIFACT_PATH: &str = "component.html";

/// Renders requirements + design spec into component markup via the LLM
pub struct CodeGenerator {
    llm: Arc<dyn LlmDriver>,
    config: LlmCallConfig,
}

impl CodeGenerator {
    pub fn new(llm: Arc<dyn LlmDriver>, config: LlmCallConfig) -> Self {
        Self { llm, config }
    }
}

#[async_trait]
impl GenerationStep<SessionState> for CodeGenerator {
    fn name(&self) -> &'static str {
        "code-generator"
    }

    async fn execute(
        &self,
        state: &SessionState,
        ctx: &StepContext<'_>,
    ) -> Result<StepOutcome<StateUpdate>> {
        let requirements = state
            .requirements
            .as_ref()
            .ok_or_else(|| GeneratorError::missing(self.name(), "requirements"))?;
        let design = state
            .design_spec
            .as_ref()
            .ok_or_else(|| GeneratorError::missing(self.name(), "designSpec"))?;

        let prompt = format!(
            "Request:\n{}\n\nRequirements:\n{}\n\nDesign spec:\n{}",
            requirements.raw_input,
            serde_json::to_string_pretty(requirements).map_err(anyhow::Error::from)?,
            serde_json::to_string_pretty(design).map_err(anyhow::Error::from)?,
        );

        let response = self
            .llm
            .complete(SYSTEM_PROMPT, &prompt, &self.config)
            .await
            .map_err(|e| GeneratorError::code(e.to_string()))?;

        let code = strip_code_fences(&response);
        if code.is_empty() {
            return Err(GeneratorError::code("LLM returned no markup"));
        }

        ctx.emit(GeneratorEvent::artifact(Artifact::new(
            COMPONENT_ARTIFACT_PATH,
            "Generated Component",
            "html",
            code.clone(),
        )))
        .await?;
        ctx.emit(GeneratorEvent::log(format!(
            "Component generated ({} lines)",
            code.lines().count()
        )))
        .await?;

        let component = ComponentState {
            code,
            language: "html".to_string(),
            framework: "tailwind".to_string(),
            dependencies: vec!["tailwindcss".to_string()],
            validated: true,
            errors: Vec::new(),
        };

        Ok(StepOutcome::proceed(
            StateUpdate::new()
                .component_state(component)
                .current_step(Stage::Preview)
                .touch(),
        ))
    }
}
