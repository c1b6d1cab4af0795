// Preview & iteration step: the human-in-the-loop gate

use async_trait::async_trait;

use crate::channels::StateUpdate;
use crate::error::{GeneratorError, Result};
use crate::message::Message;
use crate::state::{SessionState, Stage};
use crate::step::{GenerationStep, StepContext, StepOutcome};

pub const APPROVED_MESSAGE: &str = "Component approved! Ready to export.";
pub const READY_MESSAGE: &str = "Component ready for preview. Please review and approve.";

/// Three-way branch on the pending human decision:
/// approve -> approved, feedback -> back to requirements, nothing -> suspend
#[derive(Debug, Clone, Copy)]
pub struct PreviewIteration {
    max_iterations: u32,
}

impl PreviewIteration {
    pub fn new(max_iterations: u32) -> Self {
        Self { max_iterations }
    }
}

impl Default for PreviewIteration {
    fn default() -> Self {
        Self::new(5)
    }
}

#[async_trait]
impl GenerationStep<SessionState> for PreviewIteration {
    fn name(&self) -> &'static str {
        "preview-iteration"
    }

    async fn execute(
        &self,
        state: &SessionState,
        _ctx: &StepContext<'_>,
    ) -> Result<StepOutcome<StateUpdate>> {
        if state.component_state.is_none() {
            return Err(GeneratorError::missing(self.name(), "componentState"));
        }

        if state.user_approval {
            return Ok(StepOutcome::proceed(
                StateUpdate::new()
                    .message(Message::assistant(APPROVED_MESSAGE))
                    .current_step(Stage::Approved)
                    .user_approval(false)
                    .feedback(None)
                    .touch(),
            ));
        }

        if let Some(feedback) = state.pending_feedback() {
            if state.iteration_count >= self.max_iterations {
                return Err(GeneratorError::IterationLimit(self.max_iterations));
            }
            return Ok(StepOutcome::proceed(
                StateUpdate::new()
                    .message(Message::user(feedback))
                    .iteration_count(state.iteration_count + 1)
                    .user_approval(false)
                    .feedback(None)
                    .current_step(Stage::Requirements)
                    .touch(),
            )
            .with_note(format!("Revision {} requested", state.iteration_count + 1)));
        }

        Ok(StepOutcome::suspend(
            StateUpdate::new()
                .message(Message::assistant(READY_MESSAGE))
                .touch(),
            "Awaiting review",
        ))
    }
}
