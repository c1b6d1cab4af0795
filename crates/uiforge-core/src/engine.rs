// FSM engine
//
// One engine drives every workflow table. A workflow supplies:
// - a router: state -> NextAction (run a step, suspend at a gate, halt)
// - a handler per step key
// - optional hooks for gates, status bookkeeping and suspension notices
//
// Per dispatch the engine emits step-status (running -> success | waiting |
// error), merges the step's partial update and commits the merged state via
// the StateSink. Steps run strictly in sequence; merges are applied in
// program order. A failing step leaves state as of the last merge.

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::channels::Channels;
use crate::error::{GeneratorError, Result};
use crate::events::GeneratorEvent;
use crate::step::{Control, GenerationStep, StepContext, StepKey, StepState, StepStatusEntry};
use crate::traits::{EventEmitter, StateSink};

/// Default upper bound on dispatches in one run
pub const DEFAULT_MAX_DISPATCHES: usize = 32;

// ============================================================================
// Routing vocabulary
// ============================================================================

/// Why a workflow halted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// A human approved the result
    Approved,
    /// Nothing left to run
    End,
}

/// Routing decision for the current state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction<K> {
    /// Dispatch this step
    Run(K),
    /// Hold at this step until a human decision arrives
    Suspend(K),
    /// Stop
    Halt(HaltReason),
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome<K> {
    /// Waiting for a human decision at this step
    Suspended(K),
    Halted(HaltReason),
}

impl<K> RunOutcome<K> {
    pub fn is_suspended(&self) -> bool {
        matches!(self, RunOutcome::Suspended(_))
    }
}

/// Result of a single `Engine::advance`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance<K> {
    /// A step ran and routing should be re-evaluated
    Continue,
    Suspended(K),
    Halted(HaltReason),
}

// ============================================================================
// Workflow
// ============================================================================

/// A step table plus routing rules over one state type
#[async_trait]
pub trait Workflow: Send + Sync {
    type State: Channels;
    type Step: StepKey;

    /// Assistant/graph id this workflow is published under
    fn id(&self) -> &'static str;

    /// All steps, in display order
    fn steps(&self) -> &'static [Self::Step];

    /// Decide what happens next; must be total over every state
    fn route(&self, state: &Self::State) -> NextAction<Self::Step>;

    /// Handler for a step key
    fn handler(&self, step: Self::Step) -> &dyn GenerationStep<Self::State>;

    /// A gate step that must run first to commit a pending human decision
    /// before `action` is dispatched. `None` when no decision is pending.
    fn gate_commit(
        &self,
        _state: &Self::State,
        _action: &NextAction<Self::Step>,
    ) -> Option<Self::Step> {
        None
    }

    /// State update recording a step status change, for workflows that keep
    /// statuses in state
    fn status_update(
        &self,
        _entry: &StepStatusEntry,
        _step: Self::Step,
    ) -> Option<<Self::State as Channels>::Update> {
        None
    }

    /// Called whenever a run suspends at `step`
    async fn on_suspend(
        &self,
        _step: Self::Step,
        _state: &Self::State,
        _emitter: &dyn EventEmitter,
    ) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Collaborators for one run
pub struct RunContext<'a, S> {
    pub emitter: &'a dyn EventEmitter,
    pub sink: &'a dyn StateSink<S>,
}

impl<'a, S> RunContext<'a, S> {
    pub fn new(emitter: &'a dyn EventEmitter, sink: &'a dyn StateSink<S>) -> Self {
        Self { emitter, sink }
    }
}

/// Drives a workflow until it suspends or halts
#[derive(Debug, Clone, Copy)]
pub struct Engine {
    max_dispatches: usize,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            max_dispatches: DEFAULT_MAX_DISPATCHES,
        }
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_dispatches(mut self, max_dispatches: usize) -> Self {
        self.max_dispatches = max_dispatches.max(1);
        self
    }

    /// Run until suspension or halt
    pub async fn run<W: Workflow>(
        &self,
        workflow: &W,
        state: &mut W::State,
        ctx: &RunContext<'_, W::State>,
    ) -> Result<RunOutcome<W::Step>> {
        info!(workflow = workflow.id(), "Run started");

        for _ in 0..self.max_dispatches {
            match self.advance(workflow, state, ctx).await? {
                Advance::Continue => continue,
                Advance::Suspended(step) => {
                    info!(workflow = workflow.id(), step = step.id(), "Run suspended");
                    return Ok(RunOutcome::Suspended(step));
                }
                Advance::Halted(reason) => {
                    info!(workflow = workflow.id(), ?reason, "Run halted");
                    return Ok(RunOutcome::Halted(reason));
                }
            }
        }

        Err(GeneratorError::StepLimitExceeded(self.max_dispatches))
    }

    /// Route once and perform the routed action (one tick)
    pub async fn advance<W: Workflow>(
        &self,
        workflow: &W,
        state: &mut W::State,
        ctx: &RunContext<'_, W::State>,
    ) -> Result<Advance<W::Step>> {
        let action = workflow.route(state);
        debug!(workflow = workflow.id(), ?action, "Routed");

        if let Some(gate) = workflow.gate_commit(state, &action) {
            debug!(step = gate.id(), "Committing pending decision at gate");
            self.dispatch(workflow, gate, state, ctx).await?;
            if let NextAction::Halt(reason) = action {
                return Ok(Advance::Halted(reason));
            }
        }

        match action {
            NextAction::Run(step) => match self.dispatch(workflow, step, state, ctx).await? {
                Control::Continue => Ok(Advance::Continue),
                Control::Suspend => {
                    workflow.on_suspend(step, state, ctx.emitter).await?;
                    Ok(Advance::Suspended(step))
                }
            },
            NextAction::Suspend(step) => {
                let entry = StepStatusEntry::new(
                    step,
                    StepState::Waiting,
                    Some("Awaiting human approval".to_string()),
                );
                ctx.emitter.emit(GeneratorEvent::StepStatus(entry)).await?;
                workflow.on_suspend(step, state, ctx.emitter).await?;
                Ok(Advance::Suspended(step))
            }
            NextAction::Halt(reason) => Ok(Advance::Halted(reason)),
        }
    }

    /// Execute one step and merge its output
    async fn dispatch<W: Workflow>(
        &self,
        workflow: &W,
        step: W::Step,
        state: &mut W::State,
        ctx: &RunContext<'_, W::State>,
    ) -> Result<Control> {
        self.record_status(workflow, step, StepState::Running, None, state, ctx)
            .await?;

        let handler = workflow.handler(step);
        let step_ctx = StepContext::new(ctx.emitter);
        let outcome = match handler.execute(state, &step_ctx).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(step = handler.name(), error = %e, "Step failed");
                self.record_status(
                    workflow,
                    step,
                    StepState::Error,
                    Some(e.to_string()),
                    state,
                    ctx,
                )
                .await?;
                return Err(e);
            }
        };

        state.apply(outcome.update);
        ctx.sink.emit_state(state).await?;

        let status = match outcome.control {
            Control::Continue => StepState::Success,
            Control::Suspend => StepState::Waiting,
        };
        self.record_status(workflow, step, status, outcome.note, state, ctx)
            .await?;

        debug!(step = handler.name(), control = ?outcome.control, "Step completed");
        Ok(outcome.control)
    }

    async fn record_status<W: Workflow>(
        &self,
        workflow: &W,
        step: W::Step,
        status: StepState,
        note: Option<String>,
        state: &mut W::State,
        ctx: &RunContext<'_, W::State>,
    ) -> Result<()> {
        let entry = StepStatusEntry::new(step, status, note);
        if let Some(update) = workflow.status_update(&entry, step) {
            state.apply(update);
            ctx.sink.emit_state(state).await?;
        }
        ctx.emitter.emit(GeneratorEvent::StepStatus(entry)).await
    }
}
