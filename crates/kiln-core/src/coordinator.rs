//! Cycle coordinator
//!
//! Drives one goal through the cycle:
//!
//! ```text
//! Idle ─submit_goal→ CuratingContext ─→ AwaitingContextApproval ─approve_context→
//!   PlanningWithContext ─→ AwaitingProposalApproval ─approve_proposal→
//!   ApplyingChangeset ─success→ Idle
//!                     └failure→ PlanningWithContext (retry)
//! ```
//!
//! Curator mode skips the context gate only. Public operations are
//! serialized by an operation lock so at most one of them drives the machine
//! at a time; calls made in the wrong state are ignored.

use crate::autonomy::{AutonomySource, Manual};
use crate::config::CycleConfig;
use crate::error::CycleError;
use crate::events::CycleEvent;
use crate::prompt;
use crate::state::{CycleContext, CycleContextUpdate, CycleMachine, CycleState};
use kiln_artifact::{ArtifactKind, ArtifactStore, Turn};
use kiln_bundle::{ChangeBundle, ChangeBundleApplier, ContextBundle};
use kiln_router::{CompletionOptions, CompletionRouter};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex as OpLock};

const EVENT_CAPACITY: usize = 256;

/// Orchestrates curation, planning and application for one goal at a time
pub struct CycleCoordinator {
    store: Arc<dyn ArtifactStore>,
    router: Arc<CompletionRouter>,
    applier: Arc<ChangeBundleApplier>,
    autonomy: Arc<dyn AutonomySource>,
    config: CycleConfig,
    options: CompletionOptions,
    machine: Mutex<CycleMachine>,
    events: broadcast::Sender<CycleEvent>,
    op: OpLock<()>,
}

impl CycleCoordinator {
    /// Create coordinator with manual approvals
    #[must_use]
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        router: Arc<CompletionRouter>,
        applier: Arc<ChangeBundleApplier>,
        config: CycleConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            router,
            applier,
            autonomy: Arc::new(Manual),
            config,
            options: CompletionOptions::default(),
            machine: Mutex::new(CycleMachine::new(events.clone())),
            events,
            op: OpLock::new(()),
        }
    }

    /// Consult `autonomy` for curator mode
    #[must_use]
    pub fn with_autonomy(mut self, autonomy: Arc<dyn AutonomySource>) -> Self {
        self.autonomy = autonomy;
        self
    }

    /// Completion options used for planning
    #[must_use]
    pub fn with_completion_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    /// Subscribe to cycle events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CycleEvent> {
        self.events.subscribe()
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> CycleState {
        self.machine.lock().state()
    }

    /// Snapshot of the current context
    #[must_use]
    pub fn context(&self) -> CycleContext {
        self.machine.lock().context().clone()
    }

    /// Start a cycle for `goal`
    ///
    /// Returns `Ok(false)` without touching the store when a cycle is
    /// already active.
    ///
    /// # Errors
    /// Store, router or bundle errors raised by curation (and planning, in
    /// curator mode) are returned as-is.
    pub async fn submit_goal(&self, goal: &str) -> Result<bool, CycleError> {
        let _op = self.op.lock().await;
        if self.state() != CycleState::Idle {
            tracing::info!(state = %self.state(), "goal ignored: cycle already active");
            return Ok(false);
        }

        let session_id = self.store.create_session(goal).await?;
        let turn = self.store.create_turn(session_id).await?;
        tracing::info!(goal, session = %session_id, turn = turn.number, "cycle started");

        self.transition(
            CycleState::CuratingContext,
            CycleContextUpdate::none()
                .goal(goal)
                .session(session_id)
                .turn(turn)
                .clear_error()
                .attempt(0),
        );
        self.emit(CycleEvent::CycleStarted {
            goal: goal.to_string(),
            session_id,
        });

        self.curate().await?;
        Ok(true)
    }

    /// Approve the curated context and plan
    ///
    /// Returns `Ok(false)` outside `AwaitingContextApproval`.
    ///
    /// # Errors
    /// Errors raised by planning are returned as-is.
    pub async fn approve_context(&self) -> Result<bool, CycleError> {
        let _op = self.op.lock().await;
        if self.state() != CycleState::AwaitingContextApproval {
            tracing::debug!(state = %self.state(), "context approval ignored");
            return Ok(false);
        }
        tracing::info!("context approved");
        self.transition(CycleState::PlanningWithContext, CycleContextUpdate::none());
        self.plan().await?;
        Ok(true)
    }

    /// Approve the proposal and apply it
    ///
    /// Returns `Ok(false)` outside `AwaitingProposalApproval`.
    ///
    /// # Errors
    /// Errors raised by the applier, or by re-planning after a reported
    /// failure, are returned as-is.
    pub async fn approve_proposal(&self) -> Result<bool, CycleError> {
        let _op = self.op.lock().await;
        if self.state() != CycleState::AwaitingProposalApproval {
            tracing::debug!(state = %self.state(), "proposal approval ignored");
            return Ok(false);
        }
        tracing::info!("proposal approved");
        self.transition(CycleState::ApplyingChangeset, CycleContextUpdate::none());
        self.apply().await?;
        Ok(true)
    }

    /// Abandon the active cycle and return to `Idle`
    ///
    /// Returns false when already idle.
    pub async fn abort(&self) -> bool {
        let _op = self.op.lock().await;
        let mut machine = self.machine.lock();
        if machine.state() == CycleState::Idle {
            return false;
        }
        tracing::warn!(state = %machine.state(), "cycle aborted");
        machine.reset();
        true
    }

    async fn curate(&self) -> Result<(), CycleError> {
        let turn = self.turn()?;
        let metadata = self.store.all_metadata().await?;
        let paths: Vec<String> = metadata
            .keys()
            .filter(|p| self.config.is_relevant(p))
            .cloned()
            .collect();

        let goal = self.context().goal;
        let bundle = ContextBundle::collect(self.store.as_ref(), &paths).await?;
        bundle
            .write(self.store.as_ref(), &turn.context_path, &goal)
            .await?;
        self.thought(format!(
            "Selected {} relevant file(s) for \"{goal}\"",
            bundle.len()
        ));

        if self.autonomy.is_running() {
            tracing::info!("context auto-approved by curator mode");
            self.transition(CycleState::PlanningWithContext, CycleContextUpdate::none());
            self.plan().await
        } else {
            self.transition(CycleState::AwaitingContextApproval, CycleContextUpdate::none());
            Ok(())
        }
    }

    async fn plan(&self) -> Result<(), CycleError> {
        let turn = self.turn()?;
        let context = self.context();
        let context_text = self
            .store
            .content(&turn.context_path)
            .await?
            .ok_or_else(|| CycleError::MissingBundle(turn.context_path.clone()))?;

        let messages = prompt::compose(&context.goal, &context_text, context.last_error.as_deref());
        self.thought(match context.attempt {
            0 => "Drafting a proposal".to_string(),
            n => format!("Revising the proposal (attempt {})", n + 1),
        });

        let completion = self.router.complete(&messages, &self.options).await?;
        tracing::debug!(
            provider = %completion.provider,
            model = %completion.model,
            tokens = completion.usage.total_tokens,
            "completion received"
        );

        let proposal = ChangeBundle::parse(&completion.text)?;
        let text = proposal.render()?;
        self.store
            .put_artifact(&turn.proposal_path, ArtifactKind::Bundle, &text, "proposal bundle")
            .await?;
        self.thought(format!("Proposed {} change(s)", proposal.len()));

        self.transition(CycleState::AwaitingProposalApproval, CycleContextUpdate::none());
        Ok(())
    }

    async fn apply(&self) -> Result<(), CycleError> {
        let turn = self.turn()?;
        let outcome = self
            .applier
            .apply(&turn.proposal_path, self.config.verify_command.as_deref())
            .await?;

        if outcome.success {
            tracing::info!(changes = outcome.changes_applied, "cycle complete");
            self.transition(CycleState::Idle, CycleContextUpdate::none().clear_error());
            self.emit(CycleEvent::CycleComplete {
                message: outcome.message,
                changes_applied: outcome.changes_applied,
            });
            return Ok(());
        }

        let attempt = self.context().attempt + 1;
        tracing::warn!(attempt, reason = %outcome.message, "apply reported failure");

        if let Some(max) = self.config.max_retries {
            if attempt > max {
                let message = format!(
                    "{} (giving up after {attempt} failed attempts)",
                    outcome.message
                );
                self.emit(CycleEvent::AgentError { message });
                self.transition(
                    CycleState::Idle,
                    CycleContextUpdate::none().error(outcome.message).attempt(attempt),
                );
                return Ok(());
            }
        }

        self.emit(CycleEvent::AgentError {
            message: outcome.message.clone(),
        });
        self.transition(
            CycleState::PlanningWithContext,
            CycleContextUpdate::none().error(outcome.message).attempt(attempt),
        );
        self.plan().await
    }

    fn turn(&self) -> Result<Turn, CycleError> {
        self.machine.lock().context().turn.clone().ok_or(CycleError::NoTurn)
    }

    fn transition(&self, to: CycleState, update: CycleContextUpdate) {
        self.machine.lock().transition(to, update);
    }

    fn thought(&self, message: String) {
        tracing::debug!(thought = %message);
        self.emit(CycleEvent::AgentThought { message });
    }

    fn emit(&self, event: CycleEvent) {
        let _ = self.events.send(event);
    }
}
