//! Cycle state machine
//!
//! [`CycleMachine`] holds the current [`CycleState`] and the
//! [`CycleContext`] carried across it. A transition is one method call that
//! moves the state, merges a [`CycleContextUpdate`] and publishes
//! [`CycleEvent::StateChanged`]. Side effects belong to the coordinator's
//! actions, never to the transition itself.

use crate::events::CycleEvent;
use kiln_artifact::{SessionId, Turn};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

/// Cycle states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    /// No active cycle; accepts a goal
    #[default]
    Idle,
    /// Selecting relevant files and writing the context bundle
    CuratingContext,
    /// Waiting for a human to approve the context bundle
    AwaitingContextApproval,
    /// Asking the router for a proposal
    PlanningWithContext,
    /// Waiting for a human to approve the proposal bundle
    AwaitingProposalApproval,
    /// Applying the proposal through the bundle applier
    ApplyingChangeset,
}

impl CycleState {
    /// Whether the cycle is waiting on a human
    #[inline]
    #[must_use]
    pub fn is_awaiting_approval(self) -> bool {
        matches!(self, Self::AwaitingContextApproval | Self::AwaitingProposalApproval)
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::CuratingContext => "curating_context",
            Self::AwaitingContextApproval => "awaiting_context_approval",
            Self::PlanningWithContext => "planning_with_context",
            Self::AwaitingProposalApproval => "awaiting_proposal_approval",
            Self::ApplyingChangeset => "applying_changeset",
        };
        f.write_str(s)
    }
}

/// Data carried across the cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleContext {
    /// Goal text
    pub goal: String,
    /// Session opened for the goal
    pub session_id: Option<SessionId>,
    /// Turn owning the context and proposal bundles
    pub turn: Option<Turn>,
    /// Reason the last apply failed
    pub last_error: Option<String>,
    /// Failed applies so far in this cycle
    pub attempt: u32,
}

/// Partial update merged into a [`CycleContext`]
///
/// `None` leaves a field untouched. `last_error` is doubly optional so an
/// update can clear it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleContextUpdate {
    /// New goal text
    pub goal: Option<String>,
    /// New session
    pub session_id: Option<SessionId>,
    /// New turn
    pub turn: Option<Turn>,
    /// `Some(None)` clears the failure reason, `Some(Some(_))` sets it
    pub last_error: Option<Option<String>>,
    /// New attempt counter
    pub attempt: Option<u32>,
}

impl CycleContextUpdate {
    /// Empty update
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Set goal
    #[must_use]
    pub fn goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = Some(goal.into());
        self
    }

    /// Set session
    #[must_use]
    pub fn session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Set turn
    #[must_use]
    pub fn turn(mut self, turn: Turn) -> Self {
        self.turn = Some(turn);
        self
    }

    /// Record a failure reason
    #[must_use]
    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.last_error = Some(Some(message.into()));
        self
    }

    /// Clear the failure reason
    #[must_use]
    pub fn clear_error(mut self) -> Self {
        self.last_error = Some(None);
        self
    }

    /// Set attempt counter
    #[must_use]
    pub fn attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }
}

impl CycleContext {
    /// Merge `update` into the context
    pub fn merge(&mut self, update: CycleContextUpdate) {
        if let Some(goal) = update.goal {
            self.goal = goal;
        }
        if let Some(session_id) = update.session_id {
            self.session_id = Some(session_id);
        }
        if let Some(turn) = update.turn {
            self.turn = Some(turn);
        }
        if let Some(last_error) = update.last_error {
            self.last_error = last_error;
        }
        if let Some(attempt) = update.attempt {
            self.attempt = attempt;
        }
    }
}

/// Current state plus context, with event publication
#[derive(Debug)]
pub struct CycleMachine {
    state: CycleState,
    context: CycleContext,
    events: broadcast::Sender<CycleEvent>,
}

impl CycleMachine {
    /// Create an idle machine publishing on `events`
    #[must_use]
    pub fn new(events: broadcast::Sender<CycleEvent>) -> Self {
        Self {
            state: CycleState::Idle,
            context: CycleContext::default(),
            events,
        }
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Current context
    #[inline]
    #[must_use]
    pub fn context(&self) -> &CycleContext {
        &self.context
    }

    /// Move to `to`, merge `update` and publish the change
    pub fn transition(&mut self, to: CycleState, update: CycleContextUpdate) {
        let from = self.state;
        self.context.merge(update);
        self.state = to;
        tracing::info!(%from, %to, "cycle transition");
        let _ = self.events.send(CycleEvent::StateChanged {
            new_state: to,
            context: self.context.clone(),
        });
    }

    /// Return to `Idle` with a fresh context
    pub fn reset(&mut self) {
        self.context = CycleContext::default();
        self.transition(CycleState::Idle, CycleContextUpdate::none());
    }
}
