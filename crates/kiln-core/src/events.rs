//! Cycle events
//!
//! Published on a broadcast channel. Observers only listen; nothing they do
//! feeds back into the cycle.

use crate::state::{CycleContext, CycleState};
use kiln_artifact::SessionId;
use serde::{Deserialize, Serialize};

/// Observational cycle notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CycleEvent {
    /// A goal was accepted and a session opened
    CycleStarted {
        /// Goal text as submitted
        goal: String,
        /// Session opened for it
        session_id: SessionId,
    },
    /// A transition happened
    StateChanged {
        /// State just entered
        new_state: CycleState,
        /// Context after the merge
        context: CycleContext,
    },
    /// Free-text progress note
    AgentThought {
        /// Note text
        message: String,
    },
    /// Changes applied and verified
    CycleComplete {
        /// Applier summary
        message: String,
        /// Entries applied
        changes_applied: usize,
    },
    /// An apply reported failure
    AgentError {
        /// Failure reason
        message: String,
    },
}
