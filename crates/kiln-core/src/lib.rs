//! Kiln Core
//!
//! The cycle coordinator: turns a natural-language goal into applied,
//! verified changes, with human approval at the context and proposal gates.
//!
//! # Core Concepts
//!
//! - [`CycleCoordinator`]: drives store, router and applier through one cycle
//! - [`CycleMachine`]: explicit state + context, transitions as methods
//! - [`CycleEvent`]: one-directional notifications for observers
//! - [`AutonomySource`]: curator-mode flag that can skip the context gate
//! - [`KilnConfig`]: TOML configuration for every component
//!
//! # Example
//!
//! ```rust,ignore
//! use kiln_core::{CycleCoordinator, KilnConfig};
//!
//! let coordinator = CycleCoordinator::new(store, router, applier, config.cycle);
//! coordinator.submit_goal("Add dark mode").await?;
//! coordinator.approve_context().await?;
//! coordinator.approve_proposal().await?;
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod autonomy;
mod config;
mod coordinator;
mod error;
mod events;
pub mod prompt;
mod state;

pub use autonomy::{AutonomySource, CuratorFlag, Manual};
pub use config::{CycleConfig, KilnConfig};
pub use coordinator::CycleCoordinator;
pub use error::{ConfigError, CycleError};
pub use events::CycleEvent;
pub use state::{CycleContext, CycleContextUpdate, CycleMachine, CycleState};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::{
        AutonomySource, CuratorFlag, CycleConfig, CycleCoordinator, CycleError, CycleEvent,
        CycleState, KilnConfig,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
