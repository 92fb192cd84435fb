//! Kiln Verification
//!
//! Runs verification commands in an isolated worker that only ever sees a
//! snapshot of the artifact store.
//!
//! # Core Concepts
//!
//! - [`VerificationCoordinator`]: correlation-id multiplexer with timeouts and crash recovery
//! - [`WorkerSpawner`]: starts a worker behind a request/event channel pair
//! - [`SnapshotWorker`]: built-in worker performing static checks
//! - [`WorkerRequest`] / [`WorkerResponse`]: the message protocol
//!
//! # Example
//!
//! ```rust,ignore
//! use kiln_verify::{VerificationConfig, VerificationCoordinator};
//!
//! let coordinator =
//!     VerificationCoordinator::with_snapshot_worker(store, VerificationConfig::default());
//! coordinator.init().await?;
//! let report = coordinator.verify_linting("src/ui/panel.js").await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod coordinator;
mod error;
mod protocol;
mod worker;

pub use config::{VerificationConfig, DEFAULT_TIMEOUT_SECS};
pub use coordinator::{
    CheckResult, FullVerification, LifecycleState, VerificationCoordinator, FULL_VERIFICATION,
};
pub use error::VerifyError;
pub use protocol::{
    LogLevel, UnknownCommand, VerifyCommand, VerifyPayload, VfsSnapshot, WorkerRequest,
    WorkerResponse,
};
pub use worker::{SnapshotWorker, SnapshotWorkerSpawner, WorkerChannels, WorkerEvent, WorkerSpawner};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::{
        VerificationConfig, VerificationCoordinator, VerifyError, WorkerRequest, WorkerResponse,
        WorkerSpawner,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
