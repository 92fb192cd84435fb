//! Kiln Artifact Store
//!
//! The contract the orchestration engine consumes from the versioned
//! artifact store, plus an in-memory reference implementation.
//!
//! # Core Concepts
//!
//! - [`ArtifactStore`]: async trait covering artifacts, checkpoints, sessions and turns
//! - [`MemoryStore`]: snapshot-based in-memory store
//! - [`CheckpointId`]: opaque handle used for transactional rollback
//! - [`Turn`]: one curate/plan/apply attempt, owning two bundle paths
//!
//! # Example
//!
//! ```rust,ignore
//! use kiln_artifact::{ArtifactStore, MemoryStore};
//!
//! let store = MemoryStore::with_files([("src/ui/panel.js", "export {}")]);
//! let cp = store.create_checkpoint("before edit").await?;
//! store.update_artifact("src/ui/panel.js", "broken").await?;
//! store.restore_checkpoint(cp.id).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod hash;
mod memory;
mod store;
mod types;

pub use error::StoreError;
pub use hash::ContentHash;
pub use memory::MemoryStore;
pub use store::ArtifactStore;
pub use types::{ArtifactKind, ArtifactMeta, CheckpointId, CheckpointInfo, SessionId, Turn};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::{
        ArtifactKind, ArtifactStore, CheckpointId, MemoryStore, SessionId, StoreError, Turn,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
