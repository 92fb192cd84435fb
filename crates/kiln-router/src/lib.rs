//! Kiln Completion Router
//!
//! Sends chat completions to a local model runtime or a cloud API, and
//! falls back to cloud when the local backend fails.
//!
//! # Core Concepts
//!
//! - [`CompletionRouter`]: mode-driven dispatcher with fallback and streaming
//! - [`LocalBackend`] / [`CloudClient`]: collaborator traits for the two backends
//! - [`CompletionResult`]: normalized `{text, usage, model, provider}` shape
//! - [`RouterEvent`]: mode-changed and fallback notifications
//!
//! # Example
//!
//! ```rust,ignore
//! use kiln_router::{ChatMessage, CompletionOptions, CompletionRouter, RouterConfig};
//!
//! let router = CompletionRouter::new(Some(local), Some(cloud), RouterConfig::default());
//! let result = router
//!     .complete(&[ChatMessage::user("Add dark mode")], &CompletionOptions::default())
//!     .await?;
//! println!("{} via {}", result.text, result.provider);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod backend;
mod config;
mod error;
mod router;
mod types;

pub use backend::{ChunkStream, CloudClient, LocalBackend};
pub use config::RouterConfig;
pub use error::RouterError;
pub use router::{CompletionRouter, RouterEvent};
pub use types::{
    Candidate, CandidateContent, ChatMessage, CloudResponse, CompletionOptions, CompletionResult,
    LocalChoice, LocalCompletion, LocalUsage, Part, Provider, Role, RouterMode, StreamChunk, Usage,
    UsageMetadata,
};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::{
        ChatMessage, CloudClient, CompletionOptions, CompletionResult, CompletionRouter,
        LocalBackend, RouterError, RouterMode,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
