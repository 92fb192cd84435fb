//! Error types for the cycle coordinator
//!
//! Action errors are propagated untouched; only a structured apply failure
//! (`success: false`) drives the retry loop.

use kiln_artifact::StoreError;
use kiln_bundle::{ApplyError, BundleError};
use kiln_router::RouterError;
use std::path::PathBuf;

/// Errors raised while driving a cycle
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    /// Artifact store failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Applier raised (precondition violation, rollback, verifier error)
    #[error("apply error: {0}")]
    Apply(#[from] ApplyError),

    /// Completion failed on every available backend
    #[error("completion error: {0}")]
    Router(#[from] RouterError),

    /// Completion text was not a valid change bundle
    #[error("invalid proposal: {0}")]
    Proposal(#[from] BundleError),

    /// Action needs a turn but the context has none
    #[error("no active turn")]
    NoTurn,

    /// Bundle artifact is missing from the store
    #[error("bundle not found: {0}")]
    MissingBundle(String),
}

impl CycleError {
    /// Check if retrying the same call may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_transient(),
            Self::Router(e) => !matches!(e, RouterError::NoCloudClient),
            _ => false,
        }
    }
}

/// Errors loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that was read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// File is not valid TOML for [`KilnConfig`](crate::KilnConfig)
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
