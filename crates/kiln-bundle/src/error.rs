//! Error types for bundle parsing and application
//!
//! - Parse errors (malformed change bundles)
//! - Apply errors (precondition violations, store failures, rollback)
//! - Verifier errors (raised by the post-apply verification seam)

use kiln_artifact::{CheckpointId, StoreError};

/// Errors while parsing or rendering a bundle
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BundleError {
    /// Operation keyword outside CREATE / MODIFY / DELETE
    #[error("unknown bundle category: {0}")]
    UnknownOperation(String),

    /// Create or modify block without a content region
    #[error("missing content region for {operation} {path}")]
    MissingContent { operation: String, path: String },

    /// Content region never closed
    #[error("unterminated content region for {0}")]
    UnterminatedContent(String),

    /// Content contains a bare fence line and cannot be rendered
    #[error("content for {0} contains a fence line")]
    EmbeddedFence(String),
}

/// Error reported by a [`ChangeVerifier`](crate::ChangeVerifier)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct VerifierError {
    /// Human-readable cause
    pub message: String,
    /// Whether the verifier gave up waiting
    pub timed_out: bool,
}

impl VerifierError {
    /// Create verifier error
    #[inline]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: false,
        }
    }

    /// Create timeout error
    #[inline]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: true,
        }
    }
}

/// What went wrong inside a transaction before it was rolled back
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyFailure {
    /// CREATE targeted an existing path
    #[error("cannot create {0}: path already exists")]
    PathExists(String),

    /// MODIFY or DELETE targeted a missing path
    #[error("cannot {operation} {path}: path does not exist")]
    PathMissing { operation: String, path: String },

    /// Store rejected a mutation
    #[error("store error on {path}: {error}")]
    Store { path: String, error: StoreError },

    /// Post-apply verification raised instead of reporting
    #[error("verification error: {0}")]
    Verification(VerifierError),
}

/// Errors returned by [`ChangeBundleApplier`](crate::ChangeBundleApplier)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    /// Bundle text is malformed; nothing was touched
    #[error("invalid bundle: {0}")]
    Bundle(#[from] BundleError),

    /// Bundle artifact does not exist
    #[error("bundle not found: {0}")]
    BundleNotFound(String),

    /// Verification command given but the applier has no verifier
    #[error("verification requested but no verifier is configured")]
    NoVerifier,

    /// Store failed before the transaction started
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Transaction failed and the store was restored
    #[error("apply failed, rolled back to checkpoint {checkpoint}: {cause}")]
    RolledBack {
        checkpoint: CheckpointId,
        cause: ApplyFailure,
    },

    /// Transaction failed and restoring the checkpoint failed too
    #[error("apply failed ({cause}) and restoring checkpoint {checkpoint} failed: {restore}")]
    RollbackFailed {
        checkpoint: CheckpointId,
        cause: ApplyFailure,
        restore: StoreError,
    },
}

impl ApplyError {
    /// The failure that triggered a rollback, if any
    #[must_use]
    pub fn cause(&self) -> Option<&ApplyFailure> {
        match self {
            Self::RolledBack { cause, .. } | Self::RollbackFailed { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// Check if the store may be left inconsistent
    #[inline]
    #[must_use]
    pub fn is_inconsistent(&self) -> bool {
        matches!(self, Self::RollbackFailed { .. })
    }
}
