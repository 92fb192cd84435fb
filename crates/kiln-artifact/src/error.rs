//! Error types for artifact store operations

use crate::types::{CheckpointId, SessionId};

/// Errors raised by an [`ArtifactStore`](crate::ArtifactStore)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Artifact does not exist
    #[error("artifact not found: {0}")]
    NotFound(String),

    /// Artifact already exists
    #[error("artifact already exists: {0}")]
    AlreadyExists(String),

    /// Checkpoint handle is unknown to the store
    #[error("unknown checkpoint: {0}")]
    UnknownCheckpoint(CheckpointId),

    /// Session handle is unknown to the store
    #[error("unknown session: {0}")]
    UnknownSession(SessionId),

    /// Store could not be reached or refused the operation
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Create unavailable error
    #[inline]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    /// Check if error is transient infrastructure failure
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(StoreError::unavailable("disk gone").is_transient());
        assert!(!StoreError::NotFound("a.js".into()).is_transient());
    }

    #[test]
    fn display_includes_path() {
        let e = StoreError::AlreadyExists("src/a.js".into());
        assert_eq!(e.to_string(), "artifact already exists: src/a.js");
    }
}
