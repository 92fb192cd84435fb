//! Error types for the verification coordinator
//!
//! Timeouts are kept distinct from worker failures so callers can tell a
//! slow worker from a broken one.

use kiln_artifact::StoreError;

/// Errors returned by [`VerificationCoordinator`](crate::VerificationCoordinator)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// `init` has not been called, or re-initialisation failed
    #[error("verification worker is not initialized")]
    NotInitialized,

    /// Coordinator was terminated
    #[error("verification coordinator terminated")]
    Terminated,

    /// No response within the configured timeout
    #[error("verification {id} timed out after {after_secs}s")]
    Timeout { id: String, after_secs: u64 },

    /// Worker crashed or its channel closed while the request was pending
    #[error("verification worker crashed: {0}")]
    WorkerCrashed(String),

    /// Worker reported a worker-level error
    #[error("verification worker error: {0}")]
    WorkerError(String),

    /// Worker completed the request with an error
    #[error("verification failed: {0}")]
    Reported(String),

    /// A request with this correlation id is already in flight
    #[error("verification {0} is already pending")]
    DuplicateId(String),

    /// Spawning the worker failed
    #[error("failed to spawn verification worker: {0}")]
    Spawn(String),

    /// Building the snapshot failed
    #[error("store error while building snapshot: {0}")]
    Store(#[from] StoreError),
}

impl VerifyError {
    /// Check if the request timed out
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if the error came from a worker crash
    #[inline]
    #[must_use]
    pub fn is_crash(&self) -> bool {
        matches!(self, Self::WorkerCrashed(_) | Self::WorkerError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_distinct_from_crash() {
        let timeout = VerifyError::Timeout {
            id: "a".into(),
            after_secs: 30,
        };
        assert!(timeout.is_timeout());
        assert!(!timeout.is_crash());
        assert!(timeout.to_string().contains("30s"));

        let crash = VerifyError::WorkerCrashed("channel closed".into());
        assert!(crash.is_crash());
        assert!(!crash.is_timeout());
    }
}
