//! Error types for completion routing

/// Errors returned by [`CompletionRouter`](crate::CompletionRouter) and its backends
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    /// Local backend failed
    #[error("local backend error: {0}")]
    Local(String),

    /// Cloud backend failed
    #[error("cloud backend error: {0}")]
    Cloud(String),

    /// Cloud path needed but no client is configured
    #[error("no cloud client configured")]
    NoCloudClient,

    /// A streamed chunk could not be produced
    #[error("stream error: {0}")]
    Stream(String),
}

impl RouterError {
    /// Check if the error came from the local backend
    #[inline]
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}
