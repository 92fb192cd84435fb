//! Router settings

use crate::types::RouterMode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for [`CompletionRouter`](crate::CompletionRouter)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Mode at construction
    pub initial_mode: RouterMode,
    /// Characters per synthesized cloud chunk
    pub chunk_size: usize,
    /// Delay between synthesized cloud chunks, in milliseconds
    pub chunk_delay_ms: u64,
    /// Cloud model used when the request names none
    pub cloud_model: String,
    /// Name reported for local completions lacking a model field
    pub local_model: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            initial_mode: RouterMode::Cloud,
            chunk_size: 10,
            chunk_delay_ms: 10,
            cloud_model: "gemini-2.0-flash".to_string(),
            local_model: "local".to_string(),
        }
    }
}

impl RouterConfig {
    /// Start in `mode`
    #[must_use]
    pub fn with_initial_mode(mut self, mode: RouterMode) -> Self {
        self.initial_mode = mode;
        self
    }

    /// Set the synthesized chunk size
    #[must_use]
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Delay between synthesized chunks
    #[inline]
    #[must_use]
    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }
}
