//! Runtime configuration
//!
//! Every field has a default, so an empty TOML document is a valid config.
//!
//! ```toml
//! [cycle]
//! relevance_markers = ["ui", "agent"]
//! verify_command = "full"
//! max_retries = 3
//!
//! [verification]
//! timeout_secs = 30
//!
//! [router]
//! initial_mode = "local"
//! chunk_size = 10
//! ```

use crate::error::ConfigError;
use kiln_router::RouterConfig;
use kiln_verify::VerificationConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KilnConfig {
    /// Cycle coordinator settings
    pub cycle: CycleConfig,
    /// Verification coordinator settings
    pub verification: VerificationConfig,
    /// Completion router settings
    pub router: RouterConfig,
}

/// Cycle coordinator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Path substrings selecting files for the context bundle
    pub relevance_markers: Vec<String>,
    /// Verification command passed to the applier after each apply
    pub verify_command: Option<String>,
    /// Failed applies tolerated before the cycle gives up; unbounded if unset
    pub max_retries: Option<u32>,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            relevance_markers: vec!["ui".to_string(), "agent".to_string()],
            verify_command: None,
            max_retries: None,
        }
    }
}

impl CycleConfig {
    /// With relevance markers
    #[must_use]
    pub fn with_relevance_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relevance_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// With verification command
    #[must_use]
    pub fn with_verify_command(mut self, command: impl Into<String>) -> Self {
        self.verify_command = Some(command.into());
        self
    }

    /// With retry cap
    #[inline]
    #[must_use]
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = Some(max);
        self
    }

    /// Whether `path` contains a relevance marker
    #[must_use]
    pub fn is_relevant(&self, path: &str) -> bool {
        self.relevance_markers.iter().any(|m| path.contains(m.as_str()))
    }
}

impl KilnConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// - `ConfigError::Parse` on malformed TOML or mistyped fields
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - `ConfigError::Parse` on malformed TOML
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// With cycle settings
    #[must_use]
    pub fn with_cycle(mut self, cycle: CycleConfig) -> Self {
        self.cycle = cycle;
        self
    }

    /// With verification settings
    #[must_use]
    pub fn with_verification(mut self, verification: VerificationConfig) -> Self {
        self.verification = verification;
        self
    }

    /// With router settings
    #[must_use]
    pub fn with_router(mut self, router: RouterConfig) -> Self {
        self.router = router;
        self
    }
}
