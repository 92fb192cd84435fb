//! Verification settings

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings for the verification coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Seconds to wait for a worker response
    pub timeout_secs: u64,
    /// File extensions included in the worker snapshot
    pub extensions: Vec<String>,
    /// Substrings of a file name that include it regardless of extension
    pub name_patterns: Vec<String>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            extensions: ["js", "mjs", "cjs", "jsx", "ts", "tsx", "json", "toml", "yaml", "yml"]
                .into_iter()
                .map(String::from)
                .collect(),
            name_patterns: ["test", "spec", "config"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl VerificationConfig {
    /// Request timeout
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Whether `path` belongs in the worker snapshot
    #[must_use]
    pub fn is_relevant(&self, path: &str) -> bool {
        let path = Path::new(path);
        let ext_match = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)));
        if ext_match {
            return true;
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        self.name_patterns.iter().any(|p| name.contains(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relevance_filter() {
        let cfg = VerificationConfig::default();
        assert!(cfg.is_relevant("src/ui/panel.js"));
        assert!(cfg.is_relevant("package.JSON"));
        assert!(cfg.is_relevant("docs/test-plan.md"));
        assert!(cfg.is_relevant("rollup.config"));
        assert!(!cfg.is_relevant("docs/readme.md"));
        assert!(!cfg.is_relevant("assets/logo.png"));
    }

    #[test]
    fn default_timeout_is_thirty_seconds() {
        assert_eq!(VerificationConfig::default().timeout(), Duration::from_secs(30));
    }
}
