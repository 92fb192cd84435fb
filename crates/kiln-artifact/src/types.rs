//! Core types for the artifact store contract
//!
//! - Session, turn and checkpoint identifiers
//! - Artifact metadata and kinds
//! - Turn handles owning the context and proposal bundle paths

use crate::hash::ContentHash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique session identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Ulid);

impl SessionId {
    /// Generate new session ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque checkpoint handle returned by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CheckpointId(pub Ulid);

impl CheckpointId {
    /// Generate new checkpoint ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for CheckpointId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of file an artifact holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Executable source (js, ts, rs, py, ...)
    Script,
    /// Structured configuration (json, toml, yaml)
    Config,
    /// Markdown, prompts and other prose
    Document,
    /// A bundle written by the cycle (context or proposal)
    Bundle,
    /// Anything else
    #[default]
    Other,
}

impl ArtifactKind {
    /// Guess the kind from a path's extension
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let ext = path.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
        match ext {
            "js" | "mjs" | "ts" | "tsx" | "jsx" | "rs" | "py" | "sh" => Self::Script,
            "json" | "toml" | "yaml" | "yml" => Self::Config,
            "md" | "txt" => Self::Document,
            "bundle" => Self::Bundle,
            _ => Self::Other,
        }
    }
}

/// Metadata recorded for one artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    /// Artifact kind
    pub kind: ArtifactKind,
    /// Hash of the current content
    pub hash: ContentHash,
    /// Content length in bytes
    pub size: usize,
    /// Free-form note supplied on creation
    pub note: String,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// One curate/plan/apply attempt within a session
///
/// Owns the two bundle paths the cycle writes: the read-only context
/// bundle and the proposed change bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Session this turn belongs to
    pub session_id: SessionId,
    /// Turn sequence number within the session (0-based)
    pub number: u32,
    /// Path of the context bundle
    pub context_path: String,
    /// Path of the proposal bundle
    pub proposal_path: String,
}

/// Checkpoint record kept by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointInfo {
    /// Checkpoint ID
    pub id: CheckpointId,
    /// Label supplied on creation
    pub label: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}
