//! The artifact store contract
//!
//! The store is the one shared mutable resource of the runtime. The cycle
//! opens sessions and turns through it, the applier mutates it, and the
//! verification coordinator reads snapshots from it. Its storage engine is
//! not defined here; [`MemoryStore`](crate::MemoryStore) is the reference
//! implementation.

use crate::error::StoreError;
use crate::types::{ArtifactKind, ArtifactMeta, CheckpointInfo, CheckpointId, SessionId, Turn};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Versioned artifact store consumed by the orchestration engine
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Metadata for every artifact, keyed by path
    async fn all_metadata(&self) -> Result<BTreeMap<String, ArtifactMeta>, StoreError>;

    /// Current content of one artifact, `None` if the path does not exist
    async fn content(&self, path: &str) -> Result<Option<String>, StoreError>;

    /// Create a new artifact
    ///
    /// # Errors
    /// - `StoreError::AlreadyExists` if the path is taken
    async fn create_artifact(
        &self,
        path: &str,
        kind: ArtifactKind,
        content: &str,
        note: &str,
    ) -> Result<(), StoreError>;

    /// Replace the content of an existing artifact
    ///
    /// # Errors
    /// - `StoreError::NotFound` if the path does not exist
    async fn update_artifact(&self, path: &str, content: &str) -> Result<(), StoreError>;

    /// Delete an existing artifact
    ///
    /// # Errors
    /// - `StoreError::NotFound` if the path does not exist
    async fn delete_artifact(&self, path: &str) -> Result<(), StoreError>;

    /// Snapshot the whole store
    async fn create_checkpoint(&self, label: &str) -> Result<CheckpointInfo, StoreError>;

    /// Restore the store to a previous snapshot
    async fn restore_checkpoint(&self, id: CheckpointId) -> Result<(), StoreError>;

    /// Open a new session for a goal
    async fn create_session(&self, goal: &str) -> Result<SessionId, StoreError>;

    /// Open the next turn of a session
    async fn create_turn(&self, session: SessionId) -> Result<Turn, StoreError>;

    /// Whether an artifact exists at `path`
    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.content(path).await?.is_some())
    }

    /// Create the artifact if absent, otherwise overwrite it
    async fn put_artifact(
        &self,
        path: &str,
        kind: ArtifactKind,
        content: &str,
        note: &str,
    ) -> Result<(), StoreError> {
        if self.exists(path).await? {
            self.update_artifact(path, content).await
        } else {
            self.create_artifact(path, kind, content, note).await
        }
    }
}
