//! In-memory artifact store
//!
//! Reference [`ArtifactStore`] implementation. Checkpoints are full copies
//! of the artifact map, so a restore is exact: anything created, updated or
//! deleted after the checkpoint is reverted.

use crate::error::StoreError;
use crate::hash::ContentHash;
use crate::store::ArtifactStore;
use crate::types::{ArtifactKind, ArtifactMeta, CheckpointInfo, CheckpointId, SessionId, Turn};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone)]
struct Entry {
    content: String,
    meta: ArtifactMeta,
}

impl Entry {
    fn new(kind: ArtifactKind, content: &str, note: &str) -> Self {
        Self {
            content: content.to_string(),
            meta: ArtifactMeta {
                kind,
                hash: ContentHash::of(content),
                size: content.len(),
                note: note.to_string(),
                updated_at: Utc::now(),
            },
        }
    }

    fn replace(&mut self, content: &str) {
        self.content = content.to_string();
        self.meta.hash = ContentHash::of(content);
        self.meta.size = content.len();
        self.meta.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone)]
struct SessionRecord {
    goal: String,
    turns: u32,
}

#[derive(Debug, Default)]
struct Inner {
    artifacts: BTreeMap<String, Entry>,
    checkpoints: HashMap<CheckpointId, (CheckpointInfo, BTreeMap<String, Entry>)>,
    sessions: HashMap<SessionId, SessionRecord>,
}

/// Artifact store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with `(path, content)` pairs
    #[must_use]
    pub fn with_files<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: AsRef<str>,
    {
        let store = Self::new();
        {
            let mut inner = store.inner.write();
            for (path, content) in files {
                let path = path.into();
                let entry = Entry::new(ArtifactKind::from_path(&path), content.as_ref(), "seed");
                inner.artifacts.insert(path, entry);
            }
        }
        store
    }

    /// Path → content view of the current state
    #[must_use]
    pub fn files(&self) -> BTreeMap<String, String> {
        self.inner
            .read()
            .artifacts
            .iter()
            .map(|(p, e)| (p.clone(), e.content.clone()))
            .collect()
    }

    /// Number of checkpoints taken so far
    #[must_use]
    pub fn checkpoint_count(&self) -> usize {
        self.inner.read().checkpoints.len()
    }

    /// Checkpoints ordered by creation
    #[must_use]
    pub fn checkpoints(&self) -> Vec<CheckpointInfo> {
        let mut list: Vec<_> = self
            .inner
            .read()
            .checkpoints
            .values()
            .map(|(info, _)| info.clone())
            .collect();
        list.sort_by_key(|c| c.id);
        list
    }

    /// Goal a session was opened with
    #[must_use]
    pub fn session_goal(&self, session: SessionId) -> Option<String> {
        self.inner.read().sessions.get(&session).map(|s| s.goal.clone())
    }

    /// Number of sessions opened so far
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.inner.read().sessions.len()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn all_metadata(&self) -> Result<BTreeMap<String, ArtifactMeta>, StoreError> {
        Ok(self
            .inner
            .read()
            .artifacts
            .iter()
            .map(|(p, e)| (p.clone(), e.meta.clone()))
            .collect())
    }

    async fn content(&self, path: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.read().artifacts.get(path).map(|e| e.content.clone()))
    }

    async fn create_artifact(
        &self,
        path: &str,
        kind: ArtifactKind,
        content: &str,
        note: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.artifacts.contains_key(path) {
            return Err(StoreError::AlreadyExists(path.to_string()));
        }
        inner
            .artifacts
            .insert(path.to_string(), Entry::new(kind, content, note));
        tracing::trace!(path, "artifact created");
        Ok(())
    }

    async fn update_artifact(&self, path: &str, content: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let entry = inner
            .artifacts
            .get_mut(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        entry.replace(content);
        tracing::trace!(path, "artifact updated");
        Ok(())
    }

    async fn delete_artifact(&self, path: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        inner
            .artifacts
            .remove(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        tracing::trace!(path, "artifact deleted");
        Ok(())
    }

    async fn create_checkpoint(&self, label: &str) -> Result<CheckpointInfo, StoreError> {
        let mut inner = self.inner.write();
        let info = CheckpointInfo {
            id: CheckpointId::new(),
            label: label.to_string(),
            created_at: Utc::now(),
        };
        let snapshot = inner.artifacts.clone();
        inner.checkpoints.insert(info.id, (info.clone(), snapshot));
        tracing::debug!(checkpoint = %info.id, label, "checkpoint created");
        Ok(info)
    }

    async fn restore_checkpoint(&self, id: CheckpointId) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let snapshot = inner
            .checkpoints
            .get(&id)
            .map(|(_, snap)| snap.clone())
            .ok_or(StoreError::UnknownCheckpoint(id))?;
        inner.artifacts = snapshot;
        tracing::debug!(checkpoint = %id, "checkpoint restored");
        Ok(())
    }

    async fn create_session(&self, goal: &str) -> Result<SessionId, StoreError> {
        let id = SessionId::new();
        self.inner.write().sessions.insert(
            id,
            SessionRecord {
                goal: goal.to_string(),
                turns: 0,
            },
        );
        Ok(id)
    }

    async fn create_turn(&self, session: SessionId) -> Result<Turn, StoreError> {
        let mut inner = self.inner.write();
        let record = inner
            .sessions
            .get_mut(&session)
            .ok_or(StoreError::UnknownSession(session))?;
        let number = record.turns;
        record.turns += 1;
        Ok(Turn {
            session_id: session,
            number,
            context_path: format!("/sessions/{session}/turn-{number}.context.bundle"),
            proposal_path: format!("/sessions/{session}/turn-{number}.proposal.bundle"),
        })
    }
}
