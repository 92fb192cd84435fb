//! Testing utilities for the Kiln workspace
//!
//! Scripted collaborators and fault-injecting wrappers shared by the
//! crate-level test suites.

#![allow(missing_docs)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use kiln_artifact::{
    ArtifactKind, ArtifactMeta, ArtifactStore, CheckpointId, CheckpointInfo, MemoryStore,
    SessionId, StoreError, Turn,
};
use kiln_bundle::{ChangeBundle, ChangeEntry, ChangeVerifier, VerificationReport, VerifierError};
use kiln_router::{
    ChatMessage, ChunkStream, CloudClient, CloudResponse, CompletionOptions, LocalBackend,
    LocalChoice, LocalCompletion, LocalUsage, RouterError, StreamChunk, Usage, UsageMetadata,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Bundles and events
// ---------------------------------------------------------------------------

/// Render entries as change bundle text
pub fn bundle_text(entries: Vec<ChangeEntry>) -> String {
    ChangeBundle::from_entries(entries)
        .render()
        .expect("test entries must not contain fence lines")
}

/// Everything currently buffered on `rx`
pub fn drain<T: Clone>(rx: &mut broadcast::Receiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

// ---------------------------------------------------------------------------
// Completion backends
// ---------------------------------------------------------------------------

/// Cloud client answering from a queue of texts
#[derive(Default)]
pub struct ScriptedCloud {
    replies: Mutex<VecDeque<Result<String, RouterError>>>,
    prompts: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedCloud {
    pub fn new<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            prompts: Mutex::default(),
        })
    }

    pub fn push(&self, reply: impl Into<String>) {
        self.replies.lock().push_back(Ok(reply.into()));
    }

    pub fn push_error(&self, error: RouterError) {
        self.replies.lock().push_back(Err(error));
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<Vec<ChatMessage>> {
        self.prompts.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl CloudClient for ScriptedCloud {
    async fn generate(
        &self,
        _model: &str,
        messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<CloudResponse, RouterError> {
        self.prompts.lock().push(messages.to_vec());
        let reply = self
            .replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(RouterError::Cloud("script exhausted".into())))?;
        let tokens = u32::try_from(reply.len()).unwrap_or(u32::MAX);
        Ok(CloudResponse::from_text(
            reply,
            UsageMetadata {
                prompt_token_count: 1,
                candidates_token_count: tokens,
                total_token_count: tokens.saturating_add(1),
            },
        ))
    }
}

/// Local backend answering from a queue, with a toggleable ready flag
#[derive(Default)]
pub struct ScriptedLocal {
    ready: AtomicBool,
    replies: Mutex<VecDeque<Result<String, RouterError>>>,
}

impl ScriptedLocal {
    pub fn new(ready: bool) -> Arc<Self> {
        Arc::new(Self {
            ready: AtomicBool::new(ready),
            replies: Mutex::default(),
        })
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn push(&self, reply: impl Into<String>) {
        self.replies.lock().push_back(Ok(reply.into()));
    }

    pub fn push_error(&self, error: RouterError) {
        self.replies.lock().push_back(Err(error));
    }

    fn next(&self) -> Result<String, RouterError> {
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(RouterError::Local("script exhausted".into())))
    }
}

#[async_trait]
impl LocalBackend for ScriptedLocal {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn chat(
        &self,
        _messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<LocalCompletion, RouterError> {
        let text = self.next()?;
        Ok(LocalCompletion {
            model: Some("scripted-local".into()),
            choices: vec![LocalChoice {
                message: ChatMessage::assistant(text),
            }],
            usage: Some(LocalUsage::default()),
        })
    }

    async fn stream(
        &self,
        _messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<ChunkStream, RouterError> {
        let text = self.next()?;
        let mut chunks: Vec<Result<StreamChunk, RouterError>> = text
            .split_inclusive(' ')
            .map(|w| Ok(StreamChunk::text(w)))
            .collect();
        chunks.push(Ok(StreamChunk::done(Usage::default())));
        Ok(stream::iter(chunks).boxed())
    }
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

/// Verifier answering from a queue; passes once the queue is empty
#[derive(Default)]
pub struct ScriptedVerifier {
    results: Mutex<VecDeque<Result<VerificationReport, VerifierError>>>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl ScriptedVerifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn pass(&self) {
        self.push(Ok(VerificationReport {
            success: true,
            output: "ok".into(),
        }));
    }

    pub fn fail(&self, output: impl Into<String>) {
        self.push(Ok(VerificationReport {
            success: false,
            output: output.into(),
        }));
    }

    pub fn push(&self, result: Result<VerificationReport, VerifierError>) {
        self.results.lock().push_back(result);
    }

    /// `(command, paths)` of every call so far
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ChangeVerifier for ScriptedVerifier {
    async fn verify(
        &self,
        command: &str,
        paths: &[String],
    ) -> Result<VerificationReport, VerifierError> {
        self.calls.lock().push((command.to_string(), paths.to_vec()));
        self.results.lock().pop_front().unwrap_or_else(|| {
            Ok(VerificationReport {
                success: true,
                output: "ok".into(),
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Fault-injecting store
// ---------------------------------------------------------------------------

/// Store operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Metadata,
    Content,
    Create,
    Update,
    Delete,
    Checkpoint,
    Restore,
    Session,
    Turn,
}

/// [`MemoryStore`] wrapper failing chosen operations after a number of calls
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryStore,
    rules: Mutex<HashMap<StoreOp, usize>>,
}

impl FailingStore {
    pub fn new(inner: MemoryStore) -> Arc<Self> {
        Arc::new(Self {
            inner,
            rules: Mutex::default(),
        })
    }

    /// Fail every call to `op`
    pub fn fail(&self, op: StoreOp) {
        self.fail_after(op, 0);
    }

    /// Let `successes` calls to `op` through, then fail the rest
    pub fn fail_after(&self, op: StoreOp, successes: usize) {
        self.rules.lock().insert(op, successes);
    }

    /// Stop failing `op`
    pub fn heal(&self, op: StoreOp) {
        self.rules.lock().remove(&op);
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn check(&self, op: StoreOp) -> Result<(), StoreError> {
        let mut rules = self.rules.lock();
        match rules.get_mut(&op) {
            None => Ok(()),
            Some(0) => Err(StoreError::unavailable(format!("injected {op:?} failure"))),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ArtifactStore for FailingStore {
    async fn all_metadata(&self) -> Result<BTreeMap<String, ArtifactMeta>, StoreError> {
        self.check(StoreOp::Metadata)?;
        self.inner.all_metadata().await
    }

    async fn content(&self, path: &str) -> Result<Option<String>, StoreError> {
        self.check(StoreOp::Content)?;
        self.inner.content(path).await
    }

    async fn create_artifact(
        &self,
        path: &str,
        kind: ArtifactKind,
        content: &str,
        note: &str,
    ) -> Result<(), StoreError> {
        self.check(StoreOp::Create)?;
        self.inner.create_artifact(path, kind, content, note).await
    }

    async fn update_artifact(&self, path: &str, content: &str) -> Result<(), StoreError> {
        self.check(StoreOp::Update)?;
        self.inner.update_artifact(path, content).await
    }

    async fn delete_artifact(&self, path: &str) -> Result<(), StoreError> {
        self.check(StoreOp::Delete)?;
        self.inner.delete_artifact(path).await
    }

    async fn create_checkpoint(&self, label: &str) -> Result<CheckpointInfo, StoreError> {
        self.check(StoreOp::Checkpoint)?;
        self.inner.create_checkpoint(label).await
    }

    async fn restore_checkpoint(&self, id: CheckpointId) -> Result<(), StoreError> {
        self.check(StoreOp::Restore)?;
        self.inner.restore_checkpoint(id).await
    }

    async fn create_session(&self, goal: &str) -> Result<SessionId, StoreError> {
        self.check(StoreOp::Session)?;
        self.inner.create_session(goal).await
    }

    async fn create_turn(&self, session: SessionId) -> Result<Turn, StoreError> {
        self.check(StoreOp::Turn)?;
        self.inner.create_turn(session).await
    }
}
