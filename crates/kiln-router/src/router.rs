//! Completion router
//!
//! Chooses between the local and the cloud backend per request. The only
//! state is the current [`RouterMode`].
//!
//! - `Local` with a ready backend serves locally; anything else goes to cloud
//! - A local failure falls back to cloud once, switching the mode to `Cloud`
//! - Cloud has no native streaming, so its streams are synthesized from the
//!   full text in fixed-size slices

use crate::backend::{ChunkStream, CloudClient, LocalBackend};
use crate::config::RouterConfig;
use crate::error::RouterError;
use crate::types::{
    ChatMessage, CompletionOptions, CompletionResult, RouterMode, StreamChunk, Usage,
};
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

/// Observational router events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouterEvent {
    /// Mode changed explicitly or was forced
    ModeChanged { mode: RouterMode, reason: String },
    /// A local failure was retried through cloud
    Fallback { error: String },
}

/// Dispatches completions to the local or cloud backend
pub struct CompletionRouter {
    local: Option<Arc<dyn LocalBackend>>,
    cloud: Option<Arc<dyn CloudClient>>,
    config: RouterConfig,
    mode: RwLock<RouterMode>,
    events: broadcast::Sender<RouterEvent>,
}

impl CompletionRouter {
    /// Create router
    #[must_use]
    pub fn new(
        local: Option<Arc<dyn LocalBackend>>,
        cloud: Option<Arc<dyn CloudClient>>,
        config: RouterConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            local,
            cloud,
            mode: RwLock::new(config.initial_mode),
            config,
            events,
        }
    }

    /// Current mode
    #[inline]
    #[must_use]
    pub fn mode(&self) -> RouterMode {
        *self.mode.read()
    }

    /// Whether a local backend is present and ready
    #[must_use]
    pub fn is_local_ready(&self) -> bool {
        self.local.as_ref().is_some_and(|l| l.is_ready())
    }

    /// Subscribe to router events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
        self.events.subscribe()
    }

    /// Switch mode
    ///
    /// Returns false, leaving the mode unchanged, when asked for `Local`
    /// while the local backend is not ready.
    pub fn set_mode(&self, mode: RouterMode) -> bool {
        if mode == RouterMode::Local && !self.is_local_ready() {
            tracing::warn!("refusing local mode: local backend not ready");
            return false;
        }
        self.switch(mode, "requested");
        true
    }

    /// Local backend unloaded its model
    pub fn on_local_unloaded(&self) {
        if self.mode() == RouterMode::Local {
            tracing::warn!("local backend unloaded, forcing cloud mode");
            self.switch(RouterMode::Cloud, "local backend unloaded");
        }
    }

    /// Complete `messages` on the current backend
    ///
    /// # Errors
    /// - `RouterError::NoCloudClient` if the cloud path is needed and absent
    /// - `RouterError::Local` if the local path fails and there is no cloud client
    /// - `RouterError::Cloud` if the cloud path fails
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<CompletionResult, RouterError> {
        if let Some(local) = self.local_route() {
            match local.chat(messages, options).await {
                Ok(response) => {
                    let result = CompletionResult::from_local(response, &self.config.local_model);
                    tracing::debug!(
                        model = %result.model,
                        tokens = result.usage.total_tokens,
                        "local completion"
                    );
                    return Ok(result);
                }
                Err(e) => self.fall_back(e)?,
            }
        }
        self.complete_cloud(messages, options).await
    }

    /// Stream `messages` on the current backend
    ///
    /// Local streams are forwarded as-is. Cloud streams slice the full text
    /// into `chunk_size` characters, `chunk_delay_ms` apart, then end with a
    /// `done` chunk carrying usage.
    ///
    /// # Errors
    /// Same as [`complete`](Self::complete); errors are raised before the
    /// first chunk.
    pub async fn stream(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<ChunkStream, RouterError> {
        if let Some(local) = self.local_route() {
            match local.stream(messages, options).await {
                Ok(chunks) => return Ok(chunks),
                Err(e) => self.fall_back(e)?,
            }
        }
        let result = self.complete_cloud(messages, options).await?;
        Ok(synthesize(
            &result.text,
            result.usage,
            self.config.chunk_size,
            self.config.chunk_delay(),
        ))
    }

    fn local_route(&self) -> Option<&Arc<dyn LocalBackend>> {
        if self.mode() != RouterMode::Local {
            return None;
        }
        self.local.as_ref().filter(|l| l.is_ready())
    }

    /// Decide what to do with a local failure: fall back or re-raise
    fn fall_back(&self, error: RouterError) -> Result<(), RouterError> {
        if self.cloud.is_none() {
            return Err(error);
        }
        tracing::warn!(error = %error, "local completion failed, falling back to cloud");
        *self.mode.write() = RouterMode::Cloud;
        let _ = self.events.send(RouterEvent::Fallback {
            error: error.to_string(),
        });
        Ok(())
    }

    async fn complete_cloud(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<CompletionResult, RouterError> {
        let cloud = self.cloud.as_ref().ok_or(RouterError::NoCloudClient)?;
        let model = options
            .model
            .clone()
            .unwrap_or_else(|| self.config.cloud_model.clone());
        let response = cloud.generate(&model, messages, options).await?;
        let result = CompletionResult::from_cloud(response, &model);
        tracing::debug!(
            model = %result.model,
            tokens = result.usage.total_tokens,
            "cloud completion"
        );
        Ok(result)
    }

    fn switch(&self, mode: RouterMode, reason: &str) {
        let previous = std::mem::replace(&mut *self.mode.write(), mode);
        if previous != mode {
            tracing::info!(from = %previous, to = %mode, reason, "router mode changed");
            let _ = self.events.send(RouterEvent::ModeChanged {
                mode,
                reason: reason.to_string(),
            });
        }
    }
}

fn synthesize(text: &str, usage: Usage, chunk_size: usize, delay: Duration) -> ChunkStream {
    let chars: Vec<char> = text.chars().collect();
    let chunks: Vec<StreamChunk> = chars
        .chunks(chunk_size.max(1))
        .map(|c| StreamChunk::text(c.iter().collect::<String>()))
        .chain(std::iter::once(StreamChunk::done(usage)))
        .collect();

    stream::iter(chunks.into_iter().enumerate())
        .then(move |(i, chunk)| async move {
            if i > 0 {
                tokio::time::sleep(delay).await;
            }
            Ok::<_, RouterError>(chunk)
        })
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockCloudClient;
    use crate::types::{
        CloudResponse, LocalChoice, LocalCompletion, LocalUsage, Provider, UsageMetadata,
    };
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct StubLocal {
        ready: AtomicBool,
        fail: bool,
        calls: AtomicUsize,
    }

    impl StubLocal {
        fn new(ready: bool, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                ready: AtomicBool::new(ready),
                fail,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LocalBackend for StubLocal {
        fn is_ready(&self) -> bool {
            self.ready.load(Ordering::SeqCst)
        }

        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _options: &CompletionOptions,
        ) -> Result<LocalCompletion, RouterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RouterError::Local("out of memory".into()));
            }
            Ok(LocalCompletion {
                model: Some("tiny".into()),
                choices: vec![LocalChoice {
                    message: ChatMessage::assistant("local answer"),
                }],
                usage: Some(LocalUsage {
                    prompt_tokens: 2,
                    completion_tokens: 2,
                    total_tokens: 4,
                }),
            })
        }

        async fn stream(
            &self,
            _messages: &[ChatMessage],
            _options: &CompletionOptions,
        ) -> Result<ChunkStream, RouterError> {
            if self.fail {
                return Err(RouterError::Local("out of memory".into()));
            }
            Ok(stream::iter(vec![
                Ok(StreamChunk::text("na")),
                Ok(StreamChunk::text("tive")),
                Ok(StreamChunk::done(Usage::default())),
            ])
            .boxed())
        }
    }

    fn cloud_ok(text: &'static str) -> MockCloudClient {
        let mut cloud = MockCloudClient::new();
        cloud.expect_generate().returning(move |_, _, _| {
            Ok(CloudResponse::from_text(
                text,
                UsageMetadata {
                    prompt_token_count: 5,
                    candidates_token_count: 3,
                    total_token_count: 8,
                },
            ))
        });
        cloud
    }

    fn router(
        local: Option<Arc<StubLocal>>,
        cloud: Option<MockCloudClient>,
        mode: RouterMode,
    ) -> CompletionRouter {
        CompletionRouter::new(
            local.map(|l| l as Arc<dyn LocalBackend>),
            cloud.map(|c| Arc::new(c) as Arc<dyn CloudClient>),
            RouterConfig::default().with_initial_mode(mode),
        )
    }

    fn prompt() -> Vec<ChatMessage> {
        vec![ChatMessage::system("be brief"), ChatMessage::user("hi")]
    }

    #[tokio::test]
    async fn local_mode_uses_ready_local_backend() {
        let r = router(
            Some(StubLocal::new(true, false)),
            Some(MockCloudClient::new()),
            RouterMode::Local,
        );
        let result = r.complete(&prompt(), &CompletionOptions::default()).await.unwrap();
        assert_eq!(result.provider, Provider::Local);
        assert_eq!(result.text, "local answer");
        assert_eq!(result.model, "tiny");
    }

    #[tokio::test]
    async fn local_mode_with_unready_backend_goes_to_cloud() {
        let local = StubLocal::new(false, false);
        let r = router(Some(Arc::clone(&local)), Some(cloud_ok("cloud answer")), RouterMode::Local);
        let mut events = r.subscribe();
        let result = r.complete(&prompt(), &CompletionOptions::default()).await.unwrap();
        assert_eq!(result.provider, Provider::Cloud);
        assert_eq!(local.calls.load(Ordering::SeqCst), 0);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn cloud_request_uses_option_model_or_default() {
        let mut cloud = MockCloudClient::new();
        cloud
            .expect_generate()
            .withf(|model, _, _| model.eq_ignore_ascii_case("custom"))
            .times(1)
            .returning(|_, _, _| Ok(CloudResponse::from_text("x", UsageMetadata::default())));
        let r = router(None, Some(cloud), RouterMode::Cloud);
        let options = CompletionOptions {
            model: Some("custom".into()),
            ..CompletionOptions::default()
        };
        let result = r.complete(&prompt(), &options).await.unwrap();
        assert_eq!(result.model, "custom");
    }

    #[tokio::test]
    async fn local_failure_falls_back_with_exactly_one_event() {
        let r = router(
            Some(StubLocal::new(true, true)),
            Some(cloud_ok("rescued")),
            RouterMode::Local,
        );
        let mut events = r.subscribe();

        let result = r.complete(&prompt(), &CompletionOptions::default()).await.unwrap();
        assert_eq!(result.provider, Provider::Cloud);
        assert_eq!(result.text, "rescued");
        assert_eq!(result.usage.total_tokens, 8);

        assert_eq!(
            events.try_recv().unwrap(),
            RouterEvent::Fallback {
                error: "local backend error: out of memory".into()
            }
        );
        assert!(events.try_recv().is_err());
        assert_eq!(r.mode(), RouterMode::Cloud);
    }

    #[tokio::test]
    async fn local_failure_without_cloud_reraises_original_error() {
        let r = router(Some(StubLocal::new(true, true)), None, RouterMode::Local);
        let mut events = r.subscribe();
        let err = r.complete(&prompt(), &CompletionOptions::default()).await.unwrap_err();
        assert_eq!(err, RouterError::Local("out of memory".into()));
        assert!(events.try_recv().is_err());
        assert_eq!(r.mode(), RouterMode::Local);
    }

    #[tokio::test]
    async fn cloud_mode_without_client_is_an_error() {
        let r = router(None, None, RouterMode::Cloud);
        assert_eq!(
            r.complete(&prompt(), &CompletionOptions::default()).await.unwrap_err(),
            RouterError::NoCloudClient
        );
    }

    #[test]
    fn set_local_mode_requires_ready_backend() {
        let local = StubLocal::new(false, false);
        let r = router(Some(Arc::clone(&local)), None, RouterMode::Cloud);
        let mut events = r.subscribe();
        assert!(!r.set_mode(RouterMode::Local));
        assert_eq!(r.mode(), RouterMode::Cloud);
        assert!(events.try_recv().is_err());

        local.ready.store(true, Ordering::SeqCst);
        assert!(r.set_mode(RouterMode::Local));
        assert_eq!(r.mode(), RouterMode::Local);
        assert_eq!(
            events.try_recv().unwrap(),
            RouterEvent::ModeChanged {
                mode: RouterMode::Local,
                reason: "requested".into()
            }
        );
    }

    #[test]
    fn unload_forces_cloud_only_when_local() {
        let r = router(Some(StubLocal::new(true, false)), None, RouterMode::Local);
        let mut events = r.subscribe();
        r.on_local_unloaded();
        assert_eq!(r.mode(), RouterMode::Cloud);
        assert!(matches!(
            events.try_recv().unwrap(),
            RouterEvent::ModeChanged {
                mode: RouterMode::Cloud,
                ..
            }
        ));

        r.on_local_unloaded();
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn local_stream_is_forwarded() {
        let r = router(Some(StubLocal::new(true, false)), None, RouterMode::Local);
        let chunks: Vec<_> = r
            .stream(&prompt(), &CompletionOptions::default())
            .await
            .unwrap()
            .collect()
            .await;
        let text: String = chunks.iter().map(|c| c.as_ref().unwrap().text.clone()).collect();
        assert_eq!(text, "native");
    }

    #[tokio::test(start_paused = true)]
    async fn cloud_stream_is_synthesized_in_fixed_slices() {
        let r = router(None, Some(cloud_ok("hello world, kiln!")), RouterMode::Cloud);
        let started = tokio::time::Instant::now();
        let chunks: Vec<StreamChunk> = r
            .stream(&prompt(), &CompletionOptions::default())
            .await
            .unwrap()
            .map(Result::unwrap)
            .collect()
            .await;

        assert_eq!(
            chunks,
            vec![
                StreamChunk::text("hello worl"),
                StreamChunk::text("d, kiln!"),
                StreamChunk::done(Usage {
                    prompt_tokens: 5,
                    completion_tokens: 3,
                    total_tokens: 8
                }),
            ]
        );
        // Two gaps of the configured delay between three chunks.
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn empty_cloud_text_streams_only_done() {
        let r = router(None, Some(cloud_ok("")), RouterMode::Cloud);
        let chunks: Vec<_> = r
            .stream(&prompt(), &CompletionOptions::default())
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].as_ref().unwrap().done);
    }
}
