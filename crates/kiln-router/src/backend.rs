//! Backend traits
//!
//! Both backends are external collaborators. The router only depends on the
//! response shapes they return, never on their transport.

use crate::error::RouterError;
use crate::types::{ChatMessage, CloudResponse, CompletionOptions, LocalCompletion, StreamChunk};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Stream of completion chunks
pub type ChunkStream = BoxStream<'static, Result<StreamChunk, RouterError>>;

/// In-process model runtime
#[async_trait]
pub trait LocalBackend: Send + Sync {
    /// Whether a model is loaded and able to serve
    fn is_ready(&self) -> bool;

    /// Chat completion
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<LocalCompletion, RouterError>;

    /// Native incremental generation
    async fn stream(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<ChunkStream, RouterError>;
}

/// Remote generation API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CloudClient: Send + Sync {
    /// Generate a full completion with `model`
    async fn generate(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<CloudResponse, RouterError>;
}
