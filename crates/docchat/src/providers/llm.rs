//! LLM provider trait

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;

/// A lazy, finite sequence of generated text fragments
pub type CompletionStream = BoxStream<'static, Result<String>>;

/// Capability: generate tokens for a prompt, streaming
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a complete answer in one response
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Generate an answer as a stream of text fragments, in generation order
    async fn stream_completion(&self, prompt: &str) -> Result<CompletionStream>;

    /// Check if the provider is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model identifier
    fn model(&self) -> &str;
}
