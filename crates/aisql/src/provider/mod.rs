//! Completion providers
//!
//! The LLM service is an external collaborator reached through the
//! [`CompletionProvider`] trait: send messages and parameters, get back the
//! completion text or an error. [`RemoteProvider`] speaks the
//! OpenAI-compatible HTTP protocol.

pub mod remote;
pub mod types;

use async_trait::async_trait;

pub use remote::RemoteProvider;
pub use types::{
    ChatMessage, CompletionRequest, ContentPart, ImageUrl, MessageContent, ProviderError, Role,
};

/// Trait for LLM backends used by the function runner
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Run a chat completion and return the full completion text
    ///
    /// Streaming implementations reassemble the stream before returning.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;

    /// Embed one text with the given embedding model
    async fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, ProviderError>;

    /// Embed the image at `image_url` with a multimodal embedding model
    async fn embed_image(&self, model: &str, image_url: &str) -> Result<Vec<f32>, ProviderError>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
