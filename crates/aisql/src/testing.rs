//! Test utilities for aisql - scripted providers
//!
//! [`MockProvider`] stands in for the remote API in runner and CLI tests:
//! - Completions replay a scripted reply, optionally delivered as stream
//!   fragments and rebuilt by the reassembler
//! - Embeddings are deterministic per input text or image URL
//! - Every request is recorded for assertions

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::provider::{CompletionProvider, CompletionRequest, ProviderError};
use crate::stream::StreamReassembler;

/// Dimension of mock embeddings
pub const MOCK_EMBEDDING_DIM: usize = 16;

#[derive(Debug, Clone)]
enum Script {
    Reply(String),
    Fail { status: u16, message: String },
}

/// Scripted completion provider for tests
#[derive(Debug)]
pub struct MockProvider {
    script: Script,
    embeddings: HashMap<String, Vec<f32>>,
    requests: Mutex<Vec<CompletionRequest>>,
    embedded: Mutex<Vec<String>>,
}

impl MockProvider {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            embeddings: HashMap::new(),
            requests: Mutex::new(Vec::new()),
            embedded: Mutex::new(Vec::new()),
        }
    }

    /// Every completion returns `reply`
    pub fn replying(reply: impl Into<String>) -> Self {
        Self::with_script(Script::Reply(reply.into()))
    }

    /// Every completion is rebuilt from these stream fragments
    pub fn streaming<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let reassembler: StreamReassembler = fragments.into_iter().collect();
        Self::replying(reassembler.into_text())
    }

    /// Every call fails with an API error
    pub fn failing(status: u16, message: impl Into<String>) -> Self {
        Self::with_script(Script::Fail {
            status,
            message: message.into(),
        })
    }

    /// Fix the embedding returned for `text` or an image URL
    pub fn with_embedding(mut self, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        self.embeddings.insert(text.into(), embedding);
        self
    }

    /// Completion requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Texts and image URLs embedded so far, in call order
    pub fn embedded(&self) -> Vec<String> {
        self.embedded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record `input` and answer with its fixed or hashed embedding
    fn embedding_for(&self, input: &str) -> Result<Vec<f32>, ProviderError> {
        self.embedded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(input.to_string());

        match &self.script {
            Script::Fail { status, message } => Err(ProviderError::Api {
                status: *status,
                message: message.clone(),
            }),
            Script::Reply(_) => Ok(self
                .embeddings
                .get(input)
                .cloned()
                .unwrap_or_else(|| mock_embedding(input))),
        }
    }
}

/// Deterministic pseudo-embedding in [-1, 1] derived from a hash of `text`
pub fn mock_embedding(text: &str) -> Vec<f32> {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let seed = hasher.finish();

    (0..MOCK_EMBEDDING_DIM)
        .map(|i| {
            let x = seed
                .wrapping_mul(i as u64 + 1)
                .wrapping_add(0x9e3779b97f4a7c15);
            let normalized = (x as f32) / (u64::MAX as f32);
            (normalized * 2.0) - 1.0
        })
        .collect()
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        match &self.script {
            Script::Reply(reply) => Ok(reply.clone()),
            Script::Fail { status, message } => Err(ProviderError::Api {
                status: *status,
                message: message.clone(),
            }),
        }
    }

    async fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, ProviderError> {
        self.embedding_for(input)
    }

    async fn embed_image(&self, _model: &str, image_url: &str) -> Result<Vec<f32>, ProviderError> {
        self.embedding_for(image_url)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ChatMessage;

    fn request() -> CompletionRequest {
        CompletionRequest::new("qwen-plus", vec![ChatMessage::user("hi")])
    }

    #[test]
    fn mock_embedding_is_deterministic() {
        assert_eq!(mock_embedding("hello world"), mock_embedding("hello world"));
        assert_ne!(mock_embedding("hello"), mock_embedding("world"));
    }

    #[test]
    fn mock_embedding_values_in_range() {
        let emb = mock_embedding("test");
        assert_eq!(emb.len(), MOCK_EMBEDDING_DIM);
        assert!(emb.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[tokio::test]
    async fn streaming_mock_reassembles_fragments() {
        let provider = MockProvider::streaming(["人工智能", "人工智能是计算机科学"]);
        assert_eq!(
            provider.complete(&request()).await.unwrap(),
            "人工智能是计算机科学"
        );
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn failing_mock_fails_every_call() {
        let provider = MockProvider::failing(429, "Throttling");
        for err in [
            provider.complete(&request()).await.unwrap_err(),
            provider.embed("m", "x").await.unwrap_err(),
            provider.embed_image("m", "https://img/x.png").await.unwrap_err(),
        ] {
            assert!(matches!(err, ProviderError::Api { status: 429, .. }));
        }
        assert_eq!(provider.embedded(), vec!["x", "https://img/x.png"]);
    }

    #[tokio::test]
    async fn image_embedding_is_keyed_by_url() {
        let provider =
            MockProvider::replying("").with_embedding("https://img/a.png", vec![0.0, 1.0]);
        assert_eq!(
            provider.embed_image("m", "https://img/a.png").await.unwrap(),
            vec![0.0, 1.0]
        );
        assert_eq!(
            provider.embed_image("m", "https://img/b.png").await.unwrap(),
            mock_embedding("https://img/b.png")
        );
    }

    #[tokio::test]
    async fn fixed_embedding_overrides_hash() {
        let provider = MockProvider::replying("").with_embedding("a", vec![1.0, 0.0]);
        assert_eq!(provider.embed("m", "a").await.unwrap(), vec![1.0, 0.0]);
    }
}
