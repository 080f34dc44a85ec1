//! Remote completion provider using OpenAI-compatible APIs
//!
//! Implements the CompletionProvider trait over HTTP. Works with any
//! OpenAI-compatible endpoint (DashScope compatible mode by default) with
//! configurable URL and API key via environment variable. Streamed
//! completions are framed as server-sent events and reassembled as the bytes
//! arrive. Image embeddings go to the DashScope native multimodal
//! embedding route under `native_api_url`.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ProviderConfig;
use crate::provider::types::{ChatMessage, CompletionRequest, ProviderError};
use crate::provider::CompletionProvider;
use crate::stream::sse::{SseDecoder, SseEvent, content_text, fragment_from_event};
use crate::stream::StreamReassembler;

/// Remote provider using OpenAI-compatible HTTP APIs
#[derive(Debug)]
pub struct RemoteProvider {
    client: Client,
    config: ProviderConfig,
    api_key: String,
}

/// OpenAI-compatible chat completion request body
#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    enable_search: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

/// OpenAI-compatible chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Value,
}

#[derive(Debug, Serialize)]
struct EmbeddingBody<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// DashScope native multimodal embedding request body
#[derive(Debug, Serialize)]
struct MultimodalEmbeddingBody<'a> {
    model: &'a str,
    input: MultimodalInput<'a>,
}

#[derive(Debug, Serialize)]
struct MultimodalInput<'a> {
    contents: [ImageContent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ImageContent<'a> {
    image: &'a str,
}

#[derive(Debug, Deserialize)]
struct MultimodalEmbeddingResponse {
    output: MultimodalEmbeddingOutput,
}

#[derive(Debug, Deserialize)]
struct MultimodalEmbeddingOutput {
    #[serde(default)]
    embeddings: Vec<EmbeddingData>,
}

const MULTIMODAL_EMBEDDING_PATH: &str =
    "services/embeddings/multimodal-embedding/multimodal-embedding";

impl RemoteProvider {
    /// Create a new remote provider with the given configuration
    ///
    /// Reads the API key from the environment variable named in
    /// `config.api_key_env`.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = env::var(&config.api_key_env).map_err(|_| {
            ProviderError::ConfigError(format!(
                "API key env var '{}' not set",
                config.api_key_env
            ))
        })?;
        Self::with_api_key(config, api_key)
    }

    /// Create a new remote provider with an explicit API key
    pub fn with_api_key(
        config: &ProviderConfig,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        for (key, value) in [
            ("api_url", &config.api_url),
            ("native_api_url", &config.native_api_url),
        ] {
            Url::parse(value).map_err(|e| {
                ProviderError::ConfigError(format!("Invalid {key} '{value}': {e}"))
            })?;
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::ConfigError(e.to_string()))?;

        info!(
            "RemoteProvider initialized with api_url: {}, stream: {}",
            config.api_url, config.stream
        );

        Ok(Self {
            client,
            config: config.clone(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    fn native_endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.native_api_url.trim_end_matches('/'), path)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<Response, ProviderError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        warn!("Provider returned {}: {}", status, error_text);
        Err(ProviderError::Api {
            status: status.as_u16(),
            message: error_message(&error_text),
        })
    }
}

/// Pull the human-readable message out of an error body, if it is JSON
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };

    value
        .get("error")
        .and_then(|e| e.get("message"))
        .or_else(|| value.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

fn is_event_stream(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/event-stream"))
}

fn absorb(reassembler: &mut StreamReassembler, event: SseEvent) -> Result<(), ProviderError> {
    if let SseEvent::Data(data) = event {
        if let Some(fragment) = fragment_from_event(&data)? {
            reassembler.push(&fragment);
        }
    }
    Ok(())
}

/// Consume an SSE body, feeding each fragment through a fresh reassembler
async fn read_stream(response: Response) -> Result<String, ProviderError> {
    let mut body = response.bytes_stream();
    let mut decoder = SseDecoder::new();
    let mut reassembler = StreamReassembler::new();

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        for event in decoder.feed(&chunk) {
            absorb(&mut reassembler, event)?;
        }
    }
    for event in decoder.finish() {
        absorb(&mut reassembler, event)?;
    }

    debug!(
        mode = ?reassembler.mode(),
        len = reassembler.accumulated().len(),
        "Stream reassembled"
    );
    Ok(reassembler.into_text())
}

async fn read_message(response: Response) -> Result<String, ProviderError> {
    let completion: ChatCompletionResponse = response
        .json()
        .await
        .map_err(|e| ProviderError::ParseError(e.to_string()))?;

    completion
        .choices
        .into_iter()
        .next()
        .map(|c| content_text(&c.message.content).unwrap_or_default())
        .ok_or(ProviderError::EmptyResponse)
}

#[async_trait]
impl CompletionProvider for RemoteProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let body = ChatCompletionBody {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            top_p: request.top_p,
            enable_search: request.enable_search,
            stream: self.config.stream,
        };

        let url = self.endpoint("chat/completions");
        debug!("Calling completion API at: {} (model: {})", url, request.model);

        let response = self.post(&url, &body).await?;

        // some endpoints ignore `stream` and answer with a plain JSON body
        if self.config.stream && is_event_stream(&response) {
            read_stream(response).await
        } else {
            read_message(response).await
        }
    }

    async fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, ProviderError> {
        let url = self.endpoint("embeddings");
        debug!("Calling embedding API at: {} (model: {})", url, model);

        let response = self.post(&url, &EmbeddingBody { model, input }).await?;
        let embeddings: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        embeddings
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(ProviderError::EmptyResponse)
    }

    async fn embed_image(&self, model: &str, image_url: &str) -> Result<Vec<f32>, ProviderError> {
        let url = self.native_endpoint(MULTIMODAL_EMBEDDING_PATH);
        debug!("Calling multimodal embedding API at: {} (model: {})", url, model);

        let body = MultimodalEmbeddingBody {
            model,
            input: MultimodalInput {
                contents: [ImageContent { image: image_url }],
            },
        };
        let response = self.post(&url, &body).await?;
        let embeddings: MultimodalEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        embeddings
            .output
            .embeddings
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(ProviderError::EmptyResponse)
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
