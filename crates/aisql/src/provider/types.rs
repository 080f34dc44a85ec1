//! Request and error types for completion providers

use serde::Serialize;

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One part of a multimodal message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Message content: plain text, or text and images for vision models
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// Message in a chat completion request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(content.into()),
        }
    }

    /// A user message showing `image_urls` followed by the `prompt` text
    pub fn user_with_images<I, S>(image_urls: I, prompt: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parts: Vec<ContentPart> = image_urls
            .into_iter()
            .map(|url| ContentPart::ImageUrl {
                image_url: ImageUrl { url: url.into() },
            })
            .collect();
        parts.push(ContentPart::Text {
            text: prompt.into(),
        });

        Self {
            role: Role::User,
            content: MessageContent::Parts(parts),
        }
    }
}

/// A text completion request, independent of transport
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    /// DashScope web-search augmentation
    pub enable_search: bool,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            top_p: None,
            enable_search: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_search(mut self, enable_search: bool) -> Self {
        self.enable_search = enable_search;
        self
    }
}

/// Provider-specific errors
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Stream error: {0}")]
    Stream(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_message_serialization() {
        let message = ChatMessage::system("你是专业翻译专家");
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"role": "system", "content": "你是专业翻译专家"})
        );
    }

    #[test]
    fn test_image_message_serialization() {
        let message = ChatMessage::user_with_images(["https://example.com/a.png"], "描述这张图片");
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "role": "user",
                "content": [
                    {"type": "image_url", "image_url": {"url": "https://example.com/a.png"}},
                    {"type": "text", "text": "描述这张图片"}
                ]
            })
        );
    }

    #[test]
    fn test_request_builder() {
        let request = CompletionRequest::new("qwen-plus", vec![ChatMessage::user("hi")])
            .with_temperature(0.2)
            .with_top_p(0.8)
            .with_search(true);

        assert_eq!(request.model, "qwen-plus");
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.top_p, Some(0.8));
        assert!(request.enable_search);
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::Api {
            status: 401,
            message: "Invalid API-key provided.".to_string(),
        };
        assert_eq!(err.to_string(), "API returned 401: Invalid API-key provided.");
        assert_eq!(ProviderError::EmptyResponse.to_string(), "Empty response");
    }
}
