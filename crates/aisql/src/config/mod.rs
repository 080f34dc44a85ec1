use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AisqlError, Result};

/// Main configuration structure for aisql
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote LLM provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Default models per function family
    #[serde(default)]
    pub models: ModelsConfig,
}

impl Config {
    /// Load configuration from an explicit path, or the first default
    /// location that exists, or fall back to defaults.
    ///
    /// Default locations, in order: `~/.aisql/config.toml`,
    /// `<config dir>/aisql/config.toml`, `./config.toml`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            tracing::info!("Loading config from: {}", path.display());
            return Self::from_file(path);
        }

        let default_paths = [
            dirs::home_dir().map(|h| h.join(".aisql").join("config.toml")),
            dirs::config_dir().map(|c| c.join("aisql").join("config.toml")),
            Some(PathBuf::from("config.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read and parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AisqlError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content)
            .map_err(|e| AisqlError::Config(format!("Failed to parse config: {e}")))
    }
}

/// Remote LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Base URL of the DashScope native API, used for multimodal embeddings
    #[serde(default = "default_native_api_url")]
    pub native_api_url: String,
    /// Environment variable name for API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Request completions as a server-sent event stream
    #[serde(default = "default_stream")]
    pub stream: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            native_api_url: default_native_api_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            stream: default_stream(),
        }
    }
}

fn default_api_url() -> String {
    "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string()
}

fn default_native_api_url() -> String {
    "https://dashscope.aliyuncs.com/api/v1".to_string()
}

fn default_api_key_env() -> String {
    "DASHSCOPE_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_stream() -> bool {
    true
}

/// Default model identifiers, overridable per call with `model_name`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Text generation model
    #[serde(default = "default_text_model")]
    pub text: String,
    /// Text embedding model
    #[serde(default = "default_embedding_model")]
    pub embedding: String,
    /// Vision-language model for image, chart and document functions
    #[serde(default = "default_vision_model")]
    pub vision: String,
    /// Multimodal embedding model for image vectors
    #[serde(default = "default_image_embedding_model")]
    pub image_embedding: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            text: default_text_model(),
            embedding: default_embedding_model(),
            vision: default_vision_model(),
            image_embedding: default_image_embedding_model(),
        }
    }
}

fn default_text_model() -> String {
    "qwen-plus".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-v4".to_string()
}

fn default_vision_model() -> String {
    "qwen-vl-plus".to_string()
}

fn default_image_embedding_model() -> String {
    "multimodal-embedding-one-peace-v1".to_string()
}
