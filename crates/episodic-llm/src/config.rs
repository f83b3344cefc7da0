//! Oracle configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `EPISODIC_*` environment variables (a `.env` file is honoured). Nested
//! retry settings use a double underscore, e.g. `EPISODIC_RETRY__MAX_RETRIES`.

use crate::client::LanguageOracle;
use crate::embedding::{EmbeddingOracle, HashEmbeddingProvider};
use crate::error::{LlmError, LlmResult};
use crate::retry::{ResilientOracle, RetryConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "EPISODIC";

/// Configuration for the language and embedding oracles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Chat provider (`openai`)
    pub provider: String,

    /// Base URL of the OpenAI-compatible server
    pub base_url: Option<String>,

    /// Bearer token
    pub api_key: Option<String>,

    /// Chat completion model
    pub chat_model: String,

    /// Embedding provider (`openai` or `hash`)
    pub embedding_provider: String,

    /// Embedding model
    pub embedding_model: String,

    /// Expected embedding length; `0` accepts whatever the server returns
    pub embedding_dimensions: usize,

    /// Temperature for conversation replies
    pub temperature: f32,

    /// Token limit for conversation replies
    pub max_tokens: Option<u32>,

    /// Timeout and retry policy applied to every oracle call
    pub retry: RetryConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: None,
            api_key: None,
            chat_model: "llama3".to_string(),
            embedding_provider: "openai".to_string(),
            embedding_model: "all-minilm".to_string(),
            embedding_dimensions: 0,
            temperature: 0.0,
            max_tokens: None,
            retry: RetryConfig::default(),
        }
    }
}

impl LlmConfig {
    /// Load from `.env` and the environment
    pub fn from_env() -> LlmResult<Self> {
        Self::load(None::<&Path>)
    }

    /// Load from an optional TOML file, overridden by the environment
    pub fn load(path: Option<impl AsRef<Path>>) -> LlmResult<Self> {
        dotenv::dotenv().ok();

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.as_ref()).required(false));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document (no environment overrides)
    pub fn from_toml_str(toml: &str) -> LlmResult<Self> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot produce a working oracle
    pub fn validate(&self) -> LlmResult<()> {
        if self.chat_model.trim().is_empty() {
            return Err(LlmError::Config("chat_model must not be empty".into()));
        }
        if self.retry.timeout_ms == 0 {
            return Err(LlmError::Config("retry.timeout_ms must be positive".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(LlmError::Config(format!(
                "temperature must be within [0, 2], got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

/// Build the language oracle described by `config`, wrapped in [`ResilientOracle`]
pub fn build_language_oracle(config: &LlmConfig) -> LlmResult<Arc<dyn LanguageOracle>> {
    match config.provider.as_str() {
        #[cfg(feature = "openai")]
        "openai" => {
            let client = crate::openai::OpenAiClient::new(
                config.base_url.clone(),
                config.chat_model.clone(),
                config.api_key.clone(),
            );
            Ok(Arc::new(ResilientOracle::new(client, config.retry.clone())))
        }
        other => Err(LlmError::Config(format!("Unknown LLM provider: {other}"))),
    }
}

/// Build the embedding oracle described by `config`, wrapped in [`ResilientOracle`]
pub fn build_embedding_oracle(config: &LlmConfig) -> LlmResult<Arc<dyn EmbeddingOracle>> {
    match config.embedding_provider.as_str() {
        #[cfg(feature = "openai")]
        "openai" => {
            let client = crate::openai::OpenAiEmbeddings::new(
                config.base_url.clone(),
                config.embedding_model.clone(),
                config.api_key.clone(),
                config.embedding_dimensions,
            );
            Ok(Arc::new(ResilientOracle::new(client, config.retry.clone())))
        }
        "hash" => {
            let dimensions = match config.embedding_dimensions {
                0 => 384,
                n => n,
            };
            Ok(Arc::new(HashEmbeddingProvider::new(dimensions)))
        }
        other => Err(LlmError::Config(format!(
            "Unknown embedding provider: {other}"
        ))),
    }
}
