//! # Episodic LLM
//!
//! Oracle layer for the episodic memory system: the language model and the
//! embedding model are black boxes behind two object-safe async traits.
//!
//! - [`LanguageOracle`]: prompt in, text out
//! - [`EmbeddingOracle`]: text in, fixed-length vector out
//! - [`ResilientOracle`]: per-call timeout plus bounded exponential-backoff retries
//! - [`OpenAiClient`] / [`OpenAiEmbeddings`]: OpenAI-compatible HTTP backends
//!   (feature `openai`, on by default)
//!
//! ## Example
//!
//! ```rust,no_run
//! use episodic_llm::{build_language_oracle, CompletionRequest, LlmConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LlmConfig::from_env()?;
//! let llm = build_language_oracle(&config)?;
//!
//! let reply = llm
//!     .complete(CompletionRequest::prompt("Say hi").with_temperature(0.0))
//!     .await?;
//! println!("{}", reply.content);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod embedding;
pub mod error;
pub mod retry;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::{ChatMessage, CompletionRequest, CompletionResponse, LanguageOracle, MessageRole};
pub use config::{build_embedding_oracle, build_language_oracle, LlmConfig};
pub use embedding::{cosine_similarity, Embedding, EmbeddingOracle, HashEmbeddingProvider};
pub use error::{LlmError, LlmResult};
pub use retry::{ResilientOracle, RetryConfig};

#[cfg(feature = "openai")]
pub use openai::{OpenAiClient, OpenAiEmbeddings};
