//! # Episodic - Conversational Agents with Episodic Memory
//!
//! **Episodic** brings together:
//!
//! - **Episodic LLM**: oracle traits for language and embedding models, an
//!   OpenAI-compatible client, timeouts and retries
//! - **Episodic Memory**: topic-organized long-term memory with keyword
//!   fingerprints, similarity retrieval, incremental summaries and merging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use episodic::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut agent = EpisodicAgent::from_config(
//!         &LlmConfig::from_env()?,
//!         Arc::new(InMemoryEpisodicStore::new()),
//!         EpisodicMemoryConfig::default(),
//!         AgentConfig::default(),
//!     )?;
//!
//!     println!("{}", agent.run("Hi! I'm Francisco").await?);
//!     println!("{}", agent.run("Do you remember my name?").await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//!            episodic
//!        (umbrella crate)
//!               |
//!       +-------+--------+
//!       |                |
//!  episodic-llm   episodic-memory
//!    (oracles)   (store, load/save)
//! ```

#![doc(html_root_url = "https://docs.rs/episodic/0.1.0")]
#![warn(missing_docs)]

#[cfg(feature = "llm")]
pub use episodic_llm as llm;

#[cfg(feature = "memory")]
pub use episodic_memory as memory;

/// Commonly used types and traits
pub mod prelude {
    #[cfg(feature = "llm")]
    pub use crate::llm::{
        ChatMessage, CompletionRequest, EmbeddingOracle, LanguageOracle, LlmConfig, LlmError,
        MessageRole, RetryConfig,
    };

    #[cfg(feature = "memory")]
    pub use crate::memory::{
        agent::{AgentConfig, EpisodicAgent},
        error::{EpisodicError, EpisodicResult},
    };

    #[cfg(feature = "memory")]
    pub use crate::memory::agent::memory::{
        ConversationMemory, EpisodeId, EpisodicMemoryConfig, EpisodicStore,
        InMemoryEpisodicStore, LoadedMemory, MemorySnapshot, MergeOutcome, RelevantEpisodes,
        TurnReport,
    };
}
