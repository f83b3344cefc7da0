//! # Episodic Memory
//!
//! Long-term memory organized by topic. Every turn is classified into an
//! *episode* named by a sorted keyword list (its HRID) and the embedding of
//! that list. Episodes similar to the current turn are handed to the host as
//! context, their summaries are rewritten after the host answers, and
//! episodes that converge on the same topic are merged.
//!
//! ## Components
//!
//! - [`EpisodeId`]: keyword fingerprint plus embedding
//! - [`EpisodicStore`]: id to summary, ranked by cosine similarity
//! - [`EpisodeIdentifier`], [`EpisodeSummarizer`], [`EpisodeMerger`]: oracle-driven steps
//! - [`ConversationMemory`]: the `load` / `save` orchestrator
//!
//! ## Example
//!
//! ```rust,no_run
//! use episodic_memory::agent::memory::{
//!     ConversationMemory, EpisodicMemoryConfig, InMemoryEpisodicStore,
//! };
//! use episodic_llm::{build_embedding_oracle, build_language_oracle, LlmConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let llm_config = LlmConfig::from_env()?;
//! let mut memory = ConversationMemory::new(
//!     build_language_oracle(&llm_config)?,
//!     build_embedding_oracle(&llm_config)?,
//!     Arc::new(InMemoryEpisodicStore::new()),
//!     EpisodicMemoryConfig::default(),
//! )?;
//!
//! let input = "Hi! I'm Francisco";
//! let loaded = memory.load(input).await;
//! let reply = format!("Nice to meet you! ({} episodes recalled)", loaded.relevant.len());
//! memory.save(loaded.relevant, input, &reply).await;
//! # Ok(())
//! # }
//! ```

mod config;
mod conversation;
mod episode;
mod identifier;
mod manager;
mod merger;
mod persistence;
mod store;
mod summarizer;

pub use config::EpisodicMemoryConfig;
pub use conversation::{generate_session_id, render_buffer, ChatHistory};
pub use episode::{canonical_hrid, parse_keywords, EpisodeId};
pub use identifier::EpisodeIdentifier;
pub use manager::{ConversationMemory, LoadedMemory, RelevantEpisodes, TurnReport};
pub use merger::{EpisodeMerger, MergeOutcome};
pub use persistence::{EpisodeRecord, MemorySnapshot, SNAPSHOT_VERSION};
pub use store::{
    describe_store, pairwise_similarities, EpisodicStore, InMemoryEpisodicStore, ScoredEpisode,
};
pub use summarizer::EpisodeSummarizer;
