//! # Episodic Memory
//!
//! Topic-organized long-term memory for conversational agents.
//!
//! Past exchanges are grouped into *episodes* identified by keyword
//! fingerprints, summarized incrementally, retrieved by similarity to the
//! current turn and merged when several episodes converge on one topic.
//! The language model and the embedding model are reached through the
//! oracle traits of [`episodic_llm`].
//!
//! - [`agent::memory`]: episode identity, the store, and the `load` / `save` orchestrator
//! - [`agent`]: a ready-made conversation loop on top of the memory
//! - [`prompts`]: every prompt sent to the language oracle

#![warn(missing_docs)]

pub mod agent;
pub mod error;
pub mod prompts;

pub use agent::memory::{
    ConversationMemory, EpisodeId, EpisodicMemoryConfig, EpisodicStore, InMemoryEpisodicStore,
    LoadedMemory, MemorySnapshot, MergeOutcome, RelevantEpisodes, ScoredEpisode, TurnReport,
};
pub use agent::{AgentConfig, EpisodicAgent};
pub use error::{EpisodicError, EpisodicResult};
