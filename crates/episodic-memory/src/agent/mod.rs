//! # Episodic Agent
//!
//! A conversation loop that recalls relevant episodes before every answer
//! and folds the exchange back into memory afterwards.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use episodic_memory::agent::{AgentConfig, EpisodicAgent};
//! use episodic_memory::agent::memory::{EpisodicMemoryConfig, InMemoryEpisodicStore};
//! use episodic_llm::LlmConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut agent = EpisodicAgent::from_config(
//!     &LlmConfig::from_env()?,
//!     Arc::new(InMemoryEpisodicStore::new()),
//!     EpisodicMemoryConfig::default(),
//!     AgentConfig::default(),
//! )?;
//!
//! let reply = agent.run("Hi! I'm Francisco").await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

mod agent;
mod config;
pub mod memory;

pub use agent::EpisodicAgent;
pub use config::AgentConfig;
