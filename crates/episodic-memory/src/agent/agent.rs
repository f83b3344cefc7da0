//! Conversation loop backed by episodic memory

use super::config::AgentConfig;
use super::memory::{ConversationMemory, EpisodicMemoryConfig, EpisodicStore};
use crate::error::{EpisodicError, EpisodicResult};
use crate::prompts::{conversation_prompt, CONVERSATION_LABEL};
use episodic_llm::{
    build_embedding_oracle, build_language_oracle, CompletionRequest, LanguageOracle, LlmConfig,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Agent answering through a language oracle with episodic context
pub struct EpisodicAgent {
    /// Oracle producing the replies
    llm: Arc<dyn LanguageOracle>,

    /// Session memory
    memory: ConversationMemory,

    /// Agent configuration
    config: AgentConfig,
}

impl EpisodicAgent {
    /// Create an agent over an existing memory
    pub fn new(
        llm: Arc<dyn LanguageOracle>,
        memory: ConversationMemory,
        config: AgentConfig,
    ) -> Self {
        Self {
            llm,
            memory,
            config,
        }
    }

    /// Build oracles from `llm_config` and a fresh memory over `store`
    pub fn from_config(
        llm_config: &LlmConfig,
        store: Arc<dyn EpisodicStore>,
        memory_config: EpisodicMemoryConfig,
        config: AgentConfig,
    ) -> EpisodicResult<Self> {
        let llm = build_language_oracle(llm_config)
            .map_err(|e| EpisodicError::oracle("build_language_oracle", e))?;
        let embedder = build_embedding_oracle(llm_config)
            .map_err(|e| EpisodicError::oracle("build_embedding_oracle", e))?;
        let memory = ConversationMemory::new(llm.clone(), embedder, store, memory_config)?;
        Ok(Self::new(llm, memory, config))
    }

    /// Answer `user_input`, updating memory around the call.
    ///
    /// A failed conversation call is returned as an error and leaves the
    /// memory untouched apart from the episode registered during `load`.
    pub async fn run(&mut self, user_input: impl Into<String>) -> EpisodicResult<String> {
        let input = user_input.into();
        info!(user_input = %input, "Agent received user input");

        let loaded = self.memory.load(&input).await;
        debug!(
            turn = loaded.relevant.turn(),
            relevant = loaded.relevant.len(),
            "Episodic context loaded"
        );

        let prompt = conversation_prompt(
            &self.config.system_prompt,
            &loaded.episode,
            &loaded.history_buffer,
            &input,
            &self.memory.config().human_prefix,
        );
        let mut request = CompletionRequest::prompt(prompt)
            .with_temperature(self.config.temperature)
            .with_label(CONVERSATION_LABEL);
        if let Some(max_tokens) = self.config.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = self
            .llm
            .complete(request)
            .await
            .map_err(|e| EpisodicError::agent("conversation call failed", e))?;
        let reply = response.content.trim().to_string();

        let report = self.memory.save(loaded.relevant, &input, &reply).await;
        info!(
            turn = report.turn,
            summarized = report.summarized.len(),
            "Agent generated answer"
        );

        Ok(reply)
    }

    /// Forget the transcript, keeping stored episodes
    pub fn reset(&mut self) {
        self.memory.clear();
    }

    /// Session memory
    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Mutable session memory
    pub fn memory_mut(&mut self) -> &mut ConversationMemory {
        &mut self.memory
    }

    /// Agent configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}
