//! Agent configuration

use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use serde::{Deserialize, Serialize};

/// Configuration for [`EpisodicAgent`](super::EpisodicAgent)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Preamble of the conversation prompt
    pub system_prompt: String,

    /// Sampling temperature of the conversation call
    pub temperature: f32,

    /// Upper bound on reply tokens
    pub max_tokens: Option<u32>,
}

impl AgentConfig {
    /// Set the system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the reply token limit
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.0,
            max_tokens: None,
        }
    }
}
