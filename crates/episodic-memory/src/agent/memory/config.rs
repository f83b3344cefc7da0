//! Episodic memory configuration

use crate::error::{EpisodicError, EpisodicResult};
use serde::{Deserialize, Serialize};

/// Tuning knobs for [`ConversationMemory`](super::ConversationMemory)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodicMemoryConfig {
    /// Episodes retrieved per turn; the history window is `2 * k` messages
    pub k: usize,

    /// Keywords requested from the oracle when identifying an episode
    pub keyword_count: usize,

    /// Retrieval score above which episodes are merged (strict)
    pub merge_threshold: f32,

    /// Oracle answer meaning "no topic"
    pub unidentified_sentinel: String,

    /// Prefix for user lines in the rendered history
    pub human_prefix: String,

    /// Prefix for assistant lines in the rendered history
    pub ai_prefix: String,
}

impl EpisodicMemoryConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set episodes retrieved per turn
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set requested keyword count
    pub fn with_keyword_count(mut self, count: usize) -> Self {
        self.keyword_count = count;
        self
    }

    /// Set merge threshold
    pub fn with_merge_threshold(mut self, threshold: f32) -> Self {
        self.merge_threshold = threshold;
        self
    }

    /// Set the "no topic" sentinel
    pub fn with_unidentified_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.unidentified_sentinel = sentinel.into();
        self
    }

    /// Set speaker prefixes used when rendering history
    pub fn with_prefixes(mut self, human: impl Into<String>, ai: impl Into<String>) -> Self {
        self.human_prefix = human.into();
        self.ai_prefix = ai.into();
        self
    }

    /// Size of the trailing history window in messages
    pub fn history_window(&self) -> usize {
        self.k.saturating_mul(2)
    }

    /// Check every field
    pub fn validate(&self) -> EpisodicResult<()> {
        if self.k == 0 {
            return Err(EpisodicError::validation("k", "must be positive", "0"));
        }
        if self.keyword_count == 0 {
            return Err(EpisodicError::validation(
                "keyword_count",
                "must be positive",
                "0",
            ));
        }
        if !(-1.0..=1.0).contains(&self.merge_threshold) {
            return Err(EpisodicError::validation(
                "merge_threshold",
                "must be within [-1, 1]",
                self.merge_threshold.to_string(),
            ));
        }
        if self.unidentified_sentinel.trim().is_empty() {
            return Err(EpisodicError::validation(
                "unidentified_sentinel",
                "must not be blank",
                format!("{:?}", self.unidentified_sentinel),
            ));
        }
        Ok(())
    }
}

impl Default for EpisodicMemoryConfig {
    fn default() -> Self {
        Self {
            k: 3,
            keyword_count: 7,
            merge_threshold: 0.9,
            unidentified_sentinel: "NONE".to_string(),
            human_prefix: "Human".to_string(),
            ai_prefix: "AI".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EpisodicMemoryConfig::default();
        assert_eq!(config.k, 3);
        assert_eq!(config.keyword_count, 7);
        assert_eq!(config.merge_threshold, 0.9);
        assert_eq!(config.unidentified_sentinel, "NONE");
        assert_eq!(config.history_window(), 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_and_validation() {
        let config = EpisodicMemoryConfig::new()
            .with_k(5)
            .with_keyword_count(4)
            .with_merge_threshold(0.85)
            .with_prefixes("User", "Bot");
        assert_eq!(config.history_window(), 10);
        assert_eq!(config.human_prefix, "User");
        assert!(config.validate().is_ok());

        assert!(EpisodicMemoryConfig::new().with_k(0).validate().is_err());
        assert!(EpisodicMemoryConfig::new()
            .with_merge_threshold(1.5)
            .validate()
            .is_err());
        assert!(EpisodicMemoryConfig::new()
            .with_unidentified_sentinel("  ")
            .validate()
            .is_err());
    }

    #[test]
    fn test_partial_json() {
        let config: EpisodicMemoryConfig = serde_json::from_str(r#"{"k": 2}"#).unwrap();
        assert_eq!(config.k, 2);
        assert_eq!(config.ai_prefix, "AI");
    }
}
