//! Incremental episode summaries

use super::config::EpisodicMemoryConfig;
use super::conversation::render_buffer;
use super::episode::EpisodeId;
use super::merger::extract_json_object;
use crate::error::{EpisodicError, EpisodicResult};
use crate::prompts::{summarization_prompt, SUMMARIZE_LABEL};
use episodic_llm::{ChatMessage, CompletionRequest, LanguageOracle};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{Instrument, Span};

/// Rewrites episode summaries after each exchange
pub struct EpisodeSummarizer {
    llm: Arc<dyn LanguageOracle>,
    config: EpisodicMemoryConfig,
    span: Span,
}

impl EpisodeSummarizer {
    /// Create a summarizer
    pub fn new(llm: Arc<dyn LanguageOracle>, config: EpisodicMemoryConfig) -> Self {
        Self {
            llm,
            config,
            span: tracing::info_span!("episode_summarizer"),
        }
    }

    /// Emit events inside `span` instead of the default one
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// New summary for `episode` after the exchange `input` / `output`.
    ///
    /// An empty answer keeps `existing_summary`.
    pub async fn update(
        &self,
        episode: &EpisodeId,
        existing_summary: &str,
        recent_history: &[ChatMessage],
        input: &str,
        output: &str,
    ) -> EpisodicResult<String> {
        let buffer = render_buffer(
            recent_history,
            &self.config.human_prefix,
            &self.config.ai_prefix,
        );
        let prompt = summarization_prompt(
            episode.hrid(),
            existing_summary,
            &buffer,
            input,
            output,
            &self.config.human_prefix,
            &self.config.ai_prefix,
        );

        let response = self
            .llm
            .complete(
                CompletionRequest::prompt(prompt)
                    .with_temperature(0.0)
                    .with_label(SUMMARIZE_LABEL),
            )
            .instrument(self.span.clone())
            .await
            .map_err(|e| EpisodicError::oracle(SUMMARIZE_LABEL, e))?;

        let summary = read_summary(&response.content);
        if summary.is_empty() {
            tracing::debug!(
                parent: &self.span,
                episode = %episode.hrid(),
                "Empty answer, summary kept"
            );
            return Ok(existing_summary.to_string());
        }

        tracing::debug!(
            parent: &self.span,
            episode = %episode.hrid(),
            changed = (summary != existing_summary),
            "Summary updated"
        );
        Ok(summary)
    }

    /// Update several episodes concurrently; each result is independent
    pub async fn update_many(
        &self,
        episodes: Vec<(EpisodeId, String)>,
        recent_history: &[ChatMessage],
        input: &str,
        output: &str,
    ) -> Vec<(EpisodeId, EpisodicResult<String>)> {
        let jobs = episodes.into_iter().map(|(id, existing)| async move {
            let result = self
                .update(&id, &existing, recent_history, input, output)
                .await;
            (id, result)
        });
        join_all(jobs).await
    }
}

/// Summary text of an answer: plain text, or the `summary` field of a JSON object
fn read_summary(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.contains('{') {
        if let Some(summary) = extract_json_object(trimmed)
            .as_ref()
            .and_then(|v| v.get("summary"))
            .and_then(|s| s.as_str())
        {
            return summary.trim().to_string();
        }
    }
    trimmed.to_string()
}
