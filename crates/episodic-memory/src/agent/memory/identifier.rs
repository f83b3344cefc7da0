//! Episode identification - latest turn to EpisodeId

use super::config::EpisodicMemoryConfig;
use super::conversation::render_buffer;
use super::episode::{canonical_hrid, parse_keywords, EpisodeId};
use crate::error::{EpisodicError, EpisodicResult};
use crate::prompts::{identification_prompt, IDENTIFY_LABEL};
use episodic_llm::{ChatMessage, CompletionRequest, EmbeddingOracle, LanguageOracle};
use std::sync::Arc;
use tracing::{Instrument, Span};

/// Asks the language oracle which episode a turn belongs to
pub struct EpisodeIdentifier {
    llm: Arc<dyn LanguageOracle>,
    embedder: Arc<dyn EmbeddingOracle>,
    config: EpisodicMemoryConfig,
    span: Span,
}

impl EpisodeIdentifier {
    /// Create an identifier
    pub fn new(
        llm: Arc<dyn LanguageOracle>,
        embedder: Arc<dyn EmbeddingOracle>,
        config: EpisodicMemoryConfig,
    ) -> Self {
        Self {
            llm,
            embedder,
            config,
            span: tracing::info_span!("episode_identifier"),
        }
    }

    /// Emit events inside `span` instead of the default one
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Identify the episode of `input` given the trailing history.
    ///
    /// An unusable keyword answer yields the unidentified id (empty hrid);
    /// only oracle failures are errors.
    pub async fn identify(
        &self,
        recent_history: &[ChatMessage],
        input: &str,
    ) -> EpisodicResult<EpisodeId> {
        let span = self.span.clone();
        async move {
            let buffer = render_buffer(
                recent_history,
                &self.config.human_prefix,
                &self.config.ai_prefix,
            );
            let prompt = identification_prompt(
                &buffer,
                input,
                self.config.keyword_count,
                &self.config.human_prefix,
                &self.config.unidentified_sentinel,
            );

            let response = self
                .llm
                .complete(
                    CompletionRequest::prompt(prompt)
                        .with_temperature(0.0)
                        .with_label(IDENTIFY_LABEL),
                )
                .await
                .map_err(|e| EpisodicError::oracle(IDENTIFY_LABEL, e))?;

            let sentinel = &self.config.unidentified_sentinel;
            let found = parse_keywords(&response.content, sentinel).len();
            if found != self.config.keyword_count && found > 0 {
                tracing::warn!(
                    expected = self.config.keyword_count,
                    found,
                    "Keyword count differs from the requested one"
                );
            }

            let hrid = canonical_hrid(&response.content, sentinel);
            if hrid.is_empty() {
                tracing::info!(raw = %response.content.trim(), "Turn left unidentified");
            }

            let embedding = self
                .embedder
                .embed(&hrid)
                .await
                .map_err(|e| EpisodicError::oracle("embed", e))?;

            tracing::debug!(
                episode = %hrid,
                dimensions = embedding.dimensions,
                "Episode identified"
            );
            Ok(EpisodeId::new(hrid, embedding.vector))
        }
        .instrument(span)
        .await
    }
}
