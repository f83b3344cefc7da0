//! Episode merging - folds near-duplicate episodes into one
//!
//! When several episodes retrieved for a turn score above the merge
//! threshold they describe the same topic. Their summaries are combined by
//! the language oracle into one episode with fresh keywords. The merged
//! episode is written before any source is deleted, so a failure half-way
//! never loses knowledge.

use super::config::EpisodicMemoryConfig;
use super::episode::{canonical_hrid, EpisodeId};
use super::store::{EpisodicStore, ScoredEpisode};
use crate::error::{EpisodicError, EpisodicResult};
use crate::prompts::{merge_prompt, MERGE_LABEL};
use episodic_llm::{CompletionRequest, EmbeddingOracle, LanguageOracle};
use serde_json::Value;
use std::sync::Arc;
use tracing::{Instrument, Span};

/// Result of a merge attempt
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// Candidates were folded into `merged_into`
    Merged {
        /// The new episode
        merged_into: EpisodeId,
        /// Source episodes removed from the store
        retired: Vec<EpisodeId>,
    },

    /// Not enough candidates above the threshold
    Skipped {
        /// Number of candidates found
        candidates: usize,
    },
}

impl MergeOutcome {
    /// Whether a merge happened
    pub fn is_merged(&self) -> bool {
        matches!(self, MergeOutcome::Merged { .. })
    }
}

/// Merges high-similarity episodes of one turn
pub struct EpisodeMerger {
    llm: Arc<dyn LanguageOracle>,
    embedder: Arc<dyn EmbeddingOracle>,
    store: Arc<dyn EpisodicStore>,
    config: EpisodicMemoryConfig,
    span: Span,
}

impl EpisodeMerger {
    /// Create a merger writing into `store`
    pub fn new(
        llm: Arc<dyn LanguageOracle>,
        embedder: Arc<dyn EmbeddingOracle>,
        store: Arc<dyn EpisodicStore>,
        config: EpisodicMemoryConfig,
    ) -> Self {
        Self {
            llm,
            embedder,
            store,
            config,
            span: tracing::info_span!("episode_merger"),
        }
    }

    /// Emit events inside `span` instead of the default one
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Merge the episodes of `relevant` scoring above the threshold
    pub async fn merge(&self, relevant: &[ScoredEpisode]) -> EpisodicResult<MergeOutcome> {
        let span = self.span.clone();
        async move {
            let candidates = self.candidates(relevant).await?;
            if candidates.len() < 2 {
                tracing::debug!(candidates = candidates.len(), "Merge skipped");
                return Ok(MergeOutcome::Skipped {
                    candidates: candidates.len(),
                });
            }

            let combined = candidates
                .iter()
                .map(|(_, summary)| summary.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");

            let response = self
                .llm
                .complete(
                    CompletionRequest::prompt(merge_prompt(&combined, self.config.keyword_count))
                        .with_temperature(0.0)
                        .with_label(MERGE_LABEL),
                )
                .await
                .map_err(|e| EpisodicError::oracle(MERGE_LABEL, e))?;

            let (summary, categories) = parse_merge_reply(&response.content)?;
            let hrid = canonical_hrid(&categories, &self.config.unidentified_sentinel);
            if hrid.is_empty() {
                return Err(EpisodicError::malformed_output(
                    MERGE_LABEL,
                    "categories are empty",
                ));
            }

            let embedding = self
                .embedder
                .embed(&hrid)
                .await
                .map_err(|e| EpisodicError::oracle("embed", e))?;
            let merged_into = EpisodeId::new(hrid, embedding.vector);

            self.store.set(merged_into.clone(), summary).await?;

            let mut retired = Vec::with_capacity(candidates.len());
            for (id, _) in candidates {
                if id == merged_into {
                    continue;
                }
                if self.store.delete(&id).await? {
                    retired.push(id);
                }
            }

            tracing::info!(
                merged_into = %merged_into.hrid(),
                retired = retired.len(),
                "Episodes merged"
            );
            Ok(MergeOutcome::Merged {
                merged_into,
                retired,
            })
        }
        .instrument(span)
        .await
    }

    /// Entries above the threshold, de-duplicated, still stored, with their current summary
    async fn candidates(
        &self,
        relevant: &[ScoredEpisode],
    ) -> EpisodicResult<Vec<(EpisodeId, String)>> {
        let mut out: Vec<(EpisodeId, String)> = Vec::new();
        for hit in relevant {
            if hit.score <= self.config.merge_threshold {
                continue;
            }
            if out.iter().any(|(id, _)| id == &hit.id) {
                continue;
            }
            if let Some(summary) = self.store.get(&hit.id).await? {
                out.push((hit.id.clone(), summary));
            }
        }
        Ok(out)
    }
}

/// `(summary, categories)` of a merge answer
fn parse_merge_reply(content: &str) -> EpisodicResult<(String, String)> {
    let object = extract_json_object(content).ok_or_else(|| {
        EpisodicError::malformed_output(MERGE_LABEL, "no JSON object in the answer")
    })?;

    let summary = object
        .get("summary")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EpisodicError::malformed_output(MERGE_LABEL, "missing summary"))?
        .to_string();

    let categories = match object.get("categories") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(","),
        _ => {
            return Err(EpisodicError::malformed_output(
                MERGE_LABEL,
                "missing categories",
            ))
        }
    };

    Ok((summary, categories))
}

/// First balanced JSON object found in `text`, ignoring surrounding prose
pub(crate) fn extract_json_object(text: &str) -> Option<Value> {
    let mut from = 0;
    while let Some(offset) = text[from..].find('{') {
        let start = from + offset;
        if let Some(end) = balanced_end(&text[start..]) {
            let candidate = &text[start..start + end];
            if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(candidate) {
                return Some(value);
            }
        }
        from = start + 1;
    }
    None
}

/// Length of the brace-balanced prefix of `s`, which starts with `{`
fn balanced_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}
