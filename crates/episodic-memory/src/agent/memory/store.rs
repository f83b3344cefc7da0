//! Episode store - EpisodeId to summary, ranked by embedding similarity
//!
//! Retrieval is a flat linear scan over every stored id. Scores are cosine
//! similarities between the query embedding and each stored embedding;
//! ties keep first-insertion order.

use super::episode::EpisodeId;
use crate::error::EpisodicResult;
use async_trait::async_trait;
use episodic_llm::cosine_similarity;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::Span;

/// One retrieval hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEpisode {
    /// Cosine similarity to the query
    pub score: f32,

    /// Stored episode
    pub id: EpisodeId,

    /// Summary at retrieval time
    pub summary: String,
}

/// Storage backend for episodes
#[async_trait]
pub trait EpisodicStore: Send + Sync {
    /// Summary stored for `id`
    async fn get(&self, id: &EpisodeId) -> EpisodicResult<Option<String>>;

    /// Summary stored for `id`, or `default` when absent
    async fn get_or(&self, id: &EpisodeId, default: &str) -> EpisodicResult<String> {
        Ok(self
            .get(id)
            .await?
            .unwrap_or_else(|| default.to_string()))
    }

    /// Insert or overwrite
    async fn set(&self, id: EpisodeId, summary: String) -> EpisodicResult<()>;

    /// Whether `id` is stored
    async fn exists(&self, id: &EpisodeId) -> EpisodicResult<bool>;

    /// Remove `id`; returns false when it was not stored
    async fn delete(&self, id: &EpisodeId) -> EpisodicResult<bool>;

    /// Up to `k` stored episodes, most similar to `query` first
    async fn get_k_closest(&self, query: &EpisodeId, k: usize)
        -> EpisodicResult<Vec<ScoredEpisode>>;

    /// Remove everything
    async fn clear(&self) -> EpisodicResult<()>;

    /// Number of stored episodes
    async fn len(&self) -> EpisodicResult<usize>;

    /// Whether the store holds nothing
    async fn is_empty(&self) -> EpisodicResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Every entry in insertion order
    async fn entries(&self) -> EpisodicResult<Vec<(EpisodeId, String)>>;
}

#[derive(Debug, Clone)]
struct Slot {
    summary: String,
    seq: u64,
}

#[derive(Debug, Default)]
struct Inner {
    slots: HashMap<EpisodeId, Slot>,
    next_seq: u64,
}

/// In-process store guarded by a single lock
#[derive(Debug)]
pub struct InMemoryEpisodicStore {
    inner: RwLock<Inner>,
    span: Span,
}

impl InMemoryEpisodicStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            span: tracing::info_span!("episodic_store"),
        }
    }

    /// Emit events inside `span` instead of the default one
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

impl Default for InMemoryEpisodicStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EpisodicStore for InMemoryEpisodicStore {
    async fn get(&self, id: &EpisodeId) -> EpisodicResult<Option<String>> {
        Ok(self.inner.read().slots.get(id).map(|s| s.summary.clone()))
    }

    async fn set(&self, id: EpisodeId, summary: String) -> EpisodicResult<()> {
        let mut inner = self.inner.write();
        if let Some(slot) = inner.slots.get_mut(&id) {
            slot.summary = summary;
            return Ok(());
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        tracing::debug!(parent: &self.span, episode = %id.hrid(), seq, "Episode inserted");
        inner.slots.insert(id, Slot { summary, seq });
        Ok(())
    }

    async fn exists(&self, id: &EpisodeId) -> EpisodicResult<bool> {
        Ok(self.inner.read().slots.contains_key(id))
    }

    async fn delete(&self, id: &EpisodeId) -> EpisodicResult<bool> {
        let removed = self.inner.write().slots.remove(id).is_some();
        if removed {
            tracing::debug!(parent: &self.span, episode = %id.hrid(), "Episode deleted");
        }
        Ok(removed)
    }

    async fn get_k_closest(
        &self,
        query: &EpisodeId,
        k: usize,
    ) -> EpisodicResult<Vec<ScoredEpisode>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let inner = self.inner.read();
        let mut scored: Vec<(f32, u64, &EpisodeId, &Slot)> = Vec::with_capacity(inner.slots.len());

        for (id, slot) in &inner.slots {
            match cosine_similarity(query.embedding(), id.embedding()) {
                Ok(score) => scored.push((score, slot.seq, id, slot)),
                Err(_) => {
                    tracing::warn!(
                        parent: &self.span,
                        episode = %id.hrid(),
                        expected = query.embedding().len(),
                        actual = id.embedding().len(),
                        "Skipping episode with mismatched embedding dimensions"
                    );
                }
            }
        }

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(score, _, id, slot)| ScoredEpisode {
                score,
                id: id.clone(),
                summary: slot.summary.clone(),
            })
            .collect())
    }

    async fn clear(&self) -> EpisodicResult<()> {
        let mut inner = self.inner.write();
        let count = inner.slots.len();
        inner.slots.clear();
        tracing::info!(parent: &self.span, cleared = count, "Episode store cleared");
        Ok(())
    }

    async fn len(&self) -> EpisodicResult<usize> {
        Ok(self.inner.read().slots.len())
    }

    async fn entries(&self) -> EpisodicResult<Vec<(EpisodeId, String)>> {
        let inner = self.inner.read();
        let mut all: Vec<(&EpisodeId, &Slot)> = inner.slots.iter().collect();
        all.sort_by_key(|(_, slot)| slot.seq);
        Ok(all
            .into_iter()
            .map(|(id, slot)| (id.clone(), slot.summary.clone()))
            .collect())
    }
}

/// Cosine similarity of every unordered pair of ids.
///
/// Pairs with mismatched dimensions are left out.
pub fn pairwise_similarities(ids: &[EpisodeId]) -> Vec<(EpisodeId, EpisodeId, f32)> {
    let mut pairs = Vec::new();
    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i + 1..] {
            if let Ok(score) = cosine_similarity(a.embedding(), b.embedding()) {
                pairs.push((a.clone(), b.clone(), score));
            }
        }
    }
    pairs
}

/// Human-readable dump of a store
pub async fn describe_store(store: &dyn EpisodicStore) -> EpisodicResult<String> {
    let mut out = String::from("Whole Memory:\n");
    for (id, summary) in store.entries().await? {
        out.push_str(&format!("{id}\n\t{summary}\n"));
    }
    Ok(out)
}
