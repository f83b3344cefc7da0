//! Episode identity - keyword fingerprint plus its embedding
//!
//! An episode is identified by the canonical form of the keywords the
//! language oracle picked for it (the HRID, "human readable id") and the
//! embedding of that canonical string. Two ids are the same episode only
//! when both halves are identical.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of an episode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeId {
    /// Sorted, comma-joined keyword list
    hrid: String,

    /// Embedding of `hrid`
    embedding: Vec<f32>,
}

impl EpisodeId {
    /// Build an id from an already canonical hrid and its embedding
    pub fn new(hrid: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            hrid: hrid.into(),
            embedding,
        }
    }

    /// Human readable id
    pub fn hrid(&self) -> &str {
        &self.hrid
    }

    /// Embedding vector
    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    /// Keywords making up the hrid, in canonical order
    pub fn keywords(&self) -> Vec<&str> {
        if self.hrid.is_empty() {
            Vec::new()
        } else {
            self.hrid.split(',').collect()
        }
    }

    /// True for the id produced when no keywords could be extracted
    pub fn is_unidentified(&self) -> bool {
        self.hrid.is_empty()
    }
}

impl PartialEq for EpisodeId {
    fn eq(&self, other: &Self) -> bool {
        self.hrid == other.hrid
            && self.embedding.len() == other.embedding.len()
            && self
                .embedding
                .iter()
                .zip(&other.embedding)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Eq for EpisodeId {}

impl Hash for EpisodeId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hrid.hash(state);
        self.embedding.len().hash(state);
        for value in &self.embedding {
            value.to_bits().hash(state);
        }
    }
}

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head: Vec<String> = self
            .embedding
            .iter()
            .take(5)
            .map(|v| format!("{v:.4}"))
            .collect();
        write!(f, "Episode HRID {}: [{}]...", self.hrid, head.join(", "))
    }
}

/// Canonical hrid for a raw keyword answer.
///
/// Only the first non-empty line of the answer is considered. When that line
/// is `sentinel` (e.g. `NONE`) or there is no such line, the hrid is empty.
/// Otherwise the line is split on commas, each token trimmed, empty tokens
/// dropped, and the rest sorted by codepoint and re-joined with `,`.
/// Duplicates are kept.
pub fn canonical_hrid(raw: &str, sentinel: &str) -> String {
    let mut keywords = parse_keywords(raw, sentinel);
    keywords.sort_unstable();
    keywords.join(",")
}

/// Keywords of a raw answer, in the order the oracle gave them
pub fn parse_keywords<'a>(raw: &'a str, sentinel: &str) -> Vec<&'a str> {
    let Some(line) = raw.lines().map(str::trim).find(|l| !l.is_empty()) else {
        return Vec::new();
    };
    if line == sentinel {
        return Vec::new();
    }

    line.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .collect()
}
