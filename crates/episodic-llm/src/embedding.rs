//! Vector embeddings and the embedding oracle interface
//!
//! Provides the dense vector type shared by every embedding backend, cosine
//! similarity, and a deterministic hash-based provider for offline use.

use crate::error::{LlmError, LlmResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A vector embedding (dense float vector)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    /// The vector components
    pub vector: Vec<f32>,

    /// Dimensionality of the embedding
    pub dimensions: usize,

    /// Model used to generate the embedding
    pub model: String,
}

impl Embedding {
    /// Create a new embedding
    pub fn new(vector: Vec<f32>, model: impl Into<String>) -> Self {
        let dimensions = vector.len();
        Self {
            vector,
            dimensions,
            model: model.into(),
        }
    }

    /// Calculate cosine similarity with another embedding
    pub fn cosine_similarity(&self, other: &Embedding) -> LlmResult<f32> {
        cosine_similarity(&self.vector, &other.vector)
    }
}

/// Cosine similarity `dot(a, b) / (|a| * |b|)`, in `[-1, 1]`.
///
/// Zero-norm inputs score `0.0`. Vectors of different length are an error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> LlmResult<f32> {
    if a.len() != b.len() {
        return Err(LlmError::InvalidResponse(format!(
            "embedding dimensions must match: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok((dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0))
}

/// Black-box text embedding
#[async_trait]
pub trait EmbeddingOracle: Send + Sync {
    /// Generate an embedding for the given text
    async fn embed(&self, text: &str) -> LlmResult<Embedding>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the embedding dimensions
    fn dimensions(&self) -> usize;
}

#[async_trait]
impl<T: EmbeddingOracle + ?Sized> EmbeddingOracle for Arc<T> {
    async fn embed(&self, text: &str) -> LlmResult<Embedding> {
        (**self).embed(text).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }
}

/// Embedding provider that uses hash-based vectors (for tests and offline demos)
pub struct HashEmbeddingProvider {
    dimensions: usize,
}

impl HashEmbeddingProvider {
    /// Create a new hash-based embedding provider
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Deterministic pseudo-embedding; NOT semantically meaningful.
    ///
    /// Components come from SHA-256, so vectors stay identical across
    /// toolchains and persisted episode ids keep matching.
    fn hash_embed(&self, text: &str) -> Vec<f32> {
        use sha2::{Digest, Sha256};

        (0..self.dimensions)
            .map(|i| {
                let mut hasher = Sha256::new();
                hasher.update(text.as_bytes());
                hasher.update((i as u64).to_le_bytes());
                let digest = hasher.finalize();

                let mut word = [0u8; 8];
                word.copy_from_slice(&digest[..8]);
                // Normalize to [-1, 1]
                ((u64::from_le_bytes(word) as f32) / (u64::MAX as f32)) * 2.0 - 1.0
            })
            .collect()
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl EmbeddingOracle for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> LlmResult<Embedding> {
        Ok(Embedding::new(self.hash_embed(text), "hash"))
    }

    fn model_name(&self) -> &str {
        "hash-embedding"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
