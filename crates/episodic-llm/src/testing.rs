//! Deterministic oracle doubles for tests and offline demos

use crate::client::{CompletionRequest, CompletionResponse, LanguageOracle};
use crate::embedding::{Embedding, EmbeddingOracle, HashEmbeddingProvider};
use crate::error::{LlmError, LlmResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

type Responder = dyn Fn(&CompletionRequest) -> LlmResult<String> + Send + Sync;

/// Language oracle answering through a closure, recording every request
pub struct ScriptedOracle {
    responder: Box<Responder>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedOracle {
    /// Answer every request with `responder`
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> LlmResult<String> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with the same text
    pub fn constant(reply: impl Into<String>) -> Self {
        let reply = reply.into();
        Self::new(move |_| Ok(reply.clone()))
    }

    /// Fail every request as if the oracle were down
    pub fn unavailable() -> Self {
        Self::new(|_| Err(LlmError::Unavailable("scripted outage".into())))
    }

    /// Requests received so far
    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().clone()
    }

    /// Requests received so far carrying `label`
    pub fn calls_labelled(&self, label: &str) -> Vec<CompletionRequest> {
        self.calls
            .lock()
            .iter()
            .filter(|r| r.label.as_deref() == Some(label))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LanguageOracle for ScriptedOracle {
    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        self.calls.lock().push(request.clone());
        let content = (self.responder)(&request)?;
        Ok(CompletionResponse {
            content,
            model: "scripted".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Embedding oracle with pinned vectors for chosen texts
///
/// Texts without a pinned vector fall back to [`HashEmbeddingProvider`] of the
/// same dimensionality.
pub struct FixedEmbeddings {
    dimensions: usize,
    pinned: Mutex<HashMap<String, Vec<f32>>>,
    fallback: HashEmbeddingProvider,
}

impl FixedEmbeddings {
    /// Create an oracle producing `dimensions`-long vectors
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            pinned: Mutex::new(HashMap::new()),
            fallback: HashEmbeddingProvider::new(dimensions),
        }
    }

    /// Pin the vector returned for `text`
    pub fn with(self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.pin(text, vector);
        self
    }

    /// Pin the vector returned for `text`
    pub fn pin(&self, text: impl Into<String>, vector: Vec<f32>) {
        assert_eq!(vector.len(), self.dimensions, "pinned vector has wrong length");
        self.pinned.lock().insert(text.into(), vector);
    }
}

#[async_trait]
impl EmbeddingOracle for FixedEmbeddings {
    async fn embed(&self, text: &str) -> LlmResult<Embedding> {
        let pinned = self.pinned.lock().get(text).cloned();
        match pinned {
            Some(vector) => Ok(Embedding::new(vector, "fixed")),
            None => self.fallback.embed(text).await,
        }
    }

    fn model_name(&self) -> &str {
        "fixed"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
