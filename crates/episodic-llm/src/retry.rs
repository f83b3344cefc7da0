//! Timeout and retry wrapper for oracles
//!
//! Every call is bounded by `timeout_ms`. Retryable failures (timeouts,
//! transport errors, 429 and 5xx) are retried with exponential backoff up to
//! `max_retries` times; anything else is surfaced immediately.

use crate::client::{CompletionRequest, CompletionResponse, LanguageOracle};
use crate::embedding::{Embedding, EmbeddingOracle};
use crate::error::{LlmError, LlmResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry and timeout policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry
    pub initial_delay_ms: u64,

    /// Upper bound for a single delay
    pub max_delay_ms: u64,

    /// Growth factor between consecutive delays
    pub backoff_multiplier: f64,

    /// Per-attempt timeout
    pub timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            timeout_ms: 30_000,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped = if base.is_finite() {
            (base as u64).min(self.max_delay_ms)
        } else {
            self.max_delay_ms
        };
        Duration::from_millis(capped)
    }
}

/// Wraps an oracle with a per-call timeout and bounded retries
pub struct ResilientOracle<T> {
    inner: T,
    config: RetryConfig,
}

impl<T> ResilientOracle<T> {
    /// Wrap `inner` with the given policy
    pub fn new(inner: T, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Policy in use
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Wrapped oracle
    pub fn inner(&self) -> &T {
        &self.inner
    }

    async fn with_retries<F, Fut, R>(&self, operation: &str, mut call: F) -> LlmResult<R>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = LlmResult<R>> + Send,
        R: Send,
    {
        let timeout = Duration::from_millis(self.config.timeout_ms);
        let mut attempt = 0;

        loop {
            let result = match tokio::time::timeout(timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(LlmError::Timeout {
                    operation: operation.to_string(),
                    timeout_ms: self.config.timeout_ms,
                }),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.delay_for(attempt);
                    attempt += 1;

                    warn!(
                        operation,
                        attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying oracle call"
                    );

                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl<T: LanguageOracle> LanguageOracle for ResilientOracle<T> {
    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        let operation = request.label_or_default().to_string();
        self.with_retries(&operation, || self.inner.complete(request.clone()))
            .await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[async_trait]
impl<T: EmbeddingOracle> EmbeddingOracle for ResilientOracle<T> {
    async fn embed(&self, text: &str) -> LlmResult<Embedding> {
        self.with_retries("embed", || self.inner.embed(text)).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}
