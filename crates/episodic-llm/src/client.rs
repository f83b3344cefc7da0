//! Language oracle interface and chat message types

use crate::error::LlmResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Role of a chat message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions for the model
    System,
    /// The human side of the conversation
    User,
    /// The model side of the conversation
    Assistant,
}

impl MessageRole {
    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote the message
    pub role: MessageRole,

    /// Text content
    pub content: String,
}

impl ChatMessage {
    /// Create a message with an explicit role
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// A completion request sent to a [`LanguageOracle`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Conversation to complete
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Upper bound on generated tokens
    pub max_tokens: Option<u32>,

    /// Name of the operation issuing the request; used for tracing only
    #[serde(skip)]
    pub label: Option<String>,
}

impl CompletionRequest {
    /// Single user-message prompt
    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::user(prompt)],
            ..Default::default()
        }
    }

    /// Request from a full message list
    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Tag the request with the operation that issued it
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label or a placeholder, for log fields
    pub fn label_or_default(&self) -> &str {
        self.label.as_deref().unwrap_or("completion")
    }

    /// Content of the last message, usually the rendered prompt
    pub fn last_content(&self) -> &str {
        self.messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

/// Text returned by a [`LanguageOracle`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated text
    pub content: String,

    /// Model that produced it
    pub model: String,
}

/// Black-box text completion
#[async_trait]
pub trait LanguageOracle: Send + Sync {
    /// Complete the request
    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse>;

    /// Model identifier
    fn model_name(&self) -> &str;
}

#[async_trait]
impl<T: LanguageOracle + ?Sized> LanguageOracle for Arc<T> {
    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        (**self).complete(request).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

#[async_trait]
impl<T: LanguageOracle + ?Sized> LanguageOracle for Box<T> {
    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        (**self).complete(request).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}
