//! Raw conversation transcript

use episodic_llm::{ChatMessage, MessageRole};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordered transcript of one session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatHistory {
    messages: Vec<ChatMessage>,
}

impl ChatHistory {
    /// Empty transcript
    pub fn new() -> Self {
        Self::default()
    }

    /// Transcript made of `messages`
    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    /// Append one message
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Append a user message followed by the assistant reply
    pub fn push_exchange(&mut self, input: impl Into<String>, output: impl Into<String>) {
        self.messages.push(ChatMessage::user(input));
        self.messages.push(ChatMessage::assistant(output));
    }

    /// Every message, oldest first
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The last `n` messages, oldest first
    pub fn trailing(&self, n: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing was said yet
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// Render messages as `Prefix: content` lines
pub fn render_buffer(messages: &[ChatMessage], human_prefix: &str, ai_prefix: &str) -> String {
    messages
        .iter()
        .map(|m| {
            let prefix = match m.role {
                MessageRole::User => human_prefix,
                MessageRole::Assistant => ai_prefix,
                MessageRole::System => "System",
            };
            format!("{}: {}", prefix, m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fresh session identifier
pub fn generate_session_id() -> String {
    Uuid::new_v4().to_string()
}
