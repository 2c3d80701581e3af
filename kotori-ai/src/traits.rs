use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One turn of a chat transcript sent to a model provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "system", "user" or "assistant"
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

/// A chat-completion backend (OpenAI, Gemini, ...).
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Short provider name, e.g. "openai"
    fn name(&self) -> &str;

    /// Run a chat completion over the given transcript and return the reply text.
    async fn chat(&self, messages: Vec<ChatMessage>) -> anyhow::Result<String>;
}
