use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::traits::{ChatMessage, ModelProvider};

/// Thin wrapper around a [`ModelProvider`] that bounds every request with a
/// timeout. The caller never blocks indefinitely on a slow backend.
#[derive(Clone)]
pub struct AiClient {
    provider: Arc<dyn ModelProvider>,
    timeout: Duration,
}

impl AiClient {
    pub fn new(provider: Arc<dyn ModelProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn chat(&self, messages: Vec<ChatMessage>) -> anyhow::Result<String> {
        match tokio::time::timeout(self.timeout, self.provider.chat(messages)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "AI request to '{}' timed out after {:?}",
                    self.provider.name(),
                    self.timeout
                );
                Err(anyhow::anyhow!(
                    "AI request timed out after {:?}",
                    self.timeout
                ))
            }
        }
    }
}
