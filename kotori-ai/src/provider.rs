use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::models::ProviderConfig;
use crate::traits::{ChatMessage, ModelProvider};

/// OpenAI provider implementation
pub struct OpenAIProvider {
    config: ProviderConfig,
    client: Client,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with the given configuration
    pub fn new(config: ProviderConfig) -> Self {
        let client = Client::new();
        Self { config, client }
    }
}

#[async_trait]
impl ModelProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> anyhow::Result<String> {
        let api_base = self
            .config
            .api_base
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        let formatted: Vec<serde_json::Value> = messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role,
                    "content": msg.content,
                })
            })
            .collect();

        let response = self
            .client
            .post(format!("{}/chat/completions", api_base))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&json!({
                "model": self.config.default_model,
                "messages": formatted,
                "max_tokens": 1000,
                "temperature": 0.7,
            }))
            .send()
            .await?;

        let status = response.status();
        let data = response.json::<serde_json::Value>().await?;

        if !status.is_success() {
            let detail = data["error"]["message"].as_str().unwrap_or("unknown error");
            return Err(anyhow::anyhow!("OpenAI request failed ({status}): {detail}"));
        }

        let text = data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid response format"))?
            .to_string();

        Ok(text)
    }
}

/// Gemini provider implementation
pub struct GeminiProvider {
    config: ProviderConfig,
    client: Client,
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> Self {
        let client = Client::new();
        Self { config, client }
    }
}

#[async_trait]
impl ModelProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> anyhow::Result<String> {
        let api_base = self
            .config
            .api_base
            .clone()
            .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string());

        // Gemini has no "system" role inside contents; system turns go into
        // systemInstruction and assistant turns map to the "model" role.
        let system_text: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .collect();

        let contents: Vec<serde_json::Value> = messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|msg| {
                let role = if msg.role == "assistant" { "model" } else { "user" };
                json!({
                    "role": role,
                    "parts": [{ "text": msg.content }],
                })
            })
            .collect();

        let mut payload = json!({ "contents": contents });
        if !system_text.is_empty() {
            payload["systemInstruction"] = json!({
                "parts": [{ "text": system_text.join("\n") }],
            });
        }

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            api_base, self.config.default_model, self.config.api_key
        );

        let response = self.client.post(url).json(&payload).send().await?;

        let status = response.status();
        let data = response.json::<serde_json::Value>().await?;

        if !status.is_success() {
            let detail = data["error"]["message"].as_str().unwrap_or("unknown error");
            return Err(anyhow::anyhow!("Gemini request failed ({status}): {detail}"));
        }

        let text = data["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid response format"))?
            .to_string();

        Ok(text)
    }
}

/// Construct a provider from configuration. Unknown provider types are an error;
/// callers validate at startup, not per message.
pub fn provider_from_config(config: &ProviderConfig) -> anyhow::Result<Arc<dyn ModelProvider>> {
    match config.provider_type.to_ascii_lowercase().as_str() {
        "openai" => Ok(Arc::new(OpenAIProvider::new(config.clone()))),
        "gemini" => Ok(Arc::new(GeminiProvider::new(config.clone()))),
        other => Err(anyhow::anyhow!("Unknown provider type: {other}")),
    }
}
