use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for an AI provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// The type of provider ("openai" or "gemini")
    pub provider_type: String,

    /// Base URL for API requests; provider default when unset
    pub api_base: Option<String>,

    /// API key for authentication
    pub api_key: String,

    /// Default model to use with this provider
    pub default_model: String,

    /// Additional provider-specific configuration options
    pub options: HashMap<String, String>,
}

impl ProviderConfig {
    pub fn new(provider_type: impl Into<String>, api_key: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self {
            provider_type: provider_type.into(),
            api_base: None,
            api_key: api_key.into(),
            default_model: default_model.into(),
            options: HashMap::new(),
        }
    }
}
