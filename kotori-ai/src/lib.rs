pub mod client;
pub mod models;
pub mod provider;
pub mod traits;

// Re-export public APIs
pub use client::AiClient;
pub use models::ProviderConfig;
pub use provider::{GeminiProvider, OpenAIProvider, provider_from_config};
pub use traits::{ChatMessage, ModelProvider};
