//! LLM integration for Arogya Assist.
//!
//! A single backend is supported: Google's Gemini `generateContent` endpoint,
//! called directly over `reqwest`. The `LlmProvider` trait is the seam the
//! advisory client and the tests plug into.

pub mod gemini;
pub mod structured;

pub use gemini::GeminiProvider;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AssistConfig;
use crate::error::LlmError;

/// One prompt in, one raw text reply out.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Model identifier used for logging.
    fn model_name(&self) -> &str;

    /// Backend name carried by every error this provider's replies produce.
    fn provider_name(&self) -> &str;

    /// Issue a single request for `prompt` and return the first text candidate.
    ///
    /// One attempt only: no retry, no backoff.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: secrecy::SecretString,
    pub model: String,
    pub api_base: String,
}

impl From<&AssistConfig> for LlmConfig {
    fn from(config: &AssistConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            api_base: config.api_base.clone(),
        }
    }
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let provider = GeminiProvider::new(config)?;
    tracing::info!("Using Gemini (model: {})", config.model);
    Ok(Arc::new(provider))
}
