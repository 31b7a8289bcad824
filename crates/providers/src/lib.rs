//! LLM provider implementations for neo.
//!
//! The agent talks to one upstream: any endpoint that speaks the
//! OpenAI-compatible `/chat/completions` protocol (Ollama, OpenRouter,
//! vLLM, OpenAI itself).

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use neo_core::error::ProviderError;
use neo_core::provider::Provider;
use std::sync::Arc;

/// Build the configured provider.
pub fn build_from_config(
    config: &neo_config::AppConfig,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let provider = OpenAiCompatProvider::from_config(&config.model)?;
    tracing::debug!(
        provider = %config.model.provider,
        base_url = %config.model.base_url,
        "Provider ready"
    );
    Ok(Arc::new(provider))
}
