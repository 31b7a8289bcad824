//! Provider trait: the abstraction over the upstream chat-completion API.
//!
//! A Provider takes the assembled conversation (system prompt, prior turns,
//! current user turn) and returns the reply text. Generation parameters are
//! normalized before every call so that configured values can never produce
//! a request the upstream is known to reject.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;
use crate::message::Message;

/// Replacement for a non-positive `max_tokens`.
pub const DEFAULT_MAX_TOKENS: i64 = 4096;

/// Upper bound for `max_tokens`; larger requests are known to trigger upstream 502s.
pub const MAX_TOKENS_CEILING: i64 = 16384;

/// Replacement for a temperature outside `[0.0, 2.0]`.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Token and sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Maximum tokens to generate
    pub max_tokens: i64,

    /// Temperature (0.0 = deterministic, 2.0 = most random)
    pub temperature: f64,
}

impl GenerationParams {
    pub fn new(max_tokens: i64, temperature: f64) -> Self {
        Self {
            max_tokens,
            temperature,
        }
    }

    /// Clamp into the ranges the upstream accepts.
    ///
    /// `max_tokens` ends up in `(0, 16384]`: non-positive becomes 4096,
    /// anything larger is clamped down. A temperature outside `[0.0, 2.0]`
    /// (or NaN) becomes 0.7.
    pub fn normalized(self) -> Self {
        let max_tokens = if self.max_tokens <= 0 {
            DEFAULT_MAX_TOKENS
        } else {
            self.max_tokens.min(MAX_TOKENS_CEILING)
        };
        let temperature = if (0.0..=2.0).contains(&self.temperature) {
            self.temperature
        } else {
            DEFAULT_TEMPERATURE
        };
        Self {
            max_tokens,
            temperature,
        }
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE)
    }
}

/// A single chat-completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "qwen3:8b", "gpt-4o")
    pub model: String,

    /// `[system] + prior turns + [current user turn]`, in that order
    pub messages: Vec<Message>,

    /// Raw generation parameters; providers normalize them before sending
    pub params: GenerationParams,
}

/// The reply extracted from a successful upstream response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The assistant's reply text
    pub text: String,
}

/// The core Provider trait.
///
/// The runner calls `complete()` without knowing which backend answers.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "ollama", "openrouter").
    fn name(&self) -> &str;

    /// Send a request and get the complete reply.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;
}
