//! LLM provider abstraction.
//!
//! The extraction client and the categorizer only see [`TextProvider`], so
//! Gemini, a scripted mock, or any other backend can be injected at startup.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

pub use gemini::{GeminiConfig, GeminiTextProvider};
pub use mock::MockTextProvider;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("model provider is not configured: {0}")]
    NotConfigured(String),

    #[error("model provider error: {0}")]
    ApiError(String),

    #[error("model provider rate limit reached")]
    RateLimited,

    #[error("model refused the statement content")]
    ContentFiltered,

    #[error("model provider unreachable: {0}")]
    NetworkError(String),

    #[error("model returned no candidates")]
    EmptyResponse,
}

impl ProviderError {
    /// Whether the same request could succeed later. Non-transient failures
    /// point at configuration or at the statement itself.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::NetworkError(_) | Self::ApiError(_) | Self::EmptyResponse
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Complete,
    /// Output was cut at `max_tokens`; long statements may lose trailing rows.
    Length,
}

#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub text: String,
    pub output_tokens: i32,
    pub finish_reason: FinishReason,
}

#[derive(Debug, Clone, Default)]
pub struct GenerationParams {
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
    /// Sent apart from the prompt so statement text cannot override it.
    pub system_instruction: Option<String>,
}

#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Model identifier, used in logs.
    fn model(&self) -> &str;

    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError>;

    async fn health_check(&self) -> Result<(), ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_and_refusals_are_not_transient() {
        assert!(ProviderError::RateLimited.is_transient());
        assert!(ProviderError::NetworkError("reset".into()).is_transient());
        assert!(!ProviderError::NotConfigured("no key".into()).is_transient());
        assert!(!ProviderError::ContentFiltered.is_transient());
    }
}
