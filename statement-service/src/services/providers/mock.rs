//! Scripted provider for tests and local runs without an API key.

use super::{FinishReason, GenerationParams, ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Returns queued responses in order, then the fallback (if any).
/// An `Err` entry is surfaced as [`ProviderError::ApiError`].
pub struct MockTextProvider {
    model: String,
    script: Mutex<VecDeque<Result<(String, FinishReason), String>>>,
    fallback: Option<String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    healthy: AtomicBool,
}

impl MockTextProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            script: Mutex::new(VecDeque::new()),
            fallback: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            healthy: AtomicBool::new(true),
        }
    }

    /// Always answer with `text` once the script is exhausted.
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = Some(text.into());
        self
    }

    pub fn push_response(&self, text: impl Into<String>) {
        self.push(Ok((text.into(), FinishReason::Complete)));
    }

    /// Queue a response that stopped at the token limit.
    pub fn push_truncated(&self, text: impl Into<String>) {
        self.push(Ok((text.into(), FinishReason::Length)));
    }

    pub fn push_error(&self, message: impl Into<String>) {
        self.push(Err(message.into()));
    }

    fn push(&self, entry: Result<(String, FinishReason), String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(entry);
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        let (text, finish_reason) = match next {
            Some(Ok(entry)) => entry,
            Some(Err(message)) => return Err(ProviderError::ApiError(message)),
            None => {
                let text = self.fallback.clone().ok_or_else(|| {
                    ProviderError::NotConfigured(format!("No scripted response for {}", self.model))
                })?;
                (text, FinishReason::Complete)
            }
        };

        Ok(ProviderResponse {
            output_tokens: text.len() as i32 / 4,
            text,
            finish_reason,
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ProviderError::NetworkError(format!("{} is unreachable", self.model)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn script_then_fallback() {
        let provider = MockTextProvider::new("mock").with_fallback("Other");
        provider.push_response("Groceries");
        provider.push_error("boom");

        let params = GenerationParams::default();
        assert_eq!(provider.generate("a", &params).await.unwrap().text, "Groceries");
        assert!(provider.generate("b", &params).await.is_err());
        assert_eq!(provider.generate("c", &params).await.unwrap().text, "Other");
        assert_eq!(provider.call_count(), 3);
        assert_eq!(provider.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn truncated_entries_report_the_length_finish() {
        let provider = MockTextProvider::new("mock");
        provider.push_truncated("2025-01-15,Coffee,-4");

        let response = provider.generate("a", &GenerationParams::default()).await.unwrap();
        assert_eq!(response.finish_reason, FinishReason::Length);

        provider.set_healthy(false);
        assert!(provider.health_check().await.is_err());
    }

    #[tokio::test]
    async fn without_fallback_an_empty_script_errors() {
        let provider = MockTextProvider::new("mock");
        let result = provider.generate("x", &GenerationParams::default()).await;
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }
}
