//! Mock provider implementation for testing.

use super::{CompletionProvider, GenerationParams, ProviderError, ProviderResponse};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Mock completion provider that echoes the prompt and records calls.
pub struct MockCompletionProvider {
    enabled: bool,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockCompletionProvider {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// Number of `generate` calls, including rejected ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().await.clone()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    fn model(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.enabled {
            return Err(ProviderError::NotConfigured(
                "Mock completion provider not enabled".to_string(),
            ));
        }

        *self.last_prompt.lock().await = Some(prompt.to_string());

        Ok(ProviderResponse {
            text: format!("Mock analysis for: {}", prompt),
            input_tokens: Some(prompt.len() as u32 / 4),
            output_tokens: Some(10),
        })
    }
}
