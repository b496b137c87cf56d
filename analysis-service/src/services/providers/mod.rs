//! Completion provider abstraction.
//!
//! The remote contract is not pinned down, so the handler only depends on
//! [`CompletionProvider`]; `chat` speaks the OpenAI-compatible chat
//! completions dialect and `mock` stands in for it in tests.

pub mod chat;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

pub const DEFAULT_MAX_TOKENS: u32 = 1500;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Credential or other required setting is missing. Nothing was sent.
    #[error("{0}")]
    NotConfigured(String),

    /// The remote answered with a non-success status.
    #[error("API Error: {status} - {body}")]
    Api { status: u16, body: String },

    /// Timeout or transport failure before any response arrived.
    #[error("API request failed: No response from server")]
    NoResponse,

    #[error("Request setup error: {0}")]
    RequestSetup(String),

    /// A success status whose body lacks the generated text.
    #[error("Unexpected API response: {0}")]
    UnexpectedResponse(String),
}

impl ProviderError {
    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::Api { .. } => "api_error",
            ProviderError::NoResponse => "no_response",
            ProviderError::RequestSetup(_) => "request_setup",
            ProviderError::UnexpectedResponse(_) => "unexpected_response",
        }
    }
}

/// Sampling parameters sent with every completion request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Result of a provider response.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// Text of the first completion choice.
    pub text: String,

    /// Prompt tokens, when the remote reports usage.
    pub input_tokens: Option<u32>,

    /// Completion tokens, when the remote reports usage.
    pub output_tokens: Option<u32>,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Model identifier sent to the remote, used for logging and metrics.
    fn model(&self) -> &str;

    /// Send a single user-role prompt and return the first completion.
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_echoes_status_and_body() {
        let err = ProviderError::Api {
            status: 401,
            body: r#"{"message":"invalid key"}"#.to_string(),
        };
        assert_eq!(err.to_string(), r#"API Error: 401 - {"message":"invalid key"}"#);
    }

    #[test]
    fn no_response_mentions_missing_response() {
        assert_eq!(
            ProviderError::NoResponse.to_string(),
            "API request failed: No response from server"
        );
    }

    #[test]
    fn default_params_match_remote_contract() {
        let params = GenerationParams::default();
        assert_eq!(params.temperature, 0.7);
        assert_eq!(params.max_tokens, 1500);
    }
}
