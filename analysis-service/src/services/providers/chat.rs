//! OpenAI-compatible chat completions provider (SiliconFlow by default).

use super::{CompletionProvider, GenerationParams, ProviderError, ProviderResponse};
use crate::config::CompletionConfig;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

/// Name of the variable that carries the key, used in the "not configured" error.
pub const API_KEY_VARIABLE: &str = "SILICONFLOW_API_KEY";

pub struct ChatCompletionsProvider {
    api_key: Option<Secret<String>>,
    api_url: String,
    model: String,
    client: Client,
}

impl ChatCompletionsProvider {
    pub fn new(config: &CompletionConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::RequestSetup(e.to_string()))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            client,
        })
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret().as_str())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ProviderError::NotConfigured(format!("{} is not configured", API_KEY_VARIABLE)))
    }
}

/// Transport errors are "no response" unless reqwest never got as far as sending.
fn classify_send_error(err: reqwest::Error) -> ProviderError {
    if err.is_builder() {
        ProviderError::RequestSetup(err.to_string())
    } else {
        ProviderError::NoResponse
    }
}

/// Error bodies are echoed as JSON: parsed bodies are re-serialised compactly,
/// anything else becomes a quoted JSON string.
fn echo_body(raw: &str) -> String {
    serde_json::from_str::<serde_json::Value>(raw)
        .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
        .to_string()
}

#[async_trait]
impl CompletionProvider for ChatCompletionsProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        let api_key = self.api_key()?;

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let request = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .build()
            .map_err(|e| ProviderError::RequestSetup(e.to_string()))?;

        tracing::debug!(
            model = %self.model,
            url = %self.api_url,
            prompt_len = prompt.len(),
            "Sending request to completion API"
        );

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, url = %self.api_url, "Completion API request failed");
                classify_send_error(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(|e| {
                tracing::error!(
                    status = status.as_u16(),
                    error = %e,
                    "Failed to read completion API error body"
                );
                ProviderError::NoResponse
            })?;
            tracing::error!(status = status.as_u16(), body = %body, "Completion API returned an error");

            return Err(ProviderError::Api {
                status: status.as_u16(),
                body: echo_body(&body),
            });
        }

        let api_response: ChatCompletionResponse = response.json().await.map_err(|e| {
            if e.is_decode() {
                ProviderError::UnexpectedResponse(format!("failed to parse response: {}", e))
            } else {
                ProviderError::NoResponse
            }
        })?;

        let text = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| {
                ProviderError::UnexpectedResponse(
                    "response has no choices[0].message.content".to_string(),
                )
            })?;

        let usage = api_response.usage.unwrap_or_default();

        Ok(ProviderResponse {
            text,
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        })
    }
}

// ============================================================================
// Chat completions request/response types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Usage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn config(api_key: Option<&str>) -> CompletionConfig {
        CompletionConfig {
            api_key: api_key.map(|k| Secret::new(k.to_string())),
            api_url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            model: "test-model".to_string(),
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let provider = ChatCompletionsProvider::new(&config(None)).unwrap();
        let err = provider
            .generate("prompt", &GenerationParams::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::NotConfigured(_)));
        assert_eq!(err.to_string(), "SILICONFLOW_API_KEY is not configured");
    }

    #[tokio::test]
    async fn empty_key_counts_as_missing() {
        let provider = ChatCompletionsProvider::new(&config(Some(""))).unwrap();
        let err = provider
            .generate("prompt", &GenerationParams::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn unparseable_url_is_a_setup_error() {
        let mut cfg = config(Some("key"));
        cfg.api_url = "not a url".to_string();
        let provider = ChatCompletionsProvider::new(&cfg).unwrap();

        let err = provider
            .generate("prompt", &GenerationParams::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::RequestSetup(_)));
    }

    #[test]
    fn json_bodies_are_echoed_compactly() {
        assert_eq!(
            echo_body("{\n  \"error\": \"quota\"\n}"),
            r#"{"error":"quota"}"#
        );
        assert_eq!(echo_body("Bad Gateway"), r#""Bad Gateway""#);
        assert_eq!(echo_body(""), r#""""#);
    }

    /// Serves one response whose head announces more body than is sent, then hangs up.
    async fn serve_truncated_error() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            socket
                .write_all(b"HTTP/1.1 502 Bad Gateway\r\ncontent-length: 100\r\n\r\npartial")
                .await
                .unwrap();
            socket.shutdown().await.ok();
        });

        format!("http://{}/v1/chat/completions", addr)
    }

    async fn read_request(socket: &mut TcpStream) {
        let mut received = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            received.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&received);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if received.len() >= head_end + 4 + content_length {
                    return;
                }
            }
        }
    }

    #[tokio::test]
    async fn unreadable_error_body_is_no_response() {
        let mut cfg = config(Some("key"));
        cfg.api_url = serve_truncated_error().await;
        let provider = ChatCompletionsProvider::new(&cfg).unwrap();

        let err = provider
            .generate("prompt", &GenerationParams::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::NoResponse), "got {:?}", err);
    }

    #[test]
    fn request_body_matches_chat_completions_shape() {
        let request = ChatCompletionRequest {
            model: "m",
            messages: vec![ChatMessage {
                role: "user",
                content: "hello",
            }],
            temperature: 0.5,
            max_tokens: 10,
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "model": "m",
                "messages": [{"role": "user", "content": "hello"}],
                "temperature": 0.5,
                "max_tokens": 10
            })
        );
    }
}
