//! OpenAI-compatible chat-completions client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::error::LlmError;
use super::{ChatMessage, ChatOptions, LlmClient, RawResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// HTTP client for `{base_url}/chat/completions`.
///
/// Holds one pooled [`reqwest::Client`]; construct once and share behind an
/// `Arc`. No per-request state is kept between calls.
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    /// Create a client against the public OpenAI endpoint.
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client against any OpenAI-compatible endpoint.
    pub fn with_base_url(api_key: String, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Execute a single request without retry.
    async fn execute_request(
        &self,
        request: &ChatCompletionRequest<'_>,
    ) -> Result<RawResponse, LlmError> {
        let response = match self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                if e.is_timeout() {
                    return Err(LlmError::timeout(format!("Request timeout: {}", e)));
                } else if e.is_connect() {
                    return Err(LlmError::network_error(format!("Connection failed: {}", e)));
                } else {
                    return Err(LlmError::network_error(format!("Request failed: {}", e)));
                }
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => {
                return Err(LlmError::timeout(format!("Timed out reading body: {}", e)))
            }
            Err(e) => return Err(LlmError::parse_error(format!("Failed to read body: {}", e))),
        };

        if !status.is_success() {
            return Err(LlmError::from_status(status.as_u16(), body));
        }

        Ok(RawResponse::from_body(body))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> Result<RawResponse, LlmError> {
        let request = ChatCompletionRequest {
            model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        tracing::debug!("Sending request to generation service: model={}", model);

        self.execute_request(&request).await
    }
}

/// Chat-completions request format.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
}
