//! LLM client module for talking to the external text-generation service.
//!
//! This module provides a trait-based abstraction over chat-completion
//! providers, with an OpenAI-compatible HTTP client as the implementation.
//!
//! A client performs exactly one call per request. Retrying, timeouts and
//! cancellation belong to the caller (see [`crate::extraction`]).

mod error;
mod openai;
#[cfg(test)]
pub(crate) mod testing;

pub use error::{classify_http_status, LlmError, LlmErrorKind, RetryConfig};
pub use openai::{OpenAiClient, DEFAULT_BASE_URL};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Create a simple text message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        ChatMessage {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Optional parameters for chat completions.
///
/// These are intentionally conservative; the goal is reproducibility.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatOptions {
    /// Sampling temperature (0 = deterministic).
    pub temperature: Option<f64>,
    /// Maximum output tokens to generate.
    pub max_tokens: Option<u64>,
}

/// Payload of one generation-service call.
///
/// The provider does not promise a stable response schema, so the body is
/// kept as-is: parsed JSON when it is JSON, the raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    Json(serde_json::Value),
    Text(String),
}

impl RawResponse {
    /// Wrap a response body, keeping it structured when it parses as JSON.
    pub fn from_body(body: String) -> Self {
        match serde_json::from_str(&body) {
            Ok(value) => RawResponse::Json(value),
            Err(_) => RawResponse::Text(body),
        }
    }
}

/// Trait for LLM clients.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single chat completion request.
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> Result<RawResponse, LlmError>;
}
