//! Error classification for generation-service calls.
//!
//! Every transport failure is tagged with an [`LlmErrorKind`] so callers can
//! decide whether a call is worth repeating without inspecting messages.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Broad category of a failed generation-service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// The call did not complete in time.
    Timeout,
    /// HTTP 429 from the provider.
    RateLimited,
    /// HTTP 5xx from the provider.
    ServerError,
    /// Connection refused, reset, DNS failure, etc.
    NetworkError,
    /// HTTP 4xx other than 408/429. Repeating the request will not help.
    ClientError,
    /// The response body could not be read.
    ParseError,
}

impl LlmErrorKind {
    /// Whether a call failing with this kind may succeed if repeated.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            LlmErrorKind::Timeout
                | LlmErrorKind::RateLimited
                | LlmErrorKind::ServerError
                | LlmErrorKind::NetworkError
        )
    }
}

impl fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LlmErrorKind::Timeout => "timeout",
            LlmErrorKind::RateLimited => "rate_limited",
            LlmErrorKind::ServerError => "server_error",
            LlmErrorKind::NetworkError => "network_error",
            LlmErrorKind::ClientError => "client_error",
            LlmErrorKind::ParseError => "parse_error",
        };
        f.write_str(label)
    }
}

/// Map an HTTP status code onto an error kind.
pub fn classify_http_status(status: u16) -> LlmErrorKind {
    match status {
        408 => LlmErrorKind::Timeout,
        429 => LlmErrorKind::RateLimited,
        500..=599 => LlmErrorKind::ServerError,
        _ => LlmErrorKind::ClientError,
    }
}

/// A failed generation-service call.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
    /// HTTP status, when the provider answered at all.
    pub status: Option<u16>,
}

impl LlmError {
    fn new(kind: LlmErrorKind, message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            kind,
            message: message.into(),
            status,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Timeout, message, None)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::RateLimited, message, Some(429))
    }

    pub fn server_error(status: u16, body: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::ServerError, body, Some(status))
    }

    pub fn client_error(status: u16, body: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::ClientError, body, Some(status))
    }

    pub fn network_error(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::NetworkError, message, None)
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::ParseError, message, None)
    }

    /// Build the error for a non-success HTTP status.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let kind = classify_http_status(status);
        Self::new(kind, body, Some(status))
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for every retry after it.
    pub base_delay: Duration,
    /// Upper bound on a single call to the service.
    pub request_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Whether `error`, raised by attempt number `attempt` (1-based), earns
    /// another attempt.
    pub fn should_retry(&self, error: &LlmError, attempt: u32) -> bool {
        error.is_transient() && attempt < self.max_attempts
    }

    /// Delay to wait after failed attempt `attempt` (1-based):
    /// `base_delay * 2^(attempt - 1)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}
