//! Configuration management.
//!
//! Configuration is read from environment variables (a `.env` file is loaded
//! by the binary first, if present):
//! - `OPENAI_API_KEY` - Required. Key for the generation service.
//! - `OPENAI_BASE_URL` - Optional. OpenAI-compatible endpoint root.
//! - `EXTRACTION_MODEL` - Optional. Defaults to `gpt-4o-mini`.
//! - `EXTRACTION_MAX_RETRIES` - Optional. Total attempts per transcript (default 3).
//! - `EXTRACTION_RETRY_BASE_DELAY_MS` - Optional. First backoff delay (default 1000).
//! - `EXTRACTION_REQUEST_TIMEOUT_SECS` - Optional. Per-attempt timeout (default 30).
//! - `EXTRACTION_MAX_TOKENS` - Optional. Output ceiling (default 800).
//! - `DATABASE_PATH` - Optional. SQLite file (default `./data/tasks.sqlite`).
//! - `HOST` / `PORT` - Optional. Bind address (default `127.0.0.1:3000`).
//! - `ALLOWED_ORIGINS` - Optional. Comma-separated CORS origins.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::extraction::ExtractionSettings;
use crate::llm::RetryConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: String, value: String },
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub model: String,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub request_timeout: Duration,
    pub max_tokens: u64,
    pub database_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let openai_api_key = var("OPENAI_API_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))?;

        let defaults = ExtractionSettings::default();

        Ok(Self {
            openai_api_key,
            openai_base_url: var("OPENAI_BASE_URL")
                .unwrap_or_else(|| crate::llm::DEFAULT_BASE_URL.to_string()),
            model: var("EXTRACTION_MODEL").unwrap_or(defaults.model),
            max_retries: parse_or(&var, "EXTRACTION_MAX_RETRIES", defaults.retry.max_attempts)?,
            retry_base_delay: Duration::from_millis(parse_or(
                &var,
                "EXTRACTION_RETRY_BASE_DELAY_MS",
                defaults.retry.base_delay.as_millis() as u64,
            )?),
            request_timeout: Duration::from_secs(parse_or(
                &var,
                "EXTRACTION_REQUEST_TIMEOUT_SECS",
                defaults.retry.request_timeout.as_secs(),
            )?),
            max_tokens: parse_or(&var, "EXTRACTION_MAX_TOKENS", defaults.max_tokens)?,
            database_path: var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/tasks.sqlite")),
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&var, "PORT", 3000)?,
            allowed_origins: var("ALLOWED_ORIGINS")
                .unwrap_or_else(|| "http://localhost:3000".to_string())
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
        })
    }

    /// Settings for the extraction client.
    pub fn extraction_settings(&self) -> ExtractionSettings {
        ExtractionSettings {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            retry: RetryConfig {
                max_attempts: self.max_retries,
                base_delay: self.retry_base_delay,
                request_timeout: self.request_timeout,
            },
        }
    }
}

fn parse_or<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value,
        }),
    }
}
