/*!
 * Provider implementations for report text generation.
 *
 * This module contains client implementations for various LLM providers:
 * - Ollama: Local LLM server
 * - OpenAI: OpenAI API integration (also serves LM Studio)
 * - Anthropic: Anthropic API integration
 * - Mock: canned responses for tests
 */

use async_trait::async_trait;
use log::{debug, error, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt::Debug;
use std::future::Future;
use std::time::{Duration, Instant};

use crate::app_config::{GenerationConfig, GenerationProvider};
use crate::errors::ProviderError;

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;

/// One text generation request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// System prompt guiding the model
    pub system: Option<String>,
    /// User prompt
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: 0.4,
            max_tokens: 2048,
        }
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the token limit
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Generated text plus token accounting when the provider reports it
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the report service.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Complete a request using this provider
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Human readable provider name
    fn name(&self) -> &str;
}

/// Retry, backoff and rate limiting shared by the HTTP providers
#[derive(Debug)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first request
    pub max_retries: u32,
    /// Base backoff time in milliseconds, doubled on each retry
    pub backoff_base_ms: u64,
    /// Optional rate limit in requests per minute
    pub rate_limit: Option<u32>,
    last_request: Mutex<Option<Instant>>,
}

impl Clone for RetryPolicy {
    fn clone(&self) -> Self {
        Self::new(self.max_retries, self.backoff_base_ms, self.rate_limit)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 1000, None)
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_base_ms: u64, rate_limit: Option<u32>) -> Self {
        Self {
            max_retries,
            backoff_base_ms,
            rate_limit,
            last_request: Mutex::new(None),
        }
    }

    /// Policy that never retries nor waits
    pub fn none() -> Self {
        Self::new(0, 0, None)
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(factor))
    }

    /// Minimum spacing between two requests under the rate limit
    pub fn min_interval(&self) -> Option<Duration> {
        self.rate_limit
            .filter(|limit| *limit > 0)
            .map(|limit| Duration::from_millis(60_000 / limit as u64))
    }

    /// Time to wait before the next request may be sent
    fn reserve_slot(&self) -> Duration {
        let Some(interval) = self.min_interval() else {
            return Duration::ZERO;
        };
        let mut last = self.last_request.lock();
        let now = Instant::now();
        let next = match *last {
            Some(previous) if previous + interval > now => previous + interval,
            _ => now,
        };
        *last = Some(next);
        next - now
    }

    /// Run `op`, retrying retryable failures with exponential backoff.
    pub async fn run<T, F, Fut>(&self, provider: &str, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;
        loop {
            let wait = self.reserve_slot();
            if !wait.is_zero() {
                debug!("{} rate limit: waiting {:?}", provider, wait);
                tokio::time::sleep(wait).await;
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let backoff = self.backoff(attempt);
                    warn!(
                        "{} request failed: {} - retrying in {:?} (attempt {}/{})",
                        provider,
                        e,
                        backoff,
                        attempt + 1,
                        self.max_retries + 1
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    error!("{} request failed: {}", provider, e);
                    return Err(e);
                }
            }
        }
    }
}

/// Map an unsuccessful HTTP status to a provider error
pub fn error_for_status(provider: &str, status: u16, body: String) -> ProviderError {
    match status {
        401 | 403 => ProviderError::AuthenticationError(format!("{} rejected credentials: {}", provider, body)),
        429 => ProviderError::RateLimitExceeded(format!("{}: {}", provider, body)),
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

/// Map a transport failure to a provider error
pub fn error_for_send(provider: &str, error: reqwest::Error) -> ProviderError {
    if error.is_builder() {
        ProviderError::RequestFailed(format!("Invalid {} request: {}", provider, error))
    } else {
        ProviderError::ConnectionError(format!("Failed to reach {}: {}", provider, error))
    }
}

/// Validate an endpoint URL and strip any trailing slash
pub fn normalize_endpoint(endpoint: &str) -> Result<String, ProviderError> {
    let parsed = url::Url::parse(endpoint)
        .map_err(|e| ProviderError::RequestFailed(format!("Invalid endpoint '{}': {}", endpoint, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ProviderError::RequestFailed(format!(
            "Unsupported endpoint scheme '{}'",
            parsed.scheme()
        )));
    }
    Ok(endpoint.trim_end_matches('/').to_string())
}

/// Build an HTTP client with the given timeout
pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_default()
}

/// Create the provider selected in the configuration
pub fn build_provider(config: &GenerationConfig) -> Result<Box<dyn Provider>, ProviderError> {
    let endpoint = normalize_endpoint(&config.get_endpoint())?;
    let model = config.get_model();
    let policy = RetryPolicy::new(
        config.common.retry_count,
        config.common.retry_backoff_ms,
        config.get_rate_limit(),
    );
    let timeout_secs = config.get_timeout_secs();

    let provider: Box<dyn Provider> = match config.provider {
        GenerationProvider::Ollama => Box::new(ollama::Ollama::new(endpoint, model, timeout_secs, policy)),
        GenerationProvider::OpenAI => Box::new(openai::OpenAI::new(
            endpoint,
            config.get_api_key(),
            model,
            timeout_secs,
            policy,
        )),
        GenerationProvider::LMStudio => Box::new(
            openai::OpenAI::new(endpoint, config.get_api_key(), model, timeout_secs, policy)
                .with_name("LM Studio"),
        ),
        GenerationProvider::Anthropic => Box::new(anthropic::Anthropic::new(
            endpoint,
            config.get_api_key(),
            model,
            timeout_secs,
            policy,
        )),
    };

    debug!("Using {} provider with model {}", provider.name(), config.get_model());
    Ok(provider)
}
