use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{
    error_for_send, error_for_status, http_client, Completion, CompletionRequest, Provider,
    RetryPolicy,
};
use crate::errors::ProviderError;

/// Ollama client for interacting with Ollama API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// Model to generate with
    model: String,
    /// HTTP client for making requests
    client: Client,
    /// Retry and rate limit settings
    policy: RetryPolicy,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Generation options for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation (default: 0.8)
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    #[serde(default)]
    pub model: String,
    /// Generated text
    #[serde(default)]
    pub response: String,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Number of prompt tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

impl GenerationRequest {
    /// Build a non-streaming generate request from a completion request
    pub fn from_completion(model: impl Into<String>, request: &CompletionRequest) -> Self {
        Self {
            model: model.into(),
            prompt: request.prompt.clone(),
            system: request.system.clone(),
            options: Some(GenerationOptions {
                temperature: Some(request.temperature),
                num_predict: Some(request.max_tokens),
            }),
            stream: Some(false),
        }
    }
}

impl Ollama {
    /// Create a new Ollama client
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            client: http_client(timeout_secs),
            policy,
        }
    }

    /// Generate text from the Ollama API with retry logic
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);
        let url = url.as_str();

        self.policy
            .run("Ollama", move || async move {
                let response = self
                    .client
                    .post(url)
                    .json(request)
                    .send()
                    .await
                    .map_err(|e| error_for_send("Ollama", e))?;

                let status = response.status();
                let body = response.text().await.map_err(|e| {
                    ProviderError::ConnectionError(format!("Failed to read Ollama response: {}", e))
                })?;

                if !status.is_success() {
                    return Err(error_for_status("Ollama", status.as_u16(), body));
                }
                parse_generate_body(&body)
            })
            .await
    }
}

/// Parse a generate response body.
///
/// Accepts a single JSON object or a JSONL stream, in which case the
/// `response` fragments of every line are concatenated in order.
pub fn parse_generate_body(body: &str) -> Result<GenerationResponse, ProviderError> {
    if let Ok(single) = serde_json::from_str::<GenerationResponse>(body) {
        return Ok(single);
    }

    let mut merged = GenerationResponse {
        model: String::new(),
        response: String::new(),
        done: false,
        prompt_eval_count: None,
        eval_count: None,
    };
    let mut parsed_lines = 0;

    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Ok(chunk) = serde_json::from_str::<GenerationResponse>(line) else {
            debug!("Skipping unparseable Ollama stream line");
            continue;
        };
        parsed_lines += 1;
        merged.response.push_str(&chunk.response);
        if merged.model.is_empty() {
            merged.model = chunk.model;
        }
        if chunk.done {
            merged.done = true;
            merged.prompt_eval_count = chunk.prompt_eval_count;
            merged.eval_count = chunk.eval_count;
        }
    }

    if parsed_lines == 0 {
        let preview: String = body.chars().take(500).collect();
        error!("Failed to parse Ollama API response. Raw response (first 500 chars): {}", preview);
        return Err(ProviderError::ParseError(
            "Ollama response contains no valid JSON".to_string(),
        ));
    }

    Ok(merged)
}

#[async_trait]
impl Provider for Ollama {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        let generate = GenerationRequest::from_completion(&self.model, &request);
        let response = self.generate(&generate).await?;

        Ok(Completion {
            text: response.response,
            model: if response.model.is_empty() {
                self.model.clone()
            } else {
                response.model
            },
            prompt_tokens: response.prompt_eval_count,
            completion_tokens: response.eval_count,
        })
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| error_for_send("Ollama", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status("Ollama", status.as_u16(), body));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "Ollama"
    }
}
