use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{
    error_for_send, error_for_status, http_client, Completion, CompletionRequest, Provider,
    RetryPolicy,
};
use crate::errors::ProviderError;

/// Version header required by the messages API
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic client for interacting with Anthropic API
#[derive(Debug)]
pub struct Anthropic {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API endpoint URL
    endpoint: String,
    model: String,
    policy: RetryPolicy,
}

/// Anthropic message request
#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<AnthropicMessage>,

    /// System prompt to guide the AI
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Maximum number of tokens to generate
    max_tokens: u32,
}

/// Anthropic message format
#[derive(Debug, Serialize, Deserialize)]
pub struct AnthropicMessage {
    /// Role of the message sender (user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct TokenUsage {
    /// Number of input tokens
    pub input_tokens: u64,
    /// Number of output tokens
    pub output_tokens: u64,
}

/// Anthropic response
#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    #[serde(default)]
    pub model: String,
    /// The content of the response
    pub content: Vec<AnthropicContent>,
    /// Token usage information
    pub usage: TokenUsage,
}

/// Individual content block in an Anthropic response
#[derive(Debug, Deserialize)]
pub struct AnthropicContent {
    /// The type of content
    #[serde(rename = "type")]
    pub content_type: String,

    /// The actual text content
    #[serde(default)]
    pub text: String,
}

impl AnthropicRequest {
    /// Create a new Anthropic request
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            system: None,
            temperature: None,
            max_tokens,
        }
    }

    pub fn from_completion(model: impl Into<String>, request: &CompletionRequest) -> Self {
        let mut built = Self::new(model, request.max_tokens)
            .add_message("user", request.prompt.clone())
            .temperature(request.temperature);
        built.system = request.system.clone();
        built
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(AnthropicMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

impl AnthropicResponse {
    /// Concatenated text blocks
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
            .collect()
    }
}

impl Anthropic {
    /// Create a new Anthropic client
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            client: http_client(timeout_secs),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
            policy,
        }
    }

    /// Send a messages request with retry logic
    pub async fn messages(&self, request: &AnthropicRequest) -> Result<AnthropicResponse, ProviderError> {
        let url = format!("{}/v1/messages", self.endpoint);
        let url = url.as_str();

        self.policy
            .run("Anthropic", move || async move {
                let response = self
                    .client
                    .post(url)
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(request)
                    .send()
                    .await
                    .map_err(|e| error_for_send("Anthropic", e))?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(error_for_status("Anthropic", status.as_u16(), body));
                }

                response.json::<AnthropicResponse>().await.map_err(|e| {
                    ProviderError::ParseError(format!("Failed to parse Anthropic API response: {}", e))
                })
            })
            .await
    }
}

#[async_trait]
impl Provider for Anthropic {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        let messages = AnthropicRequest::from_completion(&self.model, &request);
        let response = self.messages(&messages).await?;

        Ok(Completion {
            text: response.text(),
            model: if response.model.is_empty() {
                self.model.clone()
            } else {
                response.model.clone()
            },
            prompt_tokens: Some(response.usage.input_tokens),
            completion_tokens: Some(response.usage.output_tokens),
        })
    }

    /// Sends a ten-token request, the API has no cheaper probe
    async fn test_connection(&self) -> Result<(), ProviderError> {
        let request = AnthropicRequest::new(&self.model, 10).add_message("user", "Hello");
        self.messages(&request).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "Anthropic"
    }
}
