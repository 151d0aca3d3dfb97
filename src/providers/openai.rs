use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};

use super::{
    error_for_send, error_for_status, http_client, Completion, CompletionRequest, Provider,
    RetryPolicy,
};
use crate::errors::ProviderError;

/// Client for the OpenAI chat completions API and compatible local servers
#[derive(Debug)]
pub struct OpenAI {
    client: Client,
    /// API key; empty for servers that do not check it
    api_key: String,
    /// Base URL including the `/v1` prefix
    endpoint: String,
    model: String,
    policy: RetryPolicy,
    name: String,
}

/// Chat completions request
#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    max_tokens: u32,
}

/// One chat message
#[derive(Debug, Serialize, Deserialize)]
pub struct OpenAIMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    #[serde(default)]
    pub content: String,
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct OpenAIUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub message: OpenAIMessage,
}

/// Chat completions response
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    #[serde(default)]
    pub model: String,
    pub choices: Vec<OpenAIChoice>,
    #[serde(default)]
    pub usage: Option<OpenAIUsage>,
}

impl OpenAIRequest {
    pub fn from_completion(model: impl Into<String>, request: &CompletionRequest) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(OpenAIMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        Self {
            model: model.into(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

impl OpenAIResponse {
    /// Text of the first choice
    pub fn text(&self) -> String {
        self.choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default()
    }
}

impl OpenAI {
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
            name: "OpenAI".to_string(),
        }
    }

    /// Rename the provider in logs and errors (e.g. "LM Studio")
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            builder
        } else {
            builder.header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
        }
    }

    /// Send a chat completions request with retry logic
    pub async fn chat(&self, request: &OpenAIRequest) -> Result<OpenAIResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.endpoint);
        let url = url.as_str();
        let name = self.name.as_str();

        self.policy
            .run(name, move || async move {
                let response = self
                    .authorized(self.client.post(url))
                    .json(request)
                    .send()
                    .await
                    .map_err(|e| error_for_send(name, e))?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(error_for_status(name, status.as_u16(), body));
                }

                response.json::<OpenAIResponse>().await.map_err(|e| {
                    ProviderError::ParseError(format!("Failed to parse {} response: {}", name, e))
                })
            })
            .await
    }
}

#[async_trait]
impl Provider for OpenAI {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        let chat = OpenAIRequest::from_completion(&self.model, &request);
        let response = self.chat(&chat).await?;

        Ok(Completion {
            text: response.text(),
            model: if response.model.is_empty() {
                self.model.clone()
            } else {
                response.model.clone()
            },
            prompt_tokens: response.usage.as_ref().map(|u| u.prompt_tokens),
            completion_tokens: response.usage.as_ref().map(|u| u.completion_tokens),
        })
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let url = format!("{}/models", self.endpoint);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| error_for_send(&self.name, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(&self.name, status.as_u16(), body));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
