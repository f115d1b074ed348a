//! Async LLM client for the assistant
//!
//! Model-agnostic HTTP client for chat completion APIs. Supports both
//! Anthropic and OpenAI-compatible APIs (Groq, OpenAI, DeepSeek).
//! The model only classifies intent; it never touches stored data.

use crate::core::config::LlmConfig;
use crate::core::error::{OdrnaError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Anything able to answer a system + user prompt pair
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Whether a credential is available
    fn is_configured(&self) -> bool;

    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// API format type
#[derive(Debug, Clone, PartialEq)]
pub enum ApiFormat {
    Anthropic,
    OpenAI,
}

/// Async LLM client for making API calls
pub struct LlmClient {
    client: Client,
    api_key: Option<String>,
    api_url: String,
    model: String,
    temperature: f32,
    api_format: ApiFormat,
}

impl LlmClient {
    /// Create a new LLM client with explicit configuration
    pub fn new(api_key: Option<String>, api_url: String, model: String) -> Self {
        let api_format = Self::detect_api_format(&api_url);
        Self {
            client: Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            api_url,
            model,
            temperature: 0.7,
            api_format,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Bound every request; the resolver applies its own timeout on top
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Self::new(
            config.api_key.clone(),
            config.api_url.clone(),
            config.model.clone(),
        )
        .with_temperature(config.temperature)
        .with_timeout(Duration::from_secs(config.timeout_secs))
    }

    /// Detect API format from URL
    fn detect_api_format(url: &str) -> ApiFormat {
        if url.contains("anthropic.com") {
            ApiFormat::Anthropic
        } else {
            // Groq, OpenAI, and other compatible APIs use OpenAI format
            ApiFormat::OpenAI
        }
    }

    pub fn api_format(&self) -> &ApiFormat {
        &self.api_format
    }

    fn key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| OdrnaError::LlmNotConfigured("no API key set (LLM_API_KEY)".into()))
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(OdrnaError::LlmUnauthorized {
                status: status.as_u16(),
            });
        }
        let body = response.text().await.unwrap_or_default();
        Err(OdrnaError::LlmHttp {
            status: status.as_u16(),
            body,
        })
    }

    async fn complete_anthropic(&self, system: &str, user: &str) -> Result<String> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: 2048,
            temperature: self.temperature,
            system: system.into(),
            messages: vec![Message {
                role: "user".into(),
                content: user.into(),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", self.key()?)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| OdrnaError::LlmError(e.to_string()))?;

        let completion: AnthropicResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| OdrnaError::LlmError(e.to_string()))?;

        completion
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| OdrnaError::LlmMalformed("Empty response".into()))
    }

    async fn complete_openai(&self, system: &str, user: &str) -> Result<String> {
        let request = OpenAIRequest {
            model: self.model.clone(),
            max_tokens: 2048,
            temperature: self.temperature,
            response_format: ResponseFormat {
                kind: "json_object".into(),
            },
            messages: vec![
                Message {
                    role: "system".into(),
                    content: system.into(),
                },
                Message {
                    role: "user".into(),
                    content: user.into(),
                },
            ],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.key()?))
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| OdrnaError::LlmError(e.to_string()))?;

        let completion: OpenAIResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| OdrnaError::LlmError(e.to_string()))?;

        completion
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| OdrnaError::LlmMalformed("Empty response".into()))
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send a completion request to the LLM
    ///
    /// # Arguments
    /// * `system` - System prompt with instructions and current data
    /// * `user` - The user's utterance
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        match self.api_format {
            ApiFormat::Anthropic => self.complete_anthropic(system, user).await,
            ApiFormat::OpenAI => self.complete_openai(system, user).await,
        }
    }
}

// Anthropic API format
#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

// OpenAI-compatible API format (Groq, OpenAI, etc.)
#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// Shared
#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}
