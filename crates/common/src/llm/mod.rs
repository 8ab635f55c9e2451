//! Language model client
//!
//! Free-form chat completion behind the `LanguageModel` trait. Completions
//! carry an explicit status so callers can tell a real reply apart from a
//! provider that is rate limiting or otherwise degraded.

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use crate::resilience::{is_retryable_status, with_retry, AttemptError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Result of a completion call
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The model produced a reply
    Text(String),
    /// The provider answered but could not be trusted this turn
    Degraded { reason: String },
}

/// Trait for chat-style language models
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `prompt` under the given system instruction
    async fn complete(&self, system: &str, prompt: &str) -> Result<Completion>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// OpenAI-compatible chat completions client
pub struct OpenAIChatModel {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_retries: u32,
}

impl OpenAIChatModel {
    /// Create a new chat client
    pub fn new(api_key: String, config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }

    async fn make_request(
        &self,
        system: &str,
        prompt: &str,
    ) -> std::result::Result<String, AttemptError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: 256,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                backoff::Error::transient(AppError::LanguageModel {
                    message: format!("LLM API request failed: {}", e),
                })
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("LLM API error {}: {}", status, body);
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
                    backoff::Error::transient(AppError::ServiceUnavailable { message })
                }
                s if is_retryable_status(s) => {
                    backoff::Error::transient(AppError::LanguageModel { message })
                }
                _ => backoff::Error::permanent(AppError::LanguageModel { message }),
            });
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            backoff::Error::permanent(AppError::LanguageModel {
                message: format!("Failed to parse LLM response: {}", e),
            })
        })?;

        Ok(chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

#[async_trait]
impl LanguageModel for OpenAIChatModel {
    async fn complete(&self, system: &str, prompt: &str) -> Result<Completion> {
        match with_retry("llm", self.max_retries, || self.make_request(system, prompt)).await {
            // A blank reply is an answer; only throttling degrades.
            Ok(text) => Ok(Completion::Text(text)),
            Err(AppError::ServiceUnavailable { message }) => {
                Ok(Completion::Degraded { reason: message })
            }
            Err(e) => Err(e),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Language model used when no provider is configured
///
/// Every completion is degraded, so refiners pass text through unchanged and
/// the meaning arbiter reports an unknown verdict.
pub struct OfflineLanguageModel;

#[async_trait]
impl LanguageModel for OfflineLanguageModel {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<Completion> {
        Ok(Completion::Degraded {
            reason: "language model not configured".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "offline"
    }
}

/// Create a language model based on configuration
pub fn create_language_model(config: &LlmConfig) -> Result<Arc<dyn LanguageModel>> {
    match config.provider.as_str() {
        "openai" => {
            let key = config.api_key.clone().ok_or_else(|| AppError::Configuration {
                message: "llm.api_key is required for the openai provider".to_string(),
            })?;
            Ok(Arc::new(OpenAIChatModel::new(key, config)?))
        }
        "mock" | "offline" => Ok(Arc::new(OfflineLanguageModel)),
        other => {
            tracing::warn!(provider = other, "Unknown language model provider, running offline");
            Ok(Arc::new(OfflineLanguageModel))
        }
    }
}
