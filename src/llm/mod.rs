//! LLM providers and client
//!
//! Provides a unified interface over the chat-completion backends the bot can
//! talk to (`GigaChat`, `OpenRouter`) plus a client with bounded retries.

/// HTTP request/response helpers shared by providers.
pub mod http_utils;
/// Implementations of specific LLM providers.
pub mod providers;

use crate::config::{LlmProviderKind, Settings};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, warn};

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// Error returned by the provider's API
    #[error("API error: {0}")]
    ApiError(String),
    /// Non-success HTTP status from the provider
    #[error("{message}")]
    Http {
        /// Response status code
        status: u16,
        /// Readable description, body included
        message: String,
    },
    /// Error during network communication
    #[error("Network error: {0}")]
    NetworkError(String),
    /// Error during JSON serialization or deserialization
    #[error("JSON error: {0}")]
    JsonError(String),
    /// Missing provider configuration or API key
    #[error("Missing client/API key: {0}")]
    MissingConfig(String),
    /// Rate limit exceeded (429), optionally with a wait time
    #[error("Rate limit exceeded: {message} (wait: {wait_secs:?}s)")]
    RateLimit {
        /// Retry-After duration in seconds, if provided by the server
        wait_secs: Option<u64>,
        /// Error message from the server
        message: String,
    },
    /// Any other unexpected error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl LlmError {
    /// Whether a repeated attempt has a chance to succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkError(_) | Self::RateLimit { .. } => true,
            Self::Http { status, .. } => *status == 408 || *status >= 500,
            // async-openai folds the status into its message
            Self::ApiError(msg) => {
                let msg = msg.to_lowercase();
                ["overloaded", "service unavailable"]
                    .iter()
                    .any(|marker| msg.contains(marker))
            }
            Self::JsonError(_) | Self::MissingConfig(_) | Self::Unknown(_) => false,
        }
    }
}

/// A message in an LLM conversation
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Message {
    /// Role of the message sender (user, assistant, system)
    pub role: String,
    /// Text content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }

    /// Create a new assistant message
    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.to_string(),
        }
    }

    /// Create a new system message
    #[must_use]
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }
}

/// Builds the wire message list; an empty system prompt is left out
#[must_use]
pub fn build_messages(system_prompt: &str, history: &[Message], user_message: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    if !system_prompt.trim().is_empty() {
        messages.push(Message::system(system_prompt));
    }
    messages.extend(history.iter().cloned());
    messages.push(Message::user(user_message));
    messages
}

/// Interface for chat-completion backends
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a reply to `user_message`
    async fn chat_completion(
        &self,
        system_prompt: &str,
        history: &[Message],
        user_message: &str,
        model_id: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError>;
}

/// Client bound to one provider and model
pub struct LlmClient {
    provider: Arc<dyn LlmProvider>,
    model_id: String,
    max_tokens: u32,
    max_retries: usize,
}

impl LlmClient {
    /// Creates the client for the provider selected in settings
    ///
    /// # Errors
    ///
    /// Returns `LlmError::MissingConfig` if the provider is unknown or lacks credentials.
    pub fn new(settings: &Settings) -> Result<Self, LlmError> {
        let kind = settings
            .llm_provider_kind()
            .map_err(|e| LlmError::MissingConfig(e.to_string()))?;

        let (provider, model_id): (Arc<dyn LlmProvider>, String) = match kind {
            LlmProviderKind::GigaChat => (
                Arc::new(providers::GigaChatProvider::new(settings)?),
                settings.gigachat_model.clone(),
            ),
            LlmProviderKind::OpenRouter => {
                let api_key = settings
                    .openrouter_api_key
                    .clone()
                    .ok_or_else(|| LlmError::MissingConfig("openrouter".to_string()))?;
                (
                    Arc::new(providers::OpenAiCompatProvider::new(
                        api_key,
                        &settings.openrouter_api_url,
                    )),
                    settings.openrouter_model.clone(),
                )
            }
        };

        Ok(Self {
            provider,
            model_id,
            max_tokens: settings.llm_max_tokens,
            max_retries: settings.llm_max_retries,
        })
    }

    /// Wraps an arbitrary provider; retries are disabled until [`Self::with_max_retries`]
    #[must_use]
    pub fn with_provider(
        provider: Arc<dyn LlmProvider>,
        model_id: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
            max_tokens,
            max_retries: 0,
        }
    }

    /// Sets how many times a retryable failure is repeated
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Model id requests are sent with
    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Single-turn completion without a system prompt
    ///
    /// # Errors
    ///
    /// Returns the provider error after retries are exhausted.
    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.chat("", prompt).await
    }

    /// Single-turn completion with a system prompt
    ///
    /// # Errors
    ///
    /// Returns the provider error after retries are exhausted.
    pub async fn chat(&self, system_prompt: &str, user_message: &str) -> Result<String, LlmError> {
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(250)
            .max_delay(Duration::from_secs(8))
            .map(jitter)
            .take(self.max_retries);

        let mut attempt = 0usize;
        RetryIf::spawn(
            strategy,
            || {
                attempt += 1;
                debug!(model = %self.model_id, attempt, "Sending chat completion request");
                self.provider.chat_completion(
                    system_prompt,
                    &[],
                    user_message,
                    &self.model_id,
                    self.max_tokens,
                )
            },
            |e: &LlmError| {
                let retry = e.is_retryable();
                if retry {
                    warn!(model = %self.model_id, "Retryable LLM error: {e}");
                }
                retry
            },
        )
        .await
    }
}
