//! Configuration and settings management
//!
//! Loads settings from config files and environment variables and defines
//! the defaults for every tunable.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application settings loaded from config files and environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token; enables the Telegram transport
    pub telegram_token: Option<String>,

    /// Listen address for the HTTP webhook, e.g. `0.0.0.0:8080`
    pub webhook_bind: Option<String>,
    /// Bearer token expected on webhook requests
    pub webhook_token: Option<String>,

    /// Which LLM backend to use (`gigachat` or `openrouter`)
    #[serde(default = "default_llm_provider")]
    pub llm_provider: String,

    /// Base64 of `client_id:client_secret` for `GigaChat` OAuth
    pub gigachat_auth_key: Option<String>,
    /// `GigaChat` client id (used with the secret when no auth key is set)
    pub gigachat_client_id: Option<String>,
    /// `GigaChat` client secret
    pub gigachat_client_secret: Option<String>,
    /// OAuth scope
    #[serde(default = "default_gigachat_scope")]
    pub gigachat_scope: String,
    /// OAuth token endpoint
    #[serde(default = "default_gigachat_token_url")]
    pub gigachat_token_url: String,
    /// Chat completions endpoint
    #[serde(default = "default_gigachat_api_url")]
    pub gigachat_api_url: String,
    /// Model name
    #[serde(default = "default_gigachat_model")]
    pub gigachat_model: String,
    /// PEM client certificate for mutual TLS
    pub gigachat_cert: Option<PathBuf>,
    /// PEM private key for mutual TLS
    pub gigachat_key: Option<PathBuf>,
    /// PEM root certificate to trust in addition to the system roots
    pub gigachat_ca: Option<PathBuf>,
    /// Verify the server certificate
    #[serde(default = "default_true")]
    pub gigachat_verify_ssl: bool,

    /// `OpenRouter` API key
    pub openrouter_api_key: Option<String>,
    /// `OpenRouter` API base
    #[serde(default = "default_openrouter_api_url")]
    pub openrouter_api_url: String,
    /// `OpenRouter` model id
    #[serde(default = "default_openrouter_model")]
    pub openrouter_model: String,

    /// Maximum completion tokens
    #[serde(default = "default_llm_max_tokens")]
    pub llm_max_tokens: u32,
    /// HTTP timeout for LLM calls
    #[serde(default = "default_llm_http_timeout_secs")]
    pub llm_http_timeout_secs: u64,
    /// Retries for transient LLM failures
    #[serde(default = "default_llm_max_retries")]
    pub llm_max_retries: usize,

    /// Spreadsheet with the registry of existing agents
    #[serde(default = "default_registry_path")]
    pub registry_path: PathBuf,
    /// Append-only journal of submitted ideas
    #[serde(default = "default_ideas_journal_path")]
    pub ideas_journal_path: PathBuf,
    /// Directory for generated documents
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Age after which generated documents are deleted from the output dir
    #[serde(default = "default_generated_file_ttl_secs")]
    pub generated_file_ttl_secs: u64,

    /// Similarity ratio at which a registry entry counts as the same idea
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Idle time after which a session is dropped
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    /// Maximum number of live sessions
    #[serde(default = "default_session_max_capacity")]
    pub session_max_capacity: u64,

    /// Where users are sent for support
    #[serde(default = "default_support_contact")]
    pub support_contact: String,
}

/// Supported LLM backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    /// Sber `GigaChat` with OAuth client credentials
    GigaChat,
    /// `OpenRouter` (OpenAI-compatible), e.g. `DeepSeek` models
    OpenRouter,
}

fn default_llm_provider() -> String {
    "gigachat".to_string()
}

fn default_gigachat_scope() -> String {
    "GIGACHAT_API_PERS".to_string()
}

fn default_gigachat_token_url() -> String {
    "https://ngw.devices.sberbank.ru:9443/api/v2/oauth".to_string()
}

fn default_gigachat_api_url() -> String {
    "https://gigachat.devices.sberbank.ru/api/v1/chat/completions".to_string()
}

fn default_gigachat_model() -> String {
    "GigaChat-Pro".to_string()
}

const fn default_true() -> bool {
    true
}

fn default_openrouter_api_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_openrouter_model() -> String {
    "deepseek/deepseek-chat".to_string()
}

const fn default_llm_max_tokens() -> u32 {
    2048
}

const fn default_llm_http_timeout_secs() -> u64 {
    60
}

const fn default_llm_max_retries() -> usize {
    2
}

fn default_registry_path() -> PathBuf {
    PathBuf::from("agents.xlsx")
}

fn default_ideas_journal_path() -> PathBuf {
    PathBuf::from("ideas.txt")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated")
}

const fn default_generated_file_ttl_secs() -> u64 {
    3600
}

const fn default_similarity_threshold() -> f32 {
    0.8
}

const fn default_session_ttl_secs() -> u64 {
    3600
}

const fn default_session_max_capacity() -> u64 {
    10_000
}

fn default_support_contact() -> String {
    "@your_support_bot".to_string()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use agentolog::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Local overrides, not checked into git
            .add_source(File::with_name("config/local").required(false))
            // Eg.. `APP__REGISTRY_PATH=agents.xlsm ./agentolog`
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Plain UPPER_SNAKE_CASE variables; empty ones count as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        s.try_deserialize()
    }

    /// Checks that the settings describe a runnable service
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram_token.is_none() && self.webhook_bind.is_none() {
            return Err(ConfigError::Message(
                "no transport configured: set TELEGRAM_TOKEN and/or WEBHOOK_BIND".to_string(),
            ));
        }

        if self.webhook_bind.is_some() && self.webhook_token.is_none() {
            return Err(ConfigError::Message(
                "WEBHOOK_BIND is set but WEBHOOK_TOKEN is missing".to_string(),
            ));
        }

        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(ConfigError::Message(format!(
                "SIMILARITY_THRESHOLD must be in (0, 1], got {}",
                self.similarity_threshold
            )));
        }

        match self.llm_provider_kind()? {
            LlmProviderKind::GigaChat if self.gigachat_credentials().is_none() => {
                Err(ConfigError::Message(
                    "GigaChat selected but neither GIGACHAT_AUTH_KEY nor GIGACHAT_CLIENT_ID/GIGACHAT_CLIENT_SECRET is set"
                        .to_string(),
                ))
            }
            LlmProviderKind::OpenRouter if self.openrouter_api_key.is_none() => Err(
                ConfigError::Message("OpenRouter selected but OPENROUTER_API_KEY is missing".to_string()),
            ),
            _ => Ok(()),
        }
    }

    /// Resolves the configured LLM backend
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` for an unknown provider name.
    pub fn llm_provider_kind(&self) -> Result<LlmProviderKind, ConfigError> {
        match self.llm_provider.trim().to_lowercase().as_str() {
            "gigachat" => Ok(LlmProviderKind::GigaChat),
            "openrouter" | "deepseek" => Ok(LlmProviderKind::OpenRouter),
            other => Err(ConfigError::Message(format!("unknown LLM_PROVIDER: {other}"))),
        }
    }

    /// Returns the Basic credentials for `GigaChat` OAuth
    ///
    /// An explicit auth key wins; otherwise `client_id:client_secret` is encoded.
    #[must_use]
    pub fn gigachat_credentials(&self) -> Option<String> {
        if let Some(key) = self.gigachat_auth_key.as_ref().filter(|k| !k.is_empty()) {
            return Some(key.clone());
        }
        match (&self.gigachat_client_id, &self.gigachat_client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some(BASE64.encode(format!("{id}:{secret}")))
            }
            _ => None,
        }
    }
}
