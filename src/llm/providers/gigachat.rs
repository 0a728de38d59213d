//! Sber `GigaChat` provider
//!
//! Authenticates with OAuth client credentials and caches the access token
//! until shortly before it expires.

use crate::config::Settings;
use crate::llm::http_utils::{extract_text_content, send_form_request, send_json_request};
use crate::llm::{build_messages, LlmError, LlmProvider, Message};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::{Certificate, Client as HttpClient, Identity};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Tokens are refreshed this long before their reported expiry
const EXPIRY_MARGIN_SECS: i64 = 60;
/// Lifetime assumed when the OAuth response carries no expiry
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 30 * 60;

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - TimeDelta::seconds(EXPIRY_MARGIN_SECS) > now
    }
}

/// OAuth response; the public API reports `expires_at` in epoch milliseconds,
/// some gateways report `expires_in` seconds instead.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
}

impl TokenResponse {
    fn into_token(self, now: DateTime<Utc>) -> AccessToken {
        let expires_at = self
            .expires_at
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .or_else(|| {
                self.expires_in
                    .and_then(TimeDelta::try_seconds)
                    .map(|ttl| now + ttl)
            })
            .unwrap_or_else(|| now + TimeDelta::seconds(DEFAULT_TOKEN_LIFETIME_SECS));

        AccessToken {
            value: self.access_token,
            expires_at,
        }
    }
}

/// Provider for the `GigaChat` chat completions API
pub struct GigaChatProvider {
    http: HttpClient,
    credentials: String,
    scope: String,
    token_url: String,
    api_url: String,
    token: Mutex<Option<AccessToken>>,
}

impl GigaChatProvider {
    /// Creates the provider from settings
    ///
    /// # Errors
    ///
    /// Returns `LlmError::MissingConfig` if credentials are absent or the TLS
    /// material cannot be loaded.
    pub fn new(settings: &Settings) -> Result<Self, LlmError> {
        let credentials = settings
            .gigachat_credentials()
            .ok_or_else(|| LlmError::MissingConfig("gigachat".to_string()))?;

        Ok(Self {
            http: build_http_client(settings)?,
            credentials,
            scope: settings.gigachat_scope.clone(),
            token_url: settings.gigachat_token_url.clone(),
            api_url: settings.gigachat_api_url.clone(),
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, LlmError> {
        let mut cached = self.token.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        let rq_uid = Uuid::new_v4().to_string();
        let auth = format!("Basic {}", self.credentials);
        let response = send_form_request(
            &self.http,
            &self.token_url,
            &[("scope", self.scope.as_str())],
            Some(&auth),
            &[("RqUID", rq_uid.as_str()), ("Accept", "application/json")],
        )
        .await?;

        let token = serde_json::from_value::<TokenResponse>(response)
            .map_err(|e| LlmError::JsonError(e.to_string()))?
            .into_token(now);
        info!(expires_at = %token.expires_at, "GigaChat access token refreshed");

        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>, LlmError> {
    std::fs::read(path)
        .map_err(|e| LlmError::MissingConfig(format!("cannot read {}: {e}", path.display())))
}

fn build_http_client(settings: &Settings) -> Result<HttpClient, LlmError> {
    let mut builder =
        HttpClient::builder().timeout(Duration::from_secs(settings.llm_http_timeout_secs));

    if let (Some(cert), Some(key)) = (&settings.gigachat_cert, &settings.gigachat_key) {
        let mut pem = read_pem(cert)?;
        pem.push(b'\n');
        pem.extend(read_pem(key)?);
        let identity =
            Identity::from_pem(&pem).map_err(|e| LlmError::MissingConfig(e.to_string()))?;
        builder = builder.identity(identity);
    }

    if let Some(ca) = &settings.gigachat_ca {
        let certificate = Certificate::from_pem(&read_pem(ca)?)
            .map_err(|e| LlmError::MissingConfig(e.to_string()))?;
        builder = builder.add_root_certificate(certificate);
    }

    if !settings.gigachat_verify_ssl {
        warn!("GigaChat TLS certificate verification is disabled");
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder
        .build()
        .map_err(|e| LlmError::MissingConfig(e.to_string()))
}

#[async_trait]
impl LlmProvider for GigaChatProvider {
    async fn chat_completion(
        &self,
        system_prompt: &str,
        history: &[Message],
        user_message: &str,
        model_id: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let body = json!({
            "model": model_id,
            "messages": build_messages(system_prompt, history, user_message),
            "max_tokens": max_tokens,
            "profanity_check": false,
        });

        let token = self.access_token().await?;
        let auth = format!("Bearer {token}");
        let response = match send_json_request(
            &self.http,
            &self.api_url,
            &body,
            Some(&auth),
            &[("Accept", "application/json")],
        )
        .await
        {
            Ok(response) => response,
            Err(LlmError::Http { status: 401, message }) => {
                // Revoked before expiry; the next attempt fetches a new one.
                self.invalidate_token().await;
                return Err(LlmError::NetworkError(message));
            }
            Err(e) => return Err(e),
        };

        extract_text_content(&response, &["choices", "0", "message", "content"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<TokenResponse, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[test]
    fn test_expires_at_millis() -> Result<(), serde_json::Error> {
        let now = Utc::now();
        let expires_ms = (now + TimeDelta::minutes(30)).timestamp_millis();
        let token = parse(json!({"access_token": "tok", "expires_at": expires_ms}))?.into_token(now);

        assert_eq!(token.value, "tok");
        assert_eq!(token.expires_at.timestamp_millis(), expires_ms);
        assert!(token.is_fresh(now));
        Ok(())
    }

    #[test]
    fn test_expires_in_seconds() -> Result<(), serde_json::Error> {
        let now = Utc::now();
        let token = parse(json!({"access_token": "tok", "expires_in": 1800}))?.into_token(now);
        assert_eq!(token.expires_at, now + TimeDelta::seconds(1800));
        Ok(())
    }

    #[test]
    fn test_token_inside_margin_is_stale() -> Result<(), serde_json::Error> {
        let now = Utc::now();
        let token = parse(json!({"access_token": "tok", "expires_in": 30}))?.into_token(now);
        assert!(!token.is_fresh(now));
        Ok(())
    }

    #[test]
    fn test_missing_expiry_uses_default() -> Result<(), serde_json::Error> {
        let now = Utc::now();
        let token = parse(json!({"access_token": "tok"}))?.into_token(now);
        assert_eq!(
            token.expires_at,
            now + TimeDelta::seconds(DEFAULT_TOKEN_LIFETIME_SECS)
        );
        Ok(())
    }
}
