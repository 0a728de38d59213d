//! HTTP utilities for LLM providers
//!
//! Common request/response handling so providers only deal with payloads.

use crate::llm::LlmError;
use reqwest::{Client as HttpClient, RequestBuilder, Response, StatusCode};
use serde_json::Value;

const MAX_ERROR_BODY_CHARS: usize = 500;

/// Sends a POST request with a JSON body and returns the parsed JSON response.
///
/// # Errors
///
/// Returns `LlmError::NetworkError` on connectivity issues, `LlmError::RateLimit` on 429,
/// `LlmError::Http` on other non-success status codes, or `LlmError::JsonError`
/// if parsing fails.
pub async fn send_json_request(
    client: &HttpClient,
    url: &str,
    body: &Value,
    auth_header: Option<&str>,
    extra_headers: &[(&str, &str)],
) -> Result<Value, LlmError> {
    let request = with_headers(client.post(url).json(body), auth_header, extra_headers);
    send(request).await
}

/// Sends a POST request with a form-encoded body and returns the parsed JSON response.
///
/// # Errors
///
/// Same as [`send_json_request`].
pub async fn send_form_request(
    client: &HttpClient,
    url: &str,
    form: &[(&str, &str)],
    auth_header: Option<&str>,
    extra_headers: &[(&str, &str)],
) -> Result<Value, LlmError> {
    let request = with_headers(client.post(url).form(form), auth_header, extra_headers);
    send(request).await
}

fn with_headers(
    mut request: RequestBuilder,
    auth_header: Option<&str>,
    extra_headers: &[(&str, &str)],
) -> RequestBuilder {
    if let Some(auth) = auth_header {
        request = request.header("Authorization", auth);
    }
    for (key, value) in extra_headers {
        request = request.header(*key, *value);
    }
    request
}

async fn send(request: RequestBuilder) -> Result<Value, LlmError> {
    let response = request
        .send()
        .await
        .map_err(|e| LlmError::NetworkError(e.to_string()))?;

    read_json_response(response).await
}

async fn read_json_response(response: Response) -> Result<Value, LlmError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| LlmError::JsonError(e.to_string()));
    }

    let wait_secs = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();
    let message = describe_error(status, &body);

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(LlmError::RateLimit { wait_secs, message });
    }
    Err(LlmError::Http {
        status: status.as_u16(),
        message,
    })
}

/// Builds a readable error message; HTML error pages from proxies are not echoed back.
#[must_use]
pub fn describe_error(status: StatusCode, body: &str) -> String {
    let trimmed = body.trim_start();
    let is_html = trimmed.starts_with("<!DOCTYPE")
        || trimmed.starts_with("<html")
        || trimmed.starts_with("<HTML");

    if is_html {
        return format!("API error: {status} (Server returned HTML error page)");
    }

    if body.chars().count() > MAX_ERROR_BODY_CHARS {
        let truncated: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("API error: {status} - {truncated}... (truncated)")
    } else {
        format!("API error: {status} - {body}")
    }
}

/// Extracts text content from a JSON response by navigating a path.
///
/// # Example
/// ```
/// use agentolog::llm::http_utils::extract_text_content;
/// let json = serde_json::json!({"choices": [{"message": {"content": "Уникальна"}}]});
/// let content = extract_text_content(&json, &["choices", "0", "message", "content"]);
/// assert_eq!(content.ok().as_deref(), Some("Уникальна"));
/// ```
///
/// # Errors
///
/// Returns `LlmError::ApiError` if the path is invalid or the target is not a string.
pub fn extract_text_content(response: &Value, path: &[&str]) -> Result<String, LlmError> {
    let mut current = response;

    for segment in path {
        if let Ok(index) = segment.parse::<usize>() {
            current = current.get(index).ok_or_else(|| {
                LlmError::ApiError(format!("Invalid path: missing index {index}"))
            })?;
        } else {
            current = current.get(*segment).ok_or_else(|| {
                LlmError::ApiError(format!("Invalid path: missing key {segment}"))
            })?;
        }
    }

    current
        .as_str()
        .map(ToString::to_string)
        .ok_or_else(|| LlmError::ApiError(format!("Expected string at path, got: {current:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_missing_path() {
        let response = json!({"choices": []});
        let result = extract_text_content(&response, &["choices", "0", "message", "content"]);
        assert!(matches!(result, Err(LlmError::ApiError(_))));
    }

    #[test]
    fn test_extract_non_string() {
        let response = json!({"choices": [{"message": {"content": null}}]});
        let result = extract_text_content(&response, &["choices", "0", "message", "content"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_describe_error_hides_html() {
        let msg = describe_error(StatusCode::BAD_GATEWAY, "<html><body>nginx</body></html>");
        assert!(msg.contains("502"));
        assert!(!msg.contains("nginx"));
    }

    #[test]
    fn test_describe_error_truncates_on_char_boundary() {
        let body = "ошибка ".repeat(200);
        let msg = describe_error(StatusCode::BAD_REQUEST, &body);
        assert!(msg.ends_with("... (truncated)"));
        assert!(msg.contains("400"));
    }
}
