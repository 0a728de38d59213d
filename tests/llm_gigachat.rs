use agentolog::config::Settings;
use agentolog::llm::{LlmClient, LlmError};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum::Router;
use serde_json::json;
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type TestResult = Result<(), Box<dyn Error>>;

#[derive(Default)]
struct MockGigaChat {
    token_requests: AtomicUsize,
    chat_requests: AtomicUsize,
    /// How many leading chat calls answer 401
    reject_first: usize,
    /// Answer every chat call with 400 and a body full of digits
    bad_request: bool,
}

async fn oauth(State(mock): State<Arc<MockGigaChat>>, headers: HeaderMap, body: String) -> Response {
    let basic = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Basic "));
    if !basic || !body.contains("scope=GIGACHAT_API_PERS") || !headers.contains_key("rquid") {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let n = mock.token_requests.fetch_add(1, Ordering::SeqCst) + 1;
    let expires_at = chrono::Utc::now().timestamp_millis() + 30 * 60 * 1000;
    Json(json!({ "access_token": format!("tok-{n}"), "expires_at": expires_at })).into_response()
}

async fn chat(State(mock): State<Arc<MockGigaChat>>, headers: HeaderMap) -> Response {
    let n = mock.chat_requests.fetch_add(1, Ordering::SeqCst);
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer tok-"));
    if mock.bad_request {
        return (StatusCode::BAD_REQUEST, "max_tokens 5000 exceeds 4010, code 401").into_response();
    }
    if !bearer || n < mock.reject_first {
        return (StatusCode::UNAUTHORIZED, "token expired").into_response();
    }
    Json(json!({
        "choices": [{ "message": { "role": "assistant", "content": "Идея уникальна." } }]
    }))
    .into_response()
}

async fn spawn_mock(mock: Arc<MockGigaChat>) -> Result<String, Box<dyn Error>> {
    let app = Router::new()
        .route("/oauth", post(oauth))
        .route("/chat", post(chat))
        .with_state(mock);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let base = format!("http://{}", listener.local_addr()?);
    tokio::spawn(async move { axum::serve(listener, app).await });
    Ok(base)
}

fn settings(base: &str, retries: usize) -> Result<Settings, serde_json::Error> {
    serde_json::from_value(json!({
        "llm_provider": "gigachat",
        "gigachat_auth_key": "Y2xpZW50OnNlY3JldA==",
        "gigachat_token_url": format!("{base}/oauth"),
        "gigachat_api_url": format!("{base}/chat"),
        "llm_max_retries": retries,
        "llm_http_timeout_secs": 5,
    }))
}

#[tokio::test]
async fn token_is_cached_between_calls() -> TestResult {
    let mock = Arc::new(MockGigaChat::default());
    let base = spawn_mock(Arc::clone(&mock)).await?;
    let client = LlmClient::new(&settings(&base, 0)?)?;

    assert_eq!(client.chat("system", "первая идея").await?, "Идея уникальна.");
    assert_eq!(client.complete("вторая идея").await?, "Идея уникальна.");

    assert_eq!(mock.token_requests.load(Ordering::SeqCst), 1);
    assert_eq!(mock.chat_requests.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn rejected_token_is_refreshed_and_retried() -> TestResult {
    let mock = Arc::new(MockGigaChat {
        reject_first: 1,
        ..MockGigaChat::default()
    });
    let base = spawn_mock(Arc::clone(&mock)).await?;
    let client = LlmClient::new(&settings(&base, 1)?)?;

    assert_eq!(client.complete("идея").await?, "Идея уникальна.");
    assert_eq!(mock.token_requests.load(Ordering::SeqCst), 2);
    assert_eq!(mock.chat_requests.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn rejected_token_without_retries_fails() -> TestResult {
    let mock = Arc::new(MockGigaChat {
        reject_first: usize::MAX,
        ..MockGigaChat::default()
    });
    let base = spawn_mock(Arc::clone(&mock)).await?;
    let client = LlmClient::new(&settings(&base, 0)?)?;

    assert!(client.complete("идея").await.is_err());
    assert_eq!(mock.chat_requests.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn client_errors_are_not_retried_even_with_status_digits_in_body() -> TestResult {
    let mock = Arc::new(MockGigaChat {
        bad_request: true,
        ..MockGigaChat::default()
    });
    let base = spawn_mock(Arc::clone(&mock)).await?;
    let client = LlmClient::new(&settings(&base, 2)?)?;

    let err = client.complete("идея").await.err().ok_or("expected an error")?;
    assert!(matches!(err, LlmError::Http { status: 400, .. }), "{err:?}");
    assert_eq!(mock.chat_requests.load(Ordering::SeqCst), 1);
    assert_eq!(mock.token_requests.load(Ordering::SeqCst), 1);
    Ok(())
}
