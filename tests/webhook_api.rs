mod common;

use agentolog::documents::DocumentFactory;
use agentolog::transport::webhook::{self, GigabotResponse, WebhookResponse};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{Fixture, ScriptedProvider};
use http_body_util::BodyExt;
use serde_json::json;
use std::error::Error;
use std::time::Duration;
use tower::ServiceExt;

type TestResult = Result<(), Box<dyn Error>>;

const TOKEN: &str = "s3cret";

fn app(fixture: &Fixture) -> Router {
    webhook::router(fixture.dialog(ScriptedProvider::new(&[])), TOKEN.to_string())
}

fn post(uri: &str, token: Option<&str>, payload: &serde_json::Value) -> Result<Request<Body>, Box<dyn Error>> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    Ok(builder.body(Body::from(payload.to_string()))?)
}

fn get(uri: &str, token: Option<&str>) -> Result<Request<Body>, Box<dyn Error>> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    Ok(builder.body(Body::empty())?)
}

async fn body_bytes(resp: axum::response::Response) -> Result<Vec<u8>, Box<dyn Error>> {
    Ok(resp.into_body().collect().await?.to_bytes().to_vec())
}

#[tokio::test]
async fn post_routes_require_bearer_token() -> TestResult {
    let fixture = Fixture::new()?;
    let payload = json!({ "message": "/start" });

    for token in [None, Some("wrong")] {
        let resp = app(&fixture).oneshot(post("/webhook", token, &payload)?).await?;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let error: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await?)?;
        assert_eq!(error, json!({ "error": "Unauthorized" }));
    }

    let giga = json!({ "from": { "userId": 1 }, "message": { "text": "/start" } });
    let resp = app(&fixture).oneshot(post("/gigabot", None, &giga)?).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn health_is_public() -> TestResult {
    let fixture = Fixture::new()?;
    let resp = app(&fixture).oneshot(get("/health", None)?).await?;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await?, b"OK");
    Ok(())
}

#[tokio::test]
async fn webhook_replies_with_text_and_buttons() -> TestResult {
    let fixture = Fixture::new()?;
    let payload = json!({ "message": "/start", "user_id": 5 });
    let resp = app(&fixture)
        .oneshot(post("/webhook", Some(TOKEN), &payload)?)
        .await?;

    assert_eq!(resp.status(), StatusCode::OK);
    let reply: WebhookResponse = serde_json::from_slice(&body_bytes(resp).await?)?;
    assert!(reply.reply.contains("Агентолог"));
    assert_eq!(reply.buttons.len(), 4);
    assert!(reply.files.is_empty());
    Ok(())
}

#[tokio::test]
async fn generated_files_are_downloadable() -> TestResult {
    let fixture = Fixture::new()?;
    let router = app(&fixture);
    let payload = json!({ "message": "заполнено: Название=Сверка, Масштаб процесса=Банк" });

    let resp = router
        .clone()
        .oneshot(post("/webhook", Some(TOKEN), &payload)?)
        .await?;
    let reply: WebhookResponse = serde_json::from_slice(&body_bytes(resp).await?)?;
    assert_eq!(reply.files.len(), 2);
    assert!(reply.files.iter().all(|url| url.starts_with("/files/")));

    let download = router
        .oneshot(get(&reply.files[0], Some(TOKEN))?)
        .await?;
    assert_eq!(download.status(), StatusCode::OK);
    // docx is a zip archive
    assert!(body_bytes(download).await?.starts_with(b"PK"));
    Ok(())
}

#[tokio::test]
async fn published_files_require_bearer_token() -> TestResult {
    let fixture = Fixture::new()?;
    let router = app(&fixture);
    let resp = router
        .clone()
        .oneshot(post("/webhook", Some(TOKEN), &json!({ "message": "Все агенты (Excel)" }))?)
        .await?;
    let reply: WebhookResponse = serde_json::from_slice(&body_bytes(resp).await?)?;
    assert_eq!(reply.files, vec!["/files/agents.xlsx".to_string()]);

    for token in [None, Some("wrong")] {
        let resp = router.clone().oneshot(get("/files/agents.xlsx", token)?).await?;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
    let resp = router.oneshot(get("/files/agents.xlsx", Some(TOKEN))?).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn sweeper_deletes_expired_files() -> TestResult {
    let fixture = Fixture::new()?;
    let stale = fixture.settings.output_dir.join("template_old.docx");
    tokio::fs::create_dir_all(&fixture.settings.output_dir).await?;
    tokio::fs::write(&stale, b"PK").await?;

    let sweeper = webhook::spawn_file_sweeper(
        DocumentFactory::new(fixture.settings.output_dir.clone()),
        Duration::ZERO,
    );
    // The first sweep runs right away
    let gone = tokio::time::timeout(Duration::from_secs(5), async {
        while stale.exists() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    sweeper.abort();

    assert!(gone.is_ok(), "expired file was not removed");
    Ok(())
}

#[tokio::test]
async fn gigabot_replies_with_text() -> TestResult {
    let fixture = Fixture::new()?;
    let payload = json!({ "from": { "userId": "u-1" }, "message": { "text": "привет" } });
    let resp = app(&fixture)
        .oneshot(post("/gigabot", Some(TOKEN), &payload)?)
        .await?;

    assert_eq!(resp.status(), StatusCode::OK);
    let reply: GigabotResponse = serde_json::from_slice(&body_bytes(resp).await?)?;
    assert!(reply.text.contains("Агентолог"));
    Ok(())
}

#[tokio::test]
async fn malformed_body_is_rejected() -> TestResult {
    let fixture = Fixture::new()?;
    let resp = app(&fixture)
        .oneshot(post("/webhook", Some(TOKEN), &json!({ "text": "no message field" }))?)
        .await?;

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}
