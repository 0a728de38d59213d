//! JSON webhook for web front-ends and the corporate messenger bridge
//!
//! ## Endpoints
//!
//! - `POST /webhook` - `{message, user_id?}` in, `{reply, buttons, files}` out
//! - `POST /gigabot` - `{from: {userId}, message: {text}}` in, `{text}` out
//! - `GET /files/*` - generated documents and the published registry
//! - `GET /health` - liveness check
//!
//! Everything except `/health` requires `Authorization: Bearer <WEBHOOK_TOKEN>`.
//! Published files are deleted by [`spawn_file_sweeper`] once they expire.

use crate::dialog::{Dialog, Reply};
use crate::documents::DocumentFactory;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};

const FILES_ROUTE: &str = "/files";
const ANONYMOUS: &str = "anonymous";

// ============================================================================
// Request/Response Types
// ============================================================================

/// User id as sent by clients: either a string or a number
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    /// `"alice"`
    Text(String),
    /// `42`
    Number(i64),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(id) => f.write_str(id),
            Self::Number(id) => write!(f, "{id}"),
        }
    }
}

/// Body of `POST /webhook`
#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    /// User text
    pub message: String,
    /// Caller-side user id; anonymous callers share one session
    pub user_id: Option<UserId>,
}

/// Response of `POST /webhook`
#[derive(Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct WebhookResponse {
    /// All text replies joined by blank lines
    pub reply: String,
    /// Keyboard rows of the last reply that carried one
    pub buttons: Vec<Vec<String>>,
    /// Download URLs of attached files
    pub files: Vec<String>,
}

/// Sender of a `POST /gigabot` message
#[derive(Debug, Deserialize)]
pub struct GigabotSender {
    /// Messenger user id
    #[serde(rename = "userId")]
    pub user_id: UserId,
}

/// Message of a `POST /gigabot` call
#[derive(Debug, Deserialize)]
pub struct GigabotMessage {
    /// User text
    pub text: String,
}

/// Body of `POST /gigabot`
#[derive(Debug, Deserialize)]
pub struct GigabotRequest {
    /// Sender
    pub from: GigabotSender,
    /// Message
    pub message: GigabotMessage,
}

/// Response of `POST /gigabot`
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GigabotResponse {
    /// Reply text with file links appended
    pub text: String,
}

// ============================================================================
// Handlers
// ============================================================================

struct WebhookState {
    dialog: Arc<Dialog>,
    token: String,
}

fn unauthorized() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(serde_json::json!({ "error": "Unauthorized" })),
    )
        .into_response()
}

fn bearer_matches(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|presented| presented.trim() == token)
}

async fn require_token(
    State(state): State<Arc<WebhookState>>,
    request: Request,
    next: Next,
) -> Response {
    if bearer_matches(request.headers(), &state.token) {
        next.run(request).await
    } else {
        warn!(path = %request.uri().path(), "Rejected webhook call without a valid token");
        unauthorized()
    }
}

/// Makes `path` downloadable under `/files` and returns its URL.
///
/// Files outside the output dir (the registry) are copied in first.
async fn publish(output_dir: &Path, path: &Path) -> std::io::Result<String> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no file name"))?;

    if path.parent() != Some(output_dir) {
        tokio::fs::create_dir_all(output_dir).await?;
        tokio::fs::copy(path, output_dir.join(&name)).await?;
    }
    Ok(format!("{FILES_ROUTE}/{name}"))
}

async fn collect(output_dir: &Path, replies: Vec<Reply>) -> WebhookResponse {
    let mut texts = Vec::new();
    let mut response = WebhookResponse::default();

    for reply in replies {
        match reply {
            Reply::Text { body, buttons } => {
                texts.push(body);
                if let Some(buttons) = buttons {
                    response.buttons = buttons;
                }
            }
            Reply::File { path, .. } => match publish(output_dir, &path).await {
                Ok(url) => response.files.push(url),
                Err(e) => error!(path = %path.display(), "Failed to publish file: {e}"),
            },
        }
    }

    response.reply = texts.join("\n\n");
    response
}

async fn webhook(
    State(state): State<Arc<WebhookState>>,
    Json(request): Json<WebhookRequest>,
) -> Json<WebhookResponse> {
    let user = request
        .user_id
        .map_or_else(|| ANONYMOUS.to_string(), |id| id.to_string());
    let replies = state
        .dialog
        .handle(&format!("web:{user}"), &request.message)
        .await;
    Json(collect(state.dialog.output_dir(), replies).await)
}

async fn gigabot(
    State(state): State<Arc<WebhookState>>,
    Json(request): Json<GigabotRequest>,
) -> Json<GigabotResponse> {
    let user = format!("giga:{}", request.from.user_id);
    let replies = state.dialog.handle(&user, &request.message.text).await;
    let collected = collect(state.dialog.output_dir(), replies).await;

    let mut text = collected.reply;
    for url in collected.files {
        text.push_str("\n📎 ");
        text.push_str(&url);
    }
    Json(GigabotResponse { text })
}

async fn health() -> &'static str {
    "OK"
}

// ============================================================================
// Router
// ============================================================================

/// Builds the webhook router around `dialog`
pub fn router(dialog: Arc<Dialog>, token: String) -> Router {
    let files_dir: PathBuf = dialog.output_dir().to_path_buf();
    let state = Arc::new(WebhookState { dialog, token });

    let api = Router::new()
        .route("/webhook", post(webhook))
        .route("/gigabot", post(gigabot))
        .nest_service(FILES_ROUTE, ServeDir::new(files_dir))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_token,
        ))
        .with_state(state);

    Router::new()
        .merge(api)
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
}

/// Deletes files in the output dir older than `ttl`, checking every `ttl / 2`
/// but no more often than once a minute.
pub fn spawn_file_sweeper(
    documents: DocumentFactory,
    ttl: Duration,
) -> tokio::task::JoinHandle<()> {
    let period = (ttl / 2).max(Duration::from_secs(60));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            if let Err(e) = documents.sweep_expired(ttl).await {
                warn!("Failed to sweep generated files: {e}");
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {e}");
    }
    info!("Shutdown signal received, stopping webhook");
}

/// Serves `router` on `bind` until ctrl-c
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(bind: &str, router: Router) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Webhook listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
