use agentolog::config::Settings;
use agentolog::dialog::Dialog;
use agentolog::documents::DocumentFactory;
use agentolog::llm::LlmClient;
use agentolog::logging::{self, RedactionPatterns};
use agentolog::transport::{telegram, webhook};
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Initialize redaction patterns early (before logging)
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);
    logging::init(patterns);

    info!("Starting Агентолог...");

    let settings = init_settings();

    let llm = match LlmClient::new(&settings) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to initialize LLM client: {e}");
            std::process::exit(1);
        }
    };
    info!(model = llm.model_id(), "LLM client initialized.");

    if let Err(e) = tokio::fs::create_dir_all(&settings.output_dir).await {
        error!(dir = %settings.output_dir.display(), "Cannot create output directory: {e}");
        std::process::exit(1);
    }

    let dialog = Arc::new(Dialog::new(&settings, llm));

    let telegram = async {
        if let Some(token) = settings.telegram_token.clone() {
            telegram::run(token, Arc::clone(&dialog)).await;
        }
    };
    let web = async {
        if let (Some(bind), Some(token)) = (&settings.webhook_bind, &settings.webhook_token) {
            let sweeper = webhook::spawn_file_sweeper(
                DocumentFactory::new(settings.output_dir.clone()),
                Duration::from_secs(settings.generated_file_ttl_secs),
            );
            let router = webhook::router(Arc::clone(&dialog), token.clone());
            if let Err(e) = webhook::serve(bind, router).await {
                error!("Webhook server error: {e:#}");
            }
            sweeper.abort();
        }
    };
    tokio::join!(telegram, web);

    info!("Агентолог stopped.");
    Ok(())
}

fn init_settings() -> Settings {
    let settings = match Settings::new() {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = settings.validate() {
        error!("Invalid configuration: {e}");
        std::process::exit(1);
    }
    info!("Configuration loaded successfully.");
    settings
}
