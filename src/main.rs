use anyhow::Result;
use dialogue_summarizer::{config::Config, state::AppState, web};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dialogue_summarizer=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("🚀 Starting Dialogue Summarizer");

    // Load configuration
    let config = Config::from_env()?;

    // Create application state (loads the model or falls back to the stub)
    let app_state = AppState::new(config).await?;

    // Start web server
    web::start_server(app_state).await?;

    Ok(())
}
