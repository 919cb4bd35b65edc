use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use guestbook_service::config::Config;
use guestbook_service::{build_router, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "guestbook_service=debug,tower_http=debug".into());
    if config.logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        policy = ?config.moderation.default_status,
        "Configuration loaded successfully"
    );

    // Initialize message store
    let store = db::connect(&config.database).await?;
    store.ensure_schema().await?;
    tracing::info!("Message store ready");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = build_router(AppState::new(store, config));

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
