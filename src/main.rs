//! BananaKart backend server.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bananakart::config::Config;
use bananakart::db::{self, Repository};
use bananakart::sourcing::SupplierCatalog;
use bananakart::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting BananaKart backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Data directory: {:?}", config.data_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (BANANAKART_API_PSK). Authentication is disabled!");
    }
    if config.generator.hf_api_token.is_none() {
        tracing::warn!("HF_API_TOKEN not set; /analyze_or_generate can only parse recipes");
    }
    if config.gemini.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY not set; /llm_recipe will use the fallback recipe");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Load supplier datasets
    let catalog = SupplierCatalog::load(&config.data_dir)?;
    tracing::info!(
        "Loaded {} farmers markets and {} big-box stores",
        catalog.market_count(),
        catalog.store_count()
    );

    let bind_addr = config.bind_addr;
    let state = AppState::new(config, repo, catalog);
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
