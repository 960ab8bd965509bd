//! relsearch HTTP/JSON gateway binary.

use anyhow::Context;
use clap::Parser;
use relsearch_core::{SearchConfig, Searcher};
use relsearch_gateway::{create_router, AppState, Args, GatewayConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Parse command line args
    let args = Args::parse();
    let config = GatewayConfig::from(&args);

    info!(
        listen = %config.listen_addr,
        search_config = %config.search_config.display(),
        "Starting relsearch gateway"
    );

    let search_config = SearchConfig::from_path(&config.search_config).with_context(|| {
        format!("failed to load {}", config.search_config.display())
    })?;
    let searcher = Searcher::from_config(&search_config)?;
    info!(
        entities = searcher.list_entities().len(),
        definitions = searcher.registry().entity_count(),
        hidden_field_policy = ?searcher.options().hidden_field_policy,
        "Search registry loaded"
    );

    // Create application state
    let state = AppState::new(searcher, config.clone());

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Gateway listening on {}", config.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
