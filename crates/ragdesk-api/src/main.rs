use std::sync::Arc;

use ragdesk_api::{bootstrap, build_router, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    bootstrap::init_logging(&config);

    tracing::info!("Starting Ragdesk API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(bootstrap::build_state(config).await?);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("API docs: http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
