//! Herald API server binary entrypoint.

use std::net::SocketAddr;
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use herald_channels::ChannelSenders;
use herald_common::config::AppConfig;
use herald_common::db::create_pool;
use herald_engine::dispatch::DispatchEngine;
use herald_engine::retry::RetryCoordinator;

use herald_api::routes::create_router;
use herald_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("herald_api=debug,herald_engine=debug,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting Herald API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Create database connection pool
    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    tracing::info!("Database pool created");

    // Wire channel senders once; real adapters where credentials are
    // configured, local no-op senders otherwise.
    let senders = ChannelSenders::from_config(&config);

    let engine = DispatchEngine::new(pool.clone(), senders.clone(), config.dispatch_concurrency);
    let retry = RetryCoordinator::new(pool.clone(), senders);

    // Background retry sweep
    tokio::spawn(retry.clone().run(
        Duration::from_secs(config.retry_interval_secs),
        config.retry_max_attempts,
    ));

    // Build application state
    let state = AppState::new(pool, engine, retry, config);

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
