//! Shared application state for the Axum API server.

use sqlx::PgPool;

use herald_common::config::AppConfig;
use herald_engine::dispatch::DispatchEngine;
use herald_engine::retry::RetryCoordinator;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub engine: DispatchEngine,
    pub retry: RetryCoordinator,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        engine: DispatchEngine,
        retry: RetryCoordinator,
        config: AppConfig,
    ) -> Self {
        Self {
            pool,
            engine,
            retry,
            config,
        }
    }
}
