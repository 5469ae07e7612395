//! Warrant authorization API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod bootstrap;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use tracing::info;
use warrant_core::AppError;

use crate::api_config::{ApiConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let pool = match config.database_url.as_deref() {
        Some(database_url) => Some(api_services::connect_and_migrate(database_url).await?),
        None => None,
    };

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let entity_store = api_services::build_entity_store(pool);
    let app_state = api_services::build_app_state(entity_store, &config)?;

    if let Some(identity) = config.bootstrap_admin.as_ref() {
        bootstrap::grant_bootstrap_admin(&app_state, identity).await?;
    }

    let app = api_router::build_router(app_state, config.cors_origin.as_deref())?;

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind {address}: {error}")))?;

    info!(%address, "warrant api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("server error: {error}")))
}
