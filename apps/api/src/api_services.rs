use std::sync::Arc;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::warn;
use warrant_application::{AuthorizationService, EntityStore, PermissionCache, PermissionGate};
use warrant_core::AppError;
use warrant_infrastructure::{InMemoryEntityStore, PostgresEntityStore};

use crate::api_config::ApiConfig;
use crate::state::AppState;

pub async fn connect_and_migrate(database_url: &str) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    Ok(pool)
}

/// Picks PostgreSQL when a pool is available, otherwise a process-local store.
pub fn build_entity_store(pool: Option<PgPool>) -> Arc<dyn EntityStore> {
    match pool {
        Some(pool) => Arc::new(PostgresEntityStore::new(pool)),
        None => {
            warn!("DATABASE_URL is not set; authorization data is kept in memory only");
            Arc::new(InMemoryEntityStore::new())
        }
    }
}

pub fn build_app_state(
    entity_store: Arc<dyn EntityStore>,
    config: &ApiConfig,
) -> Result<AppState, AppError> {
    let authorization_service = AuthorizationService::new(
        entity_store,
        Arc::new(PermissionCache::new()),
        &config.authorization,
    )?;
    let permission_gate = PermissionGate::new(authorization_service.clone());

    Ok(AppState {
        authorization_service,
        permission_gate,
        admin_permission: config.admin_permission.clone(),
    })
}
