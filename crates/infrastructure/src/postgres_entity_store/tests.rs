use std::sync::Arc;

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use warrant_application::EntityStore;
use warrant_core::{AppError, Principal, TenantId};
use warrant_domain::{GuardName, RoleId};

use super::PostgresEntityStore;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(4)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres entity store tests: {error}");
    }

    Some(pool)
}

fn web_guard() -> GuardName {
    GuardName::new("web").unwrap_or_else(|_| unreachable!())
}

fn principal(principal_id: &str) -> Principal {
    Principal::new("user", principal_id).unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn duplicate_role_is_rejected_by_unique_constraint() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let store = PostgresEntityStore::new(pool);
    let tenant_id = TenantId::new();

    let first = store.create_role(tenant_id, "editor", &web_guard()).await;
    assert!(first.is_ok());

    let duplicate = store.create_role(tenant_id, "editor", &web_guard()).await;
    assert!(matches!(duplicate, Err(AppError::AlreadyExists(_))));

    let listed = store.list_roles(tenant_id, None).await;
    assert_eq!(listed.unwrap_or_default().len(), 1);
}

#[tokio::test]
async fn padded_role_name_hits_unique_constraint() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let store = PostgresEntityStore::new(pool);
    let tenant_id = TenantId::new();

    let role = store
        .create_role(tenant_id, "editor", &web_guard())
        .await
        .unwrap_or_else(|_| unreachable!());

    let padded = store.create_role(tenant_id, " editor ", &web_guard()).await;
    assert!(matches!(padded, Err(AppError::AlreadyExists(_))));
    assert!(matches!(
        store.find_or_create_role(tenant_id, "editor ", &web_guard()).await,
        Ok(ref found) if found.id() == role.id()
    ));

    let blank = store.create_permission(tenant_id, "  ", &web_guard()).await;
    assert!(matches!(blank, Err(AppError::Validation(_))));
    assert_eq!(
        store
            .list_roles(tenant_id, None)
            .await
            .unwrap_or_default()
            .len(),
        1
    );
}

#[tokio::test]
async fn concurrent_find_or_create_returns_one_row() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let store = Arc::new(PostgresEntityStore::new(pool));
    let tenant_id = TenantId::new();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .find_or_create_permission(tenant_id, "posts.edit", &web_guard())
                    .await
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        let result = handle.await.unwrap_or_else(|_| unreachable!());
        assert!(result.is_ok());
        ids.push(
            result
                .map(|permission| permission.id())
                .unwrap_or_else(|_| unreachable!()),
        );
    }
    ids.dedup();

    assert_eq!(ids.len(), 1);
    assert_eq!(
        store
            .list_permissions(tenant_id, None)
            .await
            .unwrap_or_default()
            .len(),
        1
    );
}

#[tokio::test]
async fn records_are_isolated_per_tenant() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let store = PostgresEntityStore::new(pool);
    let left_tenant = TenantId::new();
    let right_tenant = TenantId::new();

    let role = store
        .create_role(left_tenant, "editor", &web_guard())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert!(matches!(
        store.find_role_by_id(right_tenant, role.id()).await,
        Ok(None)
    ));
    assert!(
        store
            .list_roles(right_tenant, None)
            .await
            .unwrap_or_default()
            .is_empty()
    );

    let cross_tenant_assignment = store
        .assign_role_to_principal(right_tenant, &principal("bob"), role.id())
        .await;
    assert!(matches!(
        cross_tenant_assignment,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn deleting_role_cascades_to_assignments() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let store = PostgresEntityStore::new(pool);
    let tenant_id = TenantId::new();
    let alice = principal("alice");

    let role = store
        .create_role(tenant_id, "editor", &web_guard())
        .await
        .unwrap_or_else(|_| unreachable!());
    let permission = store
        .create_permission(tenant_id, "posts.edit", &web_guard())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert!(
        store
            .attach_permissions_to_role(tenant_id, role.id(), &[permission.id()])
            .await
            .is_ok()
    );
    assert!(
        store
            .assign_role_to_principal(tenant_id, &alice, role.id())
            .await
            .is_ok()
    );

    let catalog = store
        .load_catalog(tenant_id, &web_guard())
        .await
        .unwrap_or_default();
    assert_eq!(catalog.role_permissions, vec![(role.id(), permission.id())]);

    assert!(store.delete_role(tenant_id, role.id()).await.is_ok());

    assert!(
        store
            .list_principal_role_ids(tenant_id, &alice)
            .await
            .unwrap_or_default()
            .is_empty()
    );
    let catalog = store
        .load_catalog(tenant_id, &web_guard())
        .await
        .unwrap_or_default();
    assert!(catalog.roles.is_empty());
    assert!(catalog.role_permissions.is_empty());
    assert_eq!(catalog.permissions.len(), 1);

    let missing = store.delete_role(tenant_id, role.id()).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn replace_principal_roles_is_atomic() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let store = PostgresEntityStore::new(pool);
    let tenant_id = TenantId::new();
    let alice = principal("alice");

    let editor = store
        .create_role(tenant_id, "editor", &web_guard())
        .await
        .unwrap_or_else(|_| unreachable!());
    let viewer = store
        .create_role(tenant_id, "viewer", &web_guard())
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(
        store
            .assign_role_to_principal(tenant_id, &alice, editor.id())
            .await
            .is_ok()
    );

    let failed = store
        .replace_principal_roles(tenant_id, &alice, &[viewer.id(), RoleId::new(i64::MAX)])
        .await;
    assert!(matches!(failed, Err(AppError::NotFound(_))));
    assert_eq!(
        store
            .list_principal_role_ids(tenant_id, &alice)
            .await
            .unwrap_or_default(),
        vec![editor.id()]
    );

    assert!(
        store
            .replace_principal_roles(tenant_id, &alice, &[viewer.id()])
            .await
            .is_ok()
    );
    assert_eq!(
        store
            .list_principal_role_ids(tenant_id, &alice)
            .await
            .unwrap_or_default(),
        vec![viewer.id()]
    );

    let holders = store.list_principals_with_role(tenant_id, viewer.id()).await;
    assert_eq!(holders.unwrap_or_default(), vec![alice]);
}
