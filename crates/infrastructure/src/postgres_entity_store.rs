use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use warrant_application::{EntityStore, ScopeCatalog};
use warrant_core::{AppError, AppResult, Principal, TenantId};
use warrant_domain::{GuardName, Permission, PermissionId, Role, RoleId};

mod assignments;
mod permissions;
mod roles;

#[cfg(test)]
mod tests;

/// PostgreSQL-backed entity store.
///
/// Uniqueness of (tenant, guard, name) and assignment cascades are enforced
/// by the schema in `crates/infrastructure/migrations`.
#[derive(Clone)]
pub struct PostgresEntityStore {
    pool: PgPool,
}

impl PostgresEntityStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: i64,
    tenant_id: Uuid,
    name: String,
    guard_name: String,
    created_at: DateTime<Utc>,
}

impl RoleRow {
    fn into_role(self) -> AppResult<Role> {
        let guard_name = GuardName::new(self.guard_name.as_str()).map_err(|error| {
            AppError::Internal(format!(
                "invalid stored guard '{}' for role #{}: {error}",
                self.guard_name, self.id
            ))
        })?;

        let id = self.id;
        Role::new(
            RoleId::new(id),
            TenantId::from_uuid(self.tenant_id),
            self.name,
            guard_name,
            self.created_at,
        )
        .map_err(|error| AppError::Internal(format!("invalid stored role #{id}: {error}")))
    }
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: i64,
    tenant_id: Uuid,
    name: String,
    guard_name: String,
    created_at: DateTime<Utc>,
}

impl PermissionRow {
    fn into_permission(self) -> AppResult<Permission> {
        let guard_name = GuardName::new(self.guard_name.as_str()).map_err(|error| {
            AppError::Internal(format!(
                "invalid stored guard '{}' for permission #{}: {error}",
                self.guard_name, self.id
            ))
        })?;

        let id = self.id;
        Permission::new(
            PermissionId::new(id),
            TenantId::from_uuid(self.tenant_id),
            self.name,
            guard_name,
            self.created_at,
        )
        .map_err(|error| AppError::Internal(format!("invalid stored permission #{id}: {error}")))
    }
}

#[derive(Debug, FromRow)]
struct PrincipalRow {
    principal_type: String,
    principal_id: String,
}

/// Maps unique-violation and foreign-key failures to domain errors.
fn map_write_error(error: sqlx::Error, subject: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error {
        match database_error.code().as_deref() {
            Some("23505") => return AppError::AlreadyExists(format!("{subject} already exists")),
            Some("23503") => {
                return AppError::NotFound(format!("{subject} references a missing record"));
            }
            _ => {}
        }
    }

    AppError::Internal(format!("failed to write {subject}: {error}"))
}

/// Trims a record name before it reaches a uniqueness check or an insert.
fn normalized_name(name: &str) -> AppResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name must not be empty".to_owned()));
    }

    Ok(name)
}

fn role_id_values(role_ids: &[RoleId]) -> Vec<i64> {
    role_ids.iter().map(|role_id| role_id.as_i64()).collect()
}

fn permission_id_values(permission_ids: &[PermissionId]) -> Vec<i64> {
    permission_ids
        .iter()
        .map(|permission_id| permission_id.as_i64())
        .collect()
}

#[async_trait]
impl EntityStore for PostgresEntityStore {
    async fn create_role(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Role> {
        self.create_role_impl(tenant_id, name, guard_name).await
    }

    async fn find_or_create_role(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Role> {
        self.find_or_create_role_impl(tenant_id, name, guard_name)
            .await
    }

    async fn find_role_by_name(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Option<Role>> {
        self.find_role_by_name_impl(tenant_id, name, guard_name)
            .await
    }

    async fn find_role_by_id(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> AppResult<Option<Role>> {
        self.find_role_by_id_impl(tenant_id, role_id).await
    }

    async fn list_roles(
        &self,
        tenant_id: TenantId,
        guard_name: Option<&GuardName>,
    ) -> AppResult<Vec<Role>> {
        self.list_roles_impl(tenant_id, guard_name).await
    }

    async fn delete_role(&self, tenant_id: TenantId, role_id: RoleId) -> AppResult<()> {
        self.delete_role_impl(tenant_id, role_id).await
    }

    async fn create_permission(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Permission> {
        self.create_permission_impl(tenant_id, name, guard_name)
            .await
    }

    async fn find_or_create_permission(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Permission> {
        self.find_or_create_permission_impl(tenant_id, name, guard_name)
            .await
    }

    async fn find_permission_by_name(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Option<Permission>> {
        self.find_permission_by_name_impl(tenant_id, name, guard_name)
            .await
    }

    async fn find_permission_by_id(
        &self,
        tenant_id: TenantId,
        permission_id: PermissionId,
    ) -> AppResult<Option<Permission>> {
        self.find_permission_by_id_impl(tenant_id, permission_id)
            .await
    }

    async fn list_permissions(
        &self,
        tenant_id: TenantId,
        guard_name: Option<&GuardName>,
    ) -> AppResult<Vec<Permission>> {
        self.list_permissions_impl(tenant_id, guard_name).await
    }

    async fn delete_permission(
        &self,
        tenant_id: TenantId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        self.delete_permission_impl(tenant_id, permission_id).await
    }

    async fn attach_permissions_to_role(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        self.attach_permissions_to_role_impl(tenant_id, role_id, permission_ids)
            .await
    }

    async fn detach_permission_from_role(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        self.detach_permission_from_role_impl(tenant_id, role_id, permission_id)
            .await
    }

    async fn replace_role_permissions(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        self.replace_role_permissions_impl(tenant_id, role_id, permission_ids)
            .await
    }

    async fn assign_role_to_principal(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        role_id: RoleId,
    ) -> AppResult<()> {
        self.assign_role_to_principal_impl(tenant_id, principal, role_id)
            .await
    }

    async fn remove_role_from_principal(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        role_id: RoleId,
    ) -> AppResult<()> {
        self.remove_role_from_principal_impl(tenant_id, principal, role_id)
            .await
    }

    async fn replace_principal_roles(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        role_ids: &[RoleId],
    ) -> AppResult<()> {
        self.replace_principal_roles_impl(tenant_id, principal, role_ids)
            .await
    }

    async fn grant_permission_to_principal(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        self.grant_permission_to_principal_impl(tenant_id, principal, permission_id)
            .await
    }

    async fn revoke_permission_from_principal(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        self.revoke_permission_from_principal_impl(tenant_id, principal, permission_id)
            .await
    }

    async fn replace_principal_permissions(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        self.replace_principal_permissions_impl(tenant_id, principal, permission_ids)
            .await
    }

    async fn list_principal_role_ids(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
    ) -> AppResult<Vec<RoleId>> {
        self.list_principal_role_ids_impl(tenant_id, principal)
            .await
    }

    async fn list_principal_permission_ids(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
    ) -> AppResult<Vec<PermissionId>> {
        self.list_principal_permission_ids_impl(tenant_id, principal)
            .await
    }

    async fn list_principals_with_role(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> AppResult<Vec<Principal>> {
        self.list_principals_with_role_impl(tenant_id, role_id)
            .await
    }

    async fn load_catalog(
        &self,
        tenant_id: TenantId,
        guard_name: &GuardName,
    ) -> AppResult<ScopeCatalog> {
        let roles = self.list_roles_impl(tenant_id, Some(guard_name)).await?;
        let permissions = self
            .list_permissions_impl(tenant_id, Some(guard_name))
            .await?;
        let role_permissions = self.list_role_links_impl(tenant_id, guard_name).await?;

        debug!(
            %tenant_id,
            guard = %guard_name,
            roles = roles.len(),
            permissions = permissions.len(),
            "permission catalog loaded from postgres"
        );

        Ok(ScopeCatalog {
            roles,
            permissions,
            role_permissions,
        })
    }
}
