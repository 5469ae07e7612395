use async_trait::async_trait;
use warrant_core::{AppResult, Principal, TenantId};
use warrant_domain::{GuardName, Permission, PermissionId, Role, RoleId};

/// Every role and permission of one (tenant, guard) scope with the links between them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeCatalog {
    /// Roles defined in the scope.
    pub roles: Vec<Role>,
    /// Permissions defined in the scope.
    pub permissions: Vec<Permission>,
    /// Role to permission links.
    pub role_permissions: Vec<(RoleId, PermissionId)>,
}

/// Persistence port for roles, permissions and their assignments.
///
/// Every method takes the tenant explicitly; implementations must never
/// return or mutate records of another tenant. Assignment writes are
/// idempotent and deletes cascade to every assignment of the removed record.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Creates a role, failing with `AlreadyExists` on a duplicate (name, guard).
    async fn create_role(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Role>;

    /// Returns the existing role or atomically creates it.
    async fn find_or_create_role(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Role>;

    /// Finds a role by name within a guard.
    async fn find_role_by_name(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Option<Role>>;

    /// Finds a role by store identifier.
    async fn find_role_by_id(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> AppResult<Option<Role>>;

    /// Lists tenant roles ordered by name, optionally restricted to one guard.
    async fn list_roles(
        &self,
        tenant_id: TenantId,
        guard_name: Option<&GuardName>,
    ) -> AppResult<Vec<Role>>;

    /// Deletes a role and its assignments.
    async fn delete_role(&self, tenant_id: TenantId, role_id: RoleId) -> AppResult<()>;

    /// Creates a permission, failing with `AlreadyExists` on a duplicate (name, guard).
    async fn create_permission(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Permission>;

    /// Returns the existing permission or atomically creates it.
    async fn find_or_create_permission(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Permission>;

    /// Finds a permission by name within a guard.
    async fn find_permission_by_name(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Option<Permission>>;

    /// Finds a permission by store identifier.
    async fn find_permission_by_id(
        &self,
        tenant_id: TenantId,
        permission_id: PermissionId,
    ) -> AppResult<Option<Permission>>;

    /// Lists tenant permissions ordered by name, optionally restricted to one guard.
    async fn list_permissions(
        &self,
        tenant_id: TenantId,
        guard_name: Option<&GuardName>,
    ) -> AppResult<Vec<Permission>>;

    /// Deletes a permission and its assignments.
    async fn delete_permission(
        &self,
        tenant_id: TenantId,
        permission_id: PermissionId,
    ) -> AppResult<()>;

    /// Links permissions to a role.
    async fn attach_permissions_to_role(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()>;

    /// Unlinks one permission from a role.
    async fn detach_permission_from_role(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()>;

    /// Replaces the complete permission set of a role.
    async fn replace_role_permissions(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()>;

    /// Assigns a role to a principal.
    async fn assign_role_to_principal(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        role_id: RoleId,
    ) -> AppResult<()>;

    /// Removes a role from a principal.
    async fn remove_role_from_principal(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        role_id: RoleId,
    ) -> AppResult<()>;

    /// Replaces every role of a principal.
    async fn replace_principal_roles(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        role_ids: &[RoleId],
    ) -> AppResult<()>;

    /// Grants a permission directly to a principal.
    async fn grant_permission_to_principal(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        permission_id: PermissionId,
    ) -> AppResult<()>;

    /// Revokes a direct permission from a principal.
    async fn revoke_permission_from_principal(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        permission_id: PermissionId,
    ) -> AppResult<()>;

    /// Replaces every direct permission of a principal.
    async fn replace_principal_permissions(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        permission_ids: &[PermissionId],
    ) -> AppResult<()>;

    /// Lists role ids assigned to a principal.
    async fn list_principal_role_ids(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
    ) -> AppResult<Vec<RoleId>>;

    /// Lists permission ids granted directly to a principal.
    async fn list_principal_permission_ids(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
    ) -> AppResult<Vec<PermissionId>>;

    /// Lists principals holding a role.
    async fn list_principals_with_role(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> AppResult<Vec<Principal>>;

    /// Loads the complete role and permission catalog of one guard.
    async fn load_catalog(
        &self,
        tenant_id: TenantId,
        guard_name: &GuardName,
    ) -> AppResult<ScopeCatalog>;
}
