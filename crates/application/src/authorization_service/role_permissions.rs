use std::collections::BTreeSet;

use tracing::info;

use super::*;

impl AuthorizationService {
    /// Adds a permission to a role. Both must belong to the same guard.
    pub async fn give_permission_to_role(
        &self,
        context: &AuthContext,
        role: impl Into<RoleRef>,
        permission: impl Into<PermissionRef>,
        guard_name: Option<&str>,
    ) -> AppResult<()> {
        let tenant_id = self.scope_tenant(context)?;
        let (role, permission) = self
            .role_and_permission(tenant_id, role.into(), permission.into(), guard_name)
            .await?;

        self.store
            .attach_permissions_to_role(tenant_id, role.id(), &[permission.id()])
            .await?;
        self.cache.invalidate(tenant_id, role.guard_name()).await;

        info!(
            %tenant_id,
            role = role.name(),
            permission = permission.name(),
            "permission attached to role"
        );
        Ok(())
    }

    /// Removes a permission from a role.
    pub async fn revoke_permission_from_role(
        &self,
        context: &AuthContext,
        role: impl Into<RoleRef>,
        permission: impl Into<PermissionRef>,
        guard_name: Option<&str>,
    ) -> AppResult<()> {
        let tenant_id = self.scope_tenant(context)?;
        let (role, permission) = self
            .role_and_permission(tenant_id, role.into(), permission.into(), guard_name)
            .await?;

        self.store
            .detach_permission_from_role(tenant_id, role.id(), permission.id())
            .await?;
        self.cache.invalidate(tenant_id, role.guard_name()).await;

        info!(
            %tenant_id,
            role = role.name(),
            permission = permission.name(),
            "permission detached from role"
        );
        Ok(())
    }

    /// Replaces the permission set of a role.
    pub async fn sync_role_permissions(
        &self,
        context: &AuthContext,
        role: impl Into<RoleRef>,
        permissions: Vec<PermissionRef>,
        guard_name: Option<&str>,
    ) -> AppResult<()> {
        let tenant_id = self.scope_tenant(context)?;
        let guard_name = self.guard_or_default(guard_name)?;
        let role = self.resolve_role(tenant_id, role.into(), &guard_name).await?;

        let mut permission_ids = BTreeSet::new();
        for permission in permissions {
            let permission = self
                .resolve_permission(tenant_id, permission, role.guard_name())
                .await?;
            ensure_same_guard(&role, &permission)?;
            permission_ids.insert(permission.id());
        }
        let permission_ids: Vec<PermissionId> = permission_ids.into_iter().collect();

        self.store
            .replace_role_permissions(tenant_id, role.id(), &permission_ids)
            .await?;
        self.cache.invalidate(tenant_id, role.guard_name()).await;

        info!(
            %tenant_id,
            role = role.name(),
            permissions = permission_ids.len(),
            "role permissions synchronized"
        );
        Ok(())
    }

    /// Returns whether the role grants the permission, honouring wildcard mode.
    pub async fn role_has_permission_to(
        &self,
        context: &AuthContext,
        role: impl Into<RoleRef>,
        permission: impl Into<PermissionRef>,
        guard_name: Option<&str>,
    ) -> AppResult<bool> {
        let tenant_id = self.scope_tenant(context)?;
        let (role, permission) = self
            .role_and_permission(tenant_id, role.into(), permission.into(), guard_name)
            .await?;
        let catalog = self.catalog(tenant_id, role.guard_name()).await?;

        if self.wildcard_enabled {
            return Ok(catalog
                .permissions_for_role(role.id())
                .any(|granted| wildcard_matches(granted.name(), permission.name())));
        }

        Ok(catalog.role_has_permission(role.id(), permission.id()))
    }

    /// Returns the permissions held by a role, ordered by name.
    pub async fn role_permissions(
        &self,
        context: &AuthContext,
        role: impl Into<RoleRef>,
        guard_name: Option<&str>,
    ) -> AppResult<Vec<Permission>> {
        let tenant_id = self.scope_tenant(context)?;
        let guard_name = self.guard_or_default(guard_name)?;
        let role = self.resolve_role(tenant_id, role.into(), &guard_name).await?;
        let catalog = self.catalog(tenant_id, role.guard_name()).await?;

        let mut permissions: Vec<Permission> =
            catalog.permissions_for_role(role.id()).cloned().collect();
        permissions.sort_by(|left, right| left.name().cmp(right.name()));

        Ok(permissions)
    }

    async fn role_and_permission(
        &self,
        tenant_id: TenantId,
        role: RoleRef,
        permission: PermissionRef,
        guard_name: Option<&str>,
    ) -> AppResult<(Role, Permission)> {
        let guard_name = self.guard_or_default(guard_name)?;
        let role = self.resolve_role(tenant_id, role, &guard_name).await?;
        let permission = self
            .resolve_permission(tenant_id, permission, role.guard_name())
            .await?;
        ensure_same_guard(&role, &permission)?;

        Ok((role, permission))
    }
}

fn ensure_same_guard(role: &Role, permission: &Permission) -> AppResult<()> {
    if role.guard_name() == permission.guard_name() {
        return Ok(());
    }

    Err(AppError::GuardMismatch(format!(
        "permission '{}' uses guard '{}' but role '{}' uses guard '{}'",
        permission.name(),
        permission.guard_name(),
        role.name(),
        role.guard_name()
    )))
}
