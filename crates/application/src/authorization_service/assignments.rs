use std::collections::BTreeSet;

use tracing::info;

use super::*;

impl AuthorizationService {
    /// Assigns a role to the principal; the role must share one of the principal's guards.
    pub async fn assign_role(
        &self,
        context: &AuthContext,
        principal: &Principal,
        role: impl Into<RoleRef>,
    ) -> AppResult<()> {
        let tenant_id = self.scope_tenant(context)?;
        let role = self
            .principal_role(tenant_id, principal, role.into())
            .await?;

        self.store
            .assign_role_to_principal(tenant_id, principal, role.id())
            .await?;
        self.cache.invalidate(tenant_id, role.guard_name()).await;

        info!(%tenant_id, %principal, role = role.name(), "role assigned");
        Ok(())
    }

    /// Removes a role from the principal.
    pub async fn revoke_role(
        &self,
        context: &AuthContext,
        principal: &Principal,
        role: impl Into<RoleRef>,
    ) -> AppResult<()> {
        let tenant_id = self.scope_tenant(context)?;
        let role = self
            .principal_role(tenant_id, principal, role.into())
            .await?;

        self.store
            .remove_role_from_principal(tenant_id, principal, role.id())
            .await?;
        self.cache.invalidate(tenant_id, role.guard_name()).await;

        info!(%tenant_id, %principal, role = role.name(), "role revoked");
        Ok(())
    }

    /// Replaces every role of the principal. All references resolve before any write.
    pub async fn sync_roles(
        &self,
        context: &AuthContext,
        principal: &Principal,
        roles: Vec<RoleRef>,
    ) -> AppResult<()> {
        let tenant_id = self.scope_tenant(context)?;

        let mut role_ids = BTreeSet::new();
        for role in roles {
            role_ids.insert(self.principal_role(tenant_id, principal, role).await?.id());
        }
        let role_ids: Vec<RoleId> = role_ids.into_iter().collect();

        self.store
            .replace_principal_roles(tenant_id, principal, &role_ids)
            .await?;
        self.invalidate_principal_guards(tenant_id, principal).await;

        info!(%tenant_id, %principal, roles = role_ids.len(), "roles synchronized");
        Ok(())
    }

    /// Grants a permission directly to the principal.
    pub async fn give_permission_to(
        &self,
        context: &AuthContext,
        principal: &Principal,
        permission: impl Into<PermissionRef>,
    ) -> AppResult<()> {
        let tenant_id = self.scope_tenant(context)?;
        let permission = self
            .principal_permission(tenant_id, principal, permission.into())
            .await?;

        self.store
            .grant_permission_to_principal(tenant_id, principal, permission.id())
            .await?;
        self.cache
            .invalidate(tenant_id, permission.guard_name())
            .await;

        info!(
            %tenant_id,
            %principal,
            permission = permission.name(),
            "permission granted"
        );
        Ok(())
    }

    /// Revokes a direct permission from the principal. Role grants are untouched.
    pub async fn revoke_permission_to(
        &self,
        context: &AuthContext,
        principal: &Principal,
        permission: impl Into<PermissionRef>,
    ) -> AppResult<()> {
        let tenant_id = self.scope_tenant(context)?;
        let permission = self
            .principal_permission(tenant_id, principal, permission.into())
            .await?;

        self.store
            .revoke_permission_from_principal(tenant_id, principal, permission.id())
            .await?;
        self.cache
            .invalidate(tenant_id, permission.guard_name())
            .await;

        info!(
            %tenant_id,
            %principal,
            permission = permission.name(),
            "permission revoked"
        );
        Ok(())
    }

    /// Replaces every direct permission of the principal.
    pub async fn sync_permissions(
        &self,
        context: &AuthContext,
        principal: &Principal,
        permissions: Vec<PermissionRef>,
    ) -> AppResult<()> {
        let tenant_id = self.scope_tenant(context)?;

        let mut permission_ids = BTreeSet::new();
        for permission in permissions {
            permission_ids.insert(
                self.principal_permission(tenant_id, principal, permission)
                    .await?
                    .id(),
            );
        }
        let permission_ids: Vec<PermissionId> = permission_ids.into_iter().collect();

        self.store
            .replace_principal_permissions(tenant_id, principal, &permission_ids)
            .await?;
        self.invalidate_principal_guards(tenant_id, principal).await;

        info!(
            %tenant_id,
            %principal,
            permissions = permission_ids.len(),
            "permissions synchronized"
        );
        Ok(())
    }

    async fn principal_role(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        reference: RoleRef,
    ) -> AppResult<Role> {
        let guard_name = self.guards.default_name(principal.principal_type());
        let role = self.resolve_role(tenant_id, reference, &guard_name).await?;
        self.guards
            .ensure_guard(principal.principal_type(), role.guard_name())?;

        Ok(role)
    }

    async fn principal_permission(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        reference: PermissionRef,
    ) -> AppResult<Permission> {
        let guard_name = self.guards.default_name(principal.principal_type());
        let permission = self
            .resolve_permission(tenant_id, reference, &guard_name)
            .await?;
        self.guards
            .ensure_guard(principal.principal_type(), permission.guard_name())?;

        Ok(permission)
    }

    async fn invalidate_principal_guards(&self, tenant_id: TenantId, principal: &Principal) {
        for guard_name in self.guards.guard_names(principal.principal_type()) {
            self.cache.invalidate(tenant_id, &guard_name).await;
        }
    }
}
