use tracing::info;

use super::*;

impl AuthorizationService {
    /// Creates a role in the caller's tenant; the guard defaults to the configured default guard.
    pub async fn create_role(
        &self,
        context: &AuthContext,
        name: &str,
        guard_name: Option<&str>,
    ) -> AppResult<Role> {
        let tenant_id = self.scope_tenant(context)?;
        let guard_name = self.guard_or_default(guard_name)?;
        let name = validated_name(name)?;

        let role = self.store.create_role(tenant_id, name, &guard_name).await?;
        self.cache.invalidate(tenant_id, &guard_name).await;

        info!(%tenant_id, guard = %guard_name, role = role.name(), "role created");
        Ok(role)
    }

    /// Returns the named role or creates it.
    pub async fn find_or_create_role(
        &self,
        context: &AuthContext,
        name: &str,
        guard_name: Option<&str>,
    ) -> AppResult<Role> {
        let tenant_id = self.scope_tenant(context)?;
        let guard_name = self.guard_or_default(guard_name)?;
        let name = validated_name(name)?;

        let role = self
            .store
            .find_or_create_role(tenant_id, name, &guard_name)
            .await?;
        self.cache.invalidate(tenant_id, &guard_name).await;

        Ok(role)
    }

    /// Resolves a role reference in the caller's tenant.
    pub async fn find_role(
        &self,
        context: &AuthContext,
        role: impl Into<RoleRef>,
        guard_name: Option<&str>,
    ) -> AppResult<Role> {
        let tenant_id = self.scope_tenant(context)?;
        let guard_name = self.guard_or_default(guard_name)?;
        self.resolve_role(tenant_id, role.into(), &guard_name).await
    }

    /// Lists roles of the caller's tenant, optionally for one guard.
    pub async fn list_roles(
        &self,
        context: &AuthContext,
        guard_name: Option<&str>,
    ) -> AppResult<Vec<Role>> {
        let tenant_id = self.scope_tenant(context)?;
        let guard_name = guard_name.map(GuardName::new).transpose()?;
        self.store.list_roles(tenant_id, guard_name.as_ref()).await
    }

    /// Deletes a role together with every assignment referencing it.
    pub async fn delete_role(
        &self,
        context: &AuthContext,
        role: impl Into<RoleRef>,
        guard_name: Option<&str>,
    ) -> AppResult<()> {
        let tenant_id = self.scope_tenant(context)?;
        let guard_name = self.guard_or_default(guard_name)?;
        let role = self.resolve_role(tenant_id, role.into(), &guard_name).await?;

        self.store.delete_role(tenant_id, role.id()).await?;
        self.cache.invalidate(tenant_id, role.guard_name()).await;

        info!(%tenant_id, guard = %role.guard_name(), role = role.name(), "role deleted");
        Ok(())
    }

    /// Creates a permission in the caller's tenant.
    pub async fn create_permission(
        &self,
        context: &AuthContext,
        name: &str,
        guard_name: Option<&str>,
    ) -> AppResult<Permission> {
        let tenant_id = self.scope_tenant(context)?;
        let guard_name = self.guard_or_default(guard_name)?;
        let name = validated_name(name)?;

        let permission = self
            .store
            .create_permission(tenant_id, name, &guard_name)
            .await?;
        self.cache.invalidate(tenant_id, &guard_name).await;

        info!(
            %tenant_id,
            guard = %guard_name,
            permission = permission.name(),
            "permission created"
        );
        Ok(permission)
    }

    /// Returns the named permission or creates it.
    pub async fn find_or_create_permission(
        &self,
        context: &AuthContext,
        name: &str,
        guard_name: Option<&str>,
    ) -> AppResult<Permission> {
        let tenant_id = self.scope_tenant(context)?;
        let guard_name = self.guard_or_default(guard_name)?;
        let name = validated_name(name)?;

        let permission = self
            .store
            .find_or_create_permission(tenant_id, name, &guard_name)
            .await?;
        self.cache.invalidate(tenant_id, &guard_name).await;

        Ok(permission)
    }

    /// Resolves a permission reference in the caller's tenant.
    pub async fn find_permission(
        &self,
        context: &AuthContext,
        permission: impl Into<PermissionRef>,
        guard_name: Option<&str>,
    ) -> AppResult<Permission> {
        let tenant_id = self.scope_tenant(context)?;
        let guard_name = self.guard_or_default(guard_name)?;
        self.resolve_permission(tenant_id, permission.into(), &guard_name)
            .await
    }

    /// Lists permissions of the caller's tenant, optionally for one guard.
    pub async fn list_permissions(
        &self,
        context: &AuthContext,
        guard_name: Option<&str>,
    ) -> AppResult<Vec<Permission>> {
        let tenant_id = self.scope_tenant(context)?;
        let guard_name = guard_name.map(GuardName::new).transpose()?;
        self.store
            .list_permissions(tenant_id, guard_name.as_ref())
            .await
    }

    /// Deletes a permission together with every assignment referencing it.
    pub async fn delete_permission(
        &self,
        context: &AuthContext,
        permission: impl Into<PermissionRef>,
        guard_name: Option<&str>,
    ) -> AppResult<()> {
        let tenant_id = self.scope_tenant(context)?;
        let guard_name = self.guard_or_default(guard_name)?;
        let permission = self
            .resolve_permission(tenant_id, permission.into(), &guard_name)
            .await?;

        self.store
            .delete_permission(tenant_id, permission.id())
            .await?;
        self.cache
            .invalidate(tenant_id, permission.guard_name())
            .await;

        info!(
            %tenant_id,
            guard = %permission.guard_name(),
            permission = permission.name(),
            "permission deleted"
        );
        Ok(())
    }

    /// Lists principals holding the role whose type is served by the role's guard.
    ///
    /// A guard with a configured principal type admits only that type; an
    /// unconfigured guard admits the types that fall back to it.
    pub async fn principals_with_role(
        &self,
        context: &AuthContext,
        role: impl Into<RoleRef>,
        guard_name: Option<&str>,
    ) -> AppResult<Vec<Principal>> {
        let tenant_id = self.scope_tenant(context)?;
        let guard_name = self.guard_or_default(guard_name)?;
        let role = self.resolve_role(tenant_id, role.into(), &guard_name).await?;

        let principals = self
            .store
            .list_principals_with_role(tenant_id, role.id())
            .await?;

        let model = self.guards.model_for_guard(role.guard_name());
        Ok(principals
            .into_iter()
            .filter(|principal| match model {
                Some(model) => principal.principal_type() == model,
                None => self
                    .guards
                    .guard_names(principal.principal_type())
                    .contains(role.guard_name()),
            })
            .collect())
    }
}

fn validated_name(name: &str) -> AppResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name must not be empty".to_owned()));
    }

    Ok(name)
}
