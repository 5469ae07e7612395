use std::collections::BTreeMap;
use std::sync::Arc;

use warrant_core::{AppError, AppResult, AuthContext, Principal, TenantId};
use warrant_domain::{
    GuardName, Permission, PermissionId, PermissionRef, Role, RoleId, RoleRef, wildcard_matches,
};

use crate::{
    AuthorizationConfig, CacheKey, EntityStore, GuardResolver, PermissionCache, PermissionCatalog,
};

mod assignments;
mod management;
mod role_permissions;

#[cfg(test)]
mod tests;

/// Application service answering tenant-scoped RBAC questions.
#[derive(Clone)]
pub struct AuthorizationService {
    store: Arc<dyn EntityStore>,
    cache: Arc<PermissionCache>,
    guards: GuardResolver,
    tenant_scope_enabled: bool,
    wildcard_enabled: bool,
}

impl AuthorizationService {
    /// Creates a service from a store, a shared cache and configuration.
    pub fn new(
        store: Arc<dyn EntityStore>,
        cache: Arc<PermissionCache>,
        config: &AuthorizationConfig,
    ) -> AppResult<Self> {
        Ok(Self {
            store,
            cache,
            guards: GuardResolver::from_config(config)?,
            tenant_scope_enabled: config.tenant_scope_enabled,
            wildcard_enabled: config.wildcard_enabled,
        })
    }

    /// Returns the guard resolver used by this service.
    #[must_use]
    pub fn guard_resolver(&self) -> &GuardResolver {
        &self.guards
    }

    /// Returns whether granted permissions are matched as wildcard patterns.
    #[must_use]
    pub fn wildcard_enabled(&self) -> bool {
        self.wildcard_enabled
    }

    /// Returns whether the principal holds the permission, directly or through a role.
    ///
    /// Fails with `NotFound` when the reference does not resolve in the current
    /// tenant and with `GuardMismatch` when the permission belongs to a guard
    /// the principal type is not authenticated by.
    pub async fn has_permission_to(
        &self,
        context: &AuthContext,
        principal: &Principal,
        permission: impl Into<PermissionRef>,
        guard_name: Option<&str>,
    ) -> AppResult<bool> {
        let tenant_id = self.scope_tenant(context)?;
        let guard_name = self.guard_or_principal_default(principal, guard_name)?;
        let permission = self
            .resolve_permission(tenant_id, permission.into(), &guard_name)
            .await?;
        self.guards
            .ensure_guard(principal.principal_type(), permission.guard_name())?;

        let catalog = self.catalog(tenant_id, permission.guard_name()).await?;
        let direct_ids = self
            .store
            .list_principal_permission_ids(tenant_id, principal)
            .await?;
        let role_ids = self.store.list_principal_role_ids(tenant_id, principal).await?;

        if self.wildcard_enabled {
            let granted = effective_permissions(&catalog, &direct_ids, &role_ids);
            return Ok(granted
                .values()
                .any(|granted| wildcard_matches(granted.name(), permission.name())));
        }

        Ok(direct_ids.contains(&permission.id())
            || role_ids
                .iter()
                .any(|role_id| catalog.role_has_permission(*role_id, permission.id())))
    }

    /// Like [`Self::has_permission_to`] but answers `false` for unknown or
    /// foreign-guard permissions.
    pub async fn check_permission_to(
        &self,
        context: &AuthContext,
        principal: &Principal,
        permission: impl Into<PermissionRef>,
        guard_name: Option<&str>,
    ) -> AppResult<bool> {
        match self
            .has_permission_to(context, principal, permission, guard_name)
            .await
        {
            Ok(granted) => Ok(granted),
            Err(AppError::NotFound(_) | AppError::GuardMismatch(_)) => Ok(false),
            Err(error) => Err(error),
        }
    }

    /// Returns whether the principal holds at least one of the permissions.
    pub async fn has_any_permission(
        &self,
        context: &AuthContext,
        principal: &Principal,
        permissions: Vec<PermissionRef>,
    ) -> AppResult<bool> {
        for permission in permissions {
            if self
                .check_permission_to(context, principal, permission, None)
                .await?
            {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Returns whether the principal holds every one of the permissions.
    pub async fn has_all_permissions(
        &self,
        context: &AuthContext,
        principal: &Principal,
        permissions: Vec<PermissionRef>,
    ) -> AppResult<bool> {
        for permission in permissions {
            if !self
                .check_permission_to(context, principal, permission, None)
                .await?
            {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Returns the roles assigned to the principal, ordered by name.
    pub async fn roles(&self, context: &AuthContext, principal: &Principal) -> AppResult<Vec<Role>> {
        let tenant_id = self.scope_tenant(context)?;
        let role_ids = self.store.list_principal_role_ids(tenant_id, principal).await?;

        let mut roles = Vec::new();
        for guard_name in self.guards.guard_names(principal.principal_type()) {
            let catalog = self.catalog(tenant_id, &guard_name).await?;
            roles.extend(
                role_ids
                    .iter()
                    .filter_map(|role_id| catalog.role(*role_id).cloned()),
            );
        }
        roles.sort_by(|left, right| left.name().cmp(right.name()));

        Ok(roles)
    }

    /// Returns the role names assigned to the principal.
    pub async fn role_names(
        &self,
        context: &AuthContext,
        principal: &Principal,
    ) -> AppResult<Vec<String>> {
        Ok(self
            .roles(context, principal)
            .await?
            .into_iter()
            .map(|role| role.name().to_owned())
            .collect())
    }

    /// Returns the effective permissions of the principal: direct grants plus
    /// every permission inherited through roles.
    pub async fn permissions(
        &self,
        context: &AuthContext,
        principal: &Principal,
    ) -> AppResult<Vec<Permission>> {
        self.collect_permissions(context, principal, PermissionSource::All)
            .await
    }

    /// Returns the effective permission names of the principal.
    pub async fn permission_names(
        &self,
        context: &AuthContext,
        principal: &Principal,
    ) -> AppResult<Vec<String>> {
        Ok(self
            .permissions(context, principal)
            .await?
            .into_iter()
            .map(|permission| permission.name().to_owned())
            .collect())
    }

    /// Returns permissions granted directly to the principal.
    pub async fn direct_permissions(
        &self,
        context: &AuthContext,
        principal: &Principal,
    ) -> AppResult<Vec<Permission>> {
        self.collect_permissions(context, principal, PermissionSource::Direct)
            .await
    }

    /// Returns permissions the principal inherits through roles.
    pub async fn permissions_via_roles(
        &self,
        context: &AuthContext,
        principal: &Principal,
    ) -> AppResult<Vec<Permission>> {
        self.collect_permissions(context, principal, PermissionSource::ViaRoles)
            .await
    }

    /// Returns whether the principal holds the role.
    pub async fn has_role(
        &self,
        context: &AuthContext,
        principal: &Principal,
        role: impl Into<RoleRef>,
    ) -> AppResult<bool> {
        let roles = self.roles(context, principal).await?;
        Ok(holds_role(&roles, &role.into()))
    }

    /// Returns whether the principal holds at least one of the roles.
    pub async fn has_any_role(
        &self,
        context: &AuthContext,
        principal: &Principal,
        roles: Vec<RoleRef>,
    ) -> AppResult<bool> {
        let held = self.roles(context, principal).await?;
        Ok(roles.iter().any(|role| holds_role(&held, role)))
    }

    /// Returns whether the principal holds every one of the roles.
    pub async fn has_all_roles(
        &self,
        context: &AuthContext,
        principal: &Principal,
        roles: Vec<RoleRef>,
    ) -> AppResult<bool> {
        let held = self.roles(context, principal).await?;
        Ok(roles.iter().all(|role| holds_role(&held, role)))
    }

    /// Drops every cached catalog.
    pub async fn forget_cached_permissions(&self) {
        self.cache.clear().await;
    }

    /// Derives the tenant scope from the authentication context.
    fn scope_tenant(&self, context: &AuthContext) -> AppResult<TenantId> {
        if !self.tenant_scope_enabled {
            return Ok(TenantId::global());
        }

        Ok(context.current_principal()?.tenant_id())
    }

    fn guard_or_default(&self, guard_name: Option<&str>) -> AppResult<GuardName> {
        match guard_name {
            Some(guard_name) => GuardName::new(guard_name),
            None => Ok(self.guards.default_guard().clone()),
        }
    }

    fn guard_or_principal_default(
        &self,
        principal: &Principal,
        guard_name: Option<&str>,
    ) -> AppResult<GuardName> {
        match guard_name {
            Some(guard_name) => GuardName::new(guard_name),
            None => Ok(self.guards.default_name(principal.principal_type())),
        }
    }

    async fn catalog(
        &self,
        tenant_id: TenantId,
        guard_name: &GuardName,
    ) -> AppResult<Arc<PermissionCatalog>> {
        let key = CacheKey::new(tenant_id, guard_name.clone());
        self.cache
            .get_or_load(&key, || self.store.load_catalog(tenant_id, guard_name))
            .await
    }

    async fn resolve_permission(
        &self,
        tenant_id: TenantId,
        reference: PermissionRef,
        guard_name: &GuardName,
    ) -> AppResult<Permission> {
        let not_found = || AppError::NotFound(format!("{reference} was not found"));

        match &reference {
            PermissionRef::ByName(name) => {
                let name = name.trim();
                if let Some(permission) = self
                    .catalog(tenant_id, guard_name)
                    .await?
                    .permission_by_name(name)
                {
                    return Ok(permission.clone());
                }

                // A catalog miss may be a write from another process.
                let permission = self
                    .store
                    .find_permission_by_name(tenant_id, name, guard_name)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound(format!(
                            "{reference} was not found for guard '{guard_name}'"
                        ))
                    })?;
                self.cache.invalidate(tenant_id, guard_name).await;
                Ok(permission)
            }
            PermissionRef::ById(permission_id) => self
                .store
                .find_permission_by_id(tenant_id, *permission_id)
                .await?
                .ok_or_else(not_found),
            PermissionRef::Resolved(permission) if permission.tenant_id() == tenant_id => {
                Ok(permission.clone())
            }
            PermissionRef::Resolved(_) => Err(not_found()),
        }
    }

    async fn resolve_role(
        &self,
        tenant_id: TenantId,
        reference: RoleRef,
        guard_name: &GuardName,
    ) -> AppResult<Role> {
        let not_found = || AppError::NotFound(format!("{reference} was not found"));

        match &reference {
            RoleRef::ByName(name) => {
                let name = name.trim();
                if let Some(role) = self.catalog(tenant_id, guard_name).await?.role_by_name(name) {
                    return Ok(role.clone());
                }

                let role = self
                    .store
                    .find_role_by_name(tenant_id, name, guard_name)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound(format!(
                            "{reference} was not found for guard '{guard_name}'"
                        ))
                    })?;
                self.cache.invalidate(tenant_id, guard_name).await;
                Ok(role)
            }
            RoleRef::ById(role_id) => self
                .store
                .find_role_by_id(tenant_id, *role_id)
                .await?
                .ok_or_else(not_found),
            RoleRef::Resolved(role) if role.tenant_id() == tenant_id => Ok(role.clone()),
            RoleRef::Resolved(_) => Err(not_found()),
        }
    }

    async fn collect_permissions(
        &self,
        context: &AuthContext,
        principal: &Principal,
        source: PermissionSource,
    ) -> AppResult<Vec<Permission>> {
        let tenant_id = self.scope_tenant(context)?;
        let direct_ids = match source {
            PermissionSource::ViaRoles => Vec::new(),
            _ => {
                self.store
                    .list_principal_permission_ids(tenant_id, principal)
                    .await?
            }
        };
        let role_ids = match source {
            PermissionSource::Direct => Vec::new(),
            _ => self.store.list_principal_role_ids(tenant_id, principal).await?,
        };

        let mut collected = BTreeMap::new();
        for guard_name in self.guards.guard_names(principal.principal_type()) {
            let catalog = self.catalog(tenant_id, &guard_name).await?;
            collected.extend(effective_permissions(&catalog, &direct_ids, &role_ids));
        }

        let mut permissions: Vec<Permission> = collected.into_values().collect();
        permissions.sort_by(|left, right| {
            left.name()
                .cmp(right.name())
                .then_with(|| left.guard_name().cmp(right.guard_name()))
        });

        Ok(permissions)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PermissionSource {
    All,
    Direct,
    ViaRoles,
}

fn effective_permissions(
    catalog: &PermissionCatalog,
    direct_ids: &[PermissionId],
    role_ids: &[RoleId],
) -> BTreeMap<PermissionId, Permission> {
    let direct = direct_ids
        .iter()
        .filter_map(|permission_id| catalog.permission(*permission_id));
    let inherited = role_ids
        .iter()
        .flat_map(|role_id| catalog.permissions_for_role(*role_id));

    direct
        .chain(inherited)
        .map(|permission| (permission.id(), permission.clone()))
        .collect()
}

fn holds_role(held: &[Role], reference: &RoleRef) -> bool {
    held.iter().any(|role| match reference {
        RoleRef::ByName(name) => role.name() == name.trim(),
        RoleRef::ById(role_id) => role.id() == *role_id,
        RoleRef::Resolved(resolved) => role.id() == resolved.id(),
    })
}
