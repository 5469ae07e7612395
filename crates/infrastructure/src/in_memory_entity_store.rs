use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use warrant_application::{EntityStore, ScopeCatalog};
use warrant_core::{AppError, AppResult, Principal, TenantId};
use warrant_domain::{GuardName, Permission, PermissionId, Role, RoleId};


#[derive(Debug, Default)]
struct StoreState {
    next_role_id: i64,
    next_permission_id: i64,
    roles: HashMap<RoleId, Role>,
    permissions: HashMap<PermissionId, Permission>,
    role_permissions: BTreeSet<(TenantId, RoleId, PermissionId)>,
    principal_roles: BTreeSet<(TenantId, Principal, RoleId)>,
    principal_permissions: BTreeSet<(TenantId, Principal, PermissionId)>,
}

impl StoreState {
    fn role(&self, tenant_id: TenantId, role_id: RoleId) -> Option<&Role> {
        self.roles
            .get(&role_id)
            .filter(|role| role.tenant_id() == tenant_id)
    }

    fn role_by_name(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> Option<&Role> {
        self.roles.values().find(|role| {
            role.tenant_id() == tenant_id && role.guard_name() == guard_name && role.name() == name
        })
    }

    fn permission(&self, tenant_id: TenantId, permission_id: PermissionId) -> Option<&Permission> {
        self.permissions
            .get(&permission_id)
            .filter(|permission| permission.tenant_id() == tenant_id)
    }

    fn permission_by_name(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> Option<&Permission> {
        self.permissions.values().find(|permission| {
            permission.tenant_id() == tenant_id
                && permission.guard_name() == guard_name
                && permission.name() == name
        })
    }

    fn insert_role(
        &mut self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Role> {
        let role = Role::new(
            RoleId::new(self.next_role_id + 1),
            tenant_id,
            name,
            guard_name.clone(),
            Utc::now(),
        )?;
        self.next_role_id += 1;
        self.roles.insert(role.id(), role.clone());

        Ok(role)
    }

    fn insert_permission(
        &mut self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Permission> {
        let permission = Permission::new(
            PermissionId::new(self.next_permission_id + 1),
            tenant_id,
            name,
            guard_name.clone(),
            Utc::now(),
        )?;
        self.next_permission_id += 1;
        self.permissions.insert(permission.id(), permission.clone());

        Ok(permission)
    }

    fn require_role(&self, tenant_id: TenantId, role_id: RoleId) -> AppResult<()> {
        self.role(tenant_id, role_id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("role #{role_id} was not found")))
    }

    fn require_permissions(
        &self,
        tenant_id: TenantId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        match permission_ids
            .iter()
            .find(|permission_id| self.permission(tenant_id, **permission_id).is_none())
        {
            Some(missing) => Err(AppError::NotFound(format!(
                "permission #{missing} was not found"
            ))),
            None => Ok(()),
        }
    }
}

/// Entity store held in process memory.
///
/// Every mutation runs under a single write lock, so check-then-create
/// sequences are atomic.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    state: RwLock<StoreState>,
}

impl InMemoryEntityStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by_name<T>(mut values: Vec<T>, name: impl Fn(&T) -> &str) -> Vec<T> {
    values.sort_by(|left, right| name(left).cmp(name(right)));
    values
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn create_role(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Role> {
        let name = name.trim();
        let mut state = self.state.write().await;
        if state.role_by_name(tenant_id, name, guard_name).is_some() {
            return Err(AppError::AlreadyExists(format!(
                "role '{name}' already exists for guard '{guard_name}'"
            )));
        }

        state.insert_role(tenant_id, name, guard_name)
    }

    async fn find_or_create_role(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Role> {
        let name = name.trim();
        let mut state = self.state.write().await;
        if let Some(role) = state.role_by_name(tenant_id, name, guard_name) {
            return Ok(role.clone());
        }

        state.insert_role(tenant_id, name, guard_name)
    }

    async fn find_role_by_name(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Option<Role>> {
        let name = name.trim();
        Ok(self
            .state
            .read()
            .await
            .role_by_name(tenant_id, name, guard_name)
            .cloned())
    }

    async fn find_role_by_id(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> AppResult<Option<Role>> {
        Ok(self.state.read().await.role(tenant_id, role_id).cloned())
    }

    async fn list_roles(
        &self,
        tenant_id: TenantId,
        guard_name: Option<&GuardName>,
    ) -> AppResult<Vec<Role>> {
        let state = self.state.read().await;
        let roles: Vec<Role> = state
            .roles
            .values()
            .filter(|role| {
                role.tenant_id() == tenant_id
                    && guard_name.is_none_or(|guard_name| role.guard_name() == guard_name)
            })
            .cloned()
            .collect();

        Ok(sorted_by_name(roles, Role::name))
    }

    async fn delete_role(&self, tenant_id: TenantId, role_id: RoleId) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.require_role(tenant_id, role_id)?;

        state.roles.remove(&role_id);
        state
            .role_permissions
            .retain(|(_, linked_role_id, _)| *linked_role_id != role_id);
        state
            .principal_roles
            .retain(|(_, _, assigned_role_id)| *assigned_role_id != role_id);

        Ok(())
    }

    async fn create_permission(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Permission> {
        let name = name.trim();
        let mut state = self.state.write().await;
        if state
            .permission_by_name(tenant_id, name, guard_name)
            .is_some()
        {
            return Err(AppError::AlreadyExists(format!(
                "permission '{name}' already exists for guard '{guard_name}'"
            )));
        }

        state.insert_permission(tenant_id, name, guard_name)
    }

    async fn find_or_create_permission(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Permission> {
        let name = name.trim();
        let mut state = self.state.write().await;
        if let Some(permission) = state.permission_by_name(tenant_id, name, guard_name) {
            return Ok(permission.clone());
        }

        state.insert_permission(tenant_id, name, guard_name)
    }

    async fn find_permission_by_name(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Option<Permission>> {
        let name = name.trim();
        Ok(self
            .state
            .read()
            .await
            .permission_by_name(tenant_id, name, guard_name)
            .cloned())
    }

    async fn find_permission_by_id(
        &self,
        tenant_id: TenantId,
        permission_id: PermissionId,
    ) -> AppResult<Option<Permission>> {
        Ok(self
            .state
            .read()
            .await
            .permission(tenant_id, permission_id)
            .cloned())
    }

    async fn list_permissions(
        &self,
        tenant_id: TenantId,
        guard_name: Option<&GuardName>,
    ) -> AppResult<Vec<Permission>> {
        let state = self.state.read().await;
        let permissions: Vec<Permission> = state
            .permissions
            .values()
            .filter(|permission| {
                permission.tenant_id() == tenant_id
                    && guard_name.is_none_or(|guard_name| permission.guard_name() == guard_name)
            })
            .cloned()
            .collect();

        Ok(sorted_by_name(permissions, Permission::name))
    }

    async fn delete_permission(
        &self,
        tenant_id: TenantId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.require_permissions(tenant_id, &[permission_id])?;

        state.permissions.remove(&permission_id);
        state
            .role_permissions
            .retain(|(_, _, linked_permission_id)| *linked_permission_id != permission_id);
        state
            .principal_permissions
            .retain(|(_, _, granted_permission_id)| *granted_permission_id != permission_id);

        Ok(())
    }

    async fn attach_permissions_to_role(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.require_role(tenant_id, role_id)?;
        state.require_permissions(tenant_id, permission_ids)?;

        for permission_id in permission_ids {
            state
                .role_permissions
                .insert((tenant_id, role_id, *permission_id));
        }

        Ok(())
    }

    async fn detach_permission_from_role(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        self.state
            .write()
            .await
            .role_permissions
            .remove(&(tenant_id, role_id, permission_id));
        Ok(())
    }

    async fn replace_role_permissions(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.require_role(tenant_id, role_id)?;
        state.require_permissions(tenant_id, permission_ids)?;

        state
            .role_permissions
            .retain(|(_, linked_role_id, _)| *linked_role_id != role_id);
        for permission_id in permission_ids {
            state
                .role_permissions
                .insert((tenant_id, role_id, *permission_id));
        }

        Ok(())
    }

    async fn assign_role_to_principal(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        role_id: RoleId,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.require_role(tenant_id, role_id)?;
        state
            .principal_roles
            .insert((tenant_id, principal.clone(), role_id));
        Ok(())
    }

    async fn remove_role_from_principal(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        role_id: RoleId,
    ) -> AppResult<()> {
        self.state
            .write()
            .await
            .principal_roles
            .remove(&(tenant_id, principal.clone(), role_id));
        Ok(())
    }

    async fn replace_principal_roles(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        role_ids: &[RoleId],
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        for role_id in role_ids {
            state.require_role(tenant_id, *role_id)?;
        }

        state
            .principal_roles
            .retain(|(stored_tenant_id, holder, _)| {
                !(*stored_tenant_id == tenant_id && holder == principal)
            });
        for role_id in role_ids {
            state
                .principal_roles
                .insert((tenant_id, principal.clone(), *role_id));
        }

        Ok(())
    }

    async fn grant_permission_to_principal(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.require_permissions(tenant_id, &[permission_id])?;
        state
            .principal_permissions
            .insert((tenant_id, principal.clone(), permission_id));
        Ok(())
    }

    async fn revoke_permission_from_principal(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        self.state
            .write()
            .await
            .principal_permissions
            .remove(&(tenant_id, principal.clone(), permission_id));
        Ok(())
    }

    async fn replace_principal_permissions(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.require_permissions(tenant_id, permission_ids)?;

        state
            .principal_permissions
            .retain(|(stored_tenant_id, holder, _)| {
                !(*stored_tenant_id == tenant_id && holder == principal)
            });
        for permission_id in permission_ids {
            state
                .principal_permissions
                .insert((tenant_id, principal.clone(), *permission_id));
        }

        Ok(())
    }

    async fn list_principal_role_ids(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
    ) -> AppResult<Vec<RoleId>> {
        Ok(self
            .state
            .read()
            .await
            .principal_roles
            .iter()
            .filter(|(stored_tenant_id, holder, _)| {
                *stored_tenant_id == tenant_id && holder == principal
            })
            .map(|(_, _, role_id)| *role_id)
            .collect())
    }

    async fn list_principal_permission_ids(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
    ) -> AppResult<Vec<PermissionId>> {
        Ok(self
            .state
            .read()
            .await
            .principal_permissions
            .iter()
            .filter(|(stored_tenant_id, holder, _)| {
                *stored_tenant_id == tenant_id && holder == principal
            })
            .map(|(_, _, permission_id)| *permission_id)
            .collect())
    }

    async fn list_principals_with_role(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> AppResult<Vec<Principal>> {
        Ok(self
            .state
            .read()
            .await
            .principal_roles
            .iter()
            .filter(|(stored_tenant_id, _, assigned_role_id)| {
                *stored_tenant_id == tenant_id && *assigned_role_id == role_id
            })
            .map(|(_, principal, _)| principal.clone())
            .collect())
    }

    async fn load_catalog(
        &self,
        tenant_id: TenantId,
        guard_name: &GuardName,
    ) -> AppResult<ScopeCatalog> {
        let state = self.state.read().await;
        let roles: Vec<Role> = state
            .roles
            .values()
            .filter(|role| role.tenant_id() == tenant_id && role.guard_name() == guard_name)
            .cloned()
            .collect();
        let role_permissions = state
            .role_permissions
            .iter()
            .filter(|(stored_tenant_id, role_id, _)| {
                *stored_tenant_id == tenant_id && roles.iter().any(|role| role.id() == *role_id)
            })
            .map(|(_, role_id, permission_id)| (*role_id, *permission_id))
            .collect();
        let permissions: Vec<Permission> = state
            .permissions
            .values()
            .filter(|permission| {
                permission.tenant_id() == tenant_id && permission.guard_name() == guard_name
            })
            .cloned()
            .collect();

        Ok(ScopeCatalog {
            roles: sorted_by_name(roles, Role::name),
            permissions: sorted_by_name(permissions, Permission::name),
            role_permissions,
        })
    }
}
