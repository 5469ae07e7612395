use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;
use warrant_core::{AppResult, TenantId};
use warrant_domain::{GuardName, Permission, PermissionId, Role, RoleId};

use crate::ScopeCatalog;

/// Cache key: one tenant and one guard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    tenant_id: TenantId,
    guard_name: GuardName,
}

impl CacheKey {
    /// Creates a key for a tenant and guard.
    #[must_use]
    pub fn new(tenant_id: TenantId, guard_name: GuardName) -> Self {
        Self {
            tenant_id,
            guard_name,
        }
    }

    /// Returns the tenant part of the key.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the guard part of the key.
    #[must_use]
    pub fn guard_name(&self) -> &GuardName {
        &self.guard_name
    }
}

/// Indexed role and permission catalog of one scope.
#[derive(Debug, Clone, Default)]
pub struct PermissionCatalog {
    roles: HashMap<RoleId, Role>,
    permissions: HashMap<PermissionId, Permission>,
    permission_names: HashMap<String, PermissionId>,
    role_names: HashMap<String, RoleId>,
    role_permissions: HashMap<RoleId, BTreeSet<PermissionId>>,
}

impl From<ScopeCatalog> for PermissionCatalog {
    fn from(value: ScopeCatalog) -> Self {
        let mut catalog = Self::default();

        for role in value.roles {
            catalog.role_names.insert(role.name().to_owned(), role.id());
            catalog.roles.insert(role.id(), role);
        }
        for permission in value.permissions {
            catalog
                .permission_names
                .insert(permission.name().to_owned(), permission.id());
            catalog.permissions.insert(permission.id(), permission);
        }
        for (role_id, permission_id) in value.role_permissions {
            if catalog.roles.contains_key(&role_id)
                && catalog.permissions.contains_key(&permission_id)
            {
                catalog
                    .role_permissions
                    .entry(role_id)
                    .or_default()
                    .insert(permission_id);
            }
        }

        catalog
    }
}

impl PermissionCatalog {
    /// Returns a role of the scope.
    #[must_use]
    pub fn role(&self, role_id: RoleId) -> Option<&Role> {
        self.roles.get(&role_id)
    }

    /// Returns a role of the scope by name.
    #[must_use]
    pub fn role_by_name(&self, name: &str) -> Option<&Role> {
        self.role_names
            .get(name)
            .and_then(|role_id| self.roles.get(role_id))
    }

    /// Returns a permission of the scope.
    #[must_use]
    pub fn permission(&self, permission_id: PermissionId) -> Option<&Permission> {
        self.permissions.get(&permission_id)
    }

    /// Returns a permission of the scope by name.
    #[must_use]
    pub fn permission_by_name(&self, name: &str) -> Option<&Permission> {
        self.permission_names
            .get(name)
            .and_then(|permission_id| self.permissions.get(permission_id))
    }

    /// Returns whether the role holds the permission.
    #[must_use]
    pub fn role_has_permission(&self, role_id: RoleId, permission_id: PermissionId) -> bool {
        self.role_permissions
            .get(&role_id)
            .is_some_and(|permission_ids| permission_ids.contains(&permission_id))
    }

    /// Returns the permissions held by a role.
    pub fn permissions_for_role(&self, role_id: RoleId) -> impl Iterator<Item = &Permission> {
        self.role_permissions
            .get(&role_id)
            .into_iter()
            .flatten()
            .filter_map(|permission_id| self.permissions.get(permission_id))
    }

    /// Returns the number of roles in the scope.
    #[must_use]
    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    /// Returns the number of permissions in the scope.
    #[must_use]
    pub fn permission_count(&self) -> usize {
        self.permissions.len()
    }
}

#[derive(Debug, Default)]
struct CacheSlot {
    generation: u64,
    catalog: Option<Arc<PermissionCatalog>>,
}

#[derive(Debug, Default)]
struct CacheState {
    /// Bumped by `clear`, which also covers scopes that have no slot yet.
    epoch: u64,
    slots: HashMap<CacheKey, CacheSlot>,
}

impl CacheState {
    fn version(&self, key: &CacheKey) -> (u64, u64) {
        let generation = self.slots.get(key).map_or(0, |slot| slot.generation);
        (self.epoch, generation)
    }
}

/// Process-wide catalog cache keyed by (tenant, guard).
///
/// Entries load lazily and live until invalidated. Each slot carries a
/// generation counter and the cache an epoch, so a load that raced with an
/// invalidation or a clear is returned to its caller but never installed.
#[derive(Debug, Default)]
pub struct PermissionCache {
    state: RwLock<CacheState>,
}

impl PermissionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached catalog for a scope, loading it on a miss.
    pub async fn get_or_load<F, Fut>(
        &self,
        key: &CacheKey,
        load: F,
    ) -> AppResult<Arc<PermissionCatalog>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<ScopeCatalog>>,
    {
        let observed_version = {
            let state = self.state.read().await;
            if let Some(catalog) = state.slots.get(key).and_then(|slot| slot.catalog.as_ref()) {
                debug!(tenant_id = %key.tenant_id, guard = %key.guard_name, "permission cache hit");
                return Ok(Arc::clone(catalog));
            }
            state.version(key)
        };

        debug!(tenant_id = %key.tenant_id, guard = %key.guard_name, "permission cache miss");
        let loaded = Arc::new(PermissionCatalog::from(load().await?));

        let mut state = self.state.write().await;
        if state.version(key) != observed_version {
            debug!(
                tenant_id = %key.tenant_id,
                guard = %key.guard_name,
                "permission cache invalidated during load; result not stored"
            );
            return Ok(loaded);
        }

        let slot = state.slots.entry(key.clone()).or_default();
        match &slot.catalog {
            Some(existing) => Ok(Arc::clone(existing)),
            None => {
                slot.catalog = Some(Arc::clone(&loaded));
                Ok(loaded)
            }
        }
    }

    /// Drops the cached catalog of one scope.
    pub async fn invalidate(&self, tenant_id: TenantId, guard_name: &GuardName) {
        let key = CacheKey::new(tenant_id, guard_name.clone());
        let mut state = self.state.write().await;
        let slot = state.slots.entry(key).or_default();
        slot.generation = slot.generation.wrapping_add(1);
        slot.catalog = None;
        debug!(%tenant_id, guard = %guard_name, "permission cache invalidated");
    }

    /// Drops every cached catalog.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.epoch = state.epoch.wrapping_add(1);
        for slot in state.slots.values_mut() {
            slot.catalog = None;
        }
        debug!(scopes = state.slots.len(), "permission cache cleared");
    }

    /// Returns whether a scope currently holds a loaded catalog.
    pub async fn is_cached(&self, tenant_id: TenantId, guard_name: &GuardName) -> bool {
        let key = CacheKey::new(tenant_id, guard_name.clone());
        self.state
            .read()
            .await
            .slots
            .get(&key)
            .is_some_and(|slot| slot.catalog.is_some())
    }
}
