use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use warrant_core::{
    AppError, AppResult, AuthContext, Principal, PrincipalIdentity, TenantId,
};
use warrant_domain::{GuardName, Permission, PermissionId, PermissionRef, Role, RoleId, RoleRef};

use crate::{
    AccessDecision, AuthorizationConfig, EntityStore, GuardDefinition, PermissionCache,
    PermissionGate, ScopeCatalog, parse_allow_list,
};

use super::AuthorizationService;

#[derive(Default)]
struct FakeState {
    next_id: i64,
    roles: Vec<Role>,
    permissions: Vec<Permission>,
    role_permissions: BTreeSet<(TenantId, RoleId, PermissionId)>,
    principal_roles: BTreeSet<(TenantId, Principal, RoleId)>,
    principal_permissions: BTreeSet<(TenantId, Principal, PermissionId)>,
}

#[derive(Default)]
struct FakeEntityStore {
    state: Mutex<FakeState>,
    catalog_loads: AtomicUsize,
}

#[async_trait]
impl EntityStore for FakeEntityStore {
    async fn create_role(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Role> {
        let mut state = self.state.lock().await;
        if state.roles.iter().any(|role| {
            role.tenant_id() == tenant_id && role.name() == name && role.guard_name() == guard_name
        }) {
            return Err(AppError::AlreadyExists(format!("role '{name}'")));
        }

        state.next_id += 1;
        let role = Role::new(
            RoleId::new(state.next_id),
            tenant_id,
            name,
            guard_name.clone(),
            Utc::now(),
        )?;
        state.roles.push(role.clone());
        Ok(role)
    }

    async fn find_or_create_role(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Role> {
        match self.find_role_by_name(tenant_id, name, guard_name).await? {
            Some(role) => Ok(role),
            None => self.create_role(tenant_id, name, guard_name).await,
        }
    }

    async fn find_role_by_name(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Option<Role>> {
        Ok(self
            .state
            .lock()
            .await
            .roles
            .iter()
            .find(|role| {
                role.tenant_id() == tenant_id
                    && role.name() == name
                    && role.guard_name() == guard_name
            })
            .cloned())
    }

    async fn find_role_by_id(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> AppResult<Option<Role>> {
        Ok(self
            .state
            .lock()
            .await
            .roles
            .iter()
            .find(|role| role.tenant_id() == tenant_id && role.id() == role_id)
            .cloned())
    }

    async fn list_roles(
        &self,
        tenant_id: TenantId,
        guard_name: Option<&GuardName>,
    ) -> AppResult<Vec<Role>> {
        Ok(self
            .state
            .lock()
            .await
            .roles
            .iter()
            .filter(|role| {
                role.tenant_id() == tenant_id
                    && guard_name.is_none_or(|guard_name| role.guard_name() == guard_name)
            })
            .cloned()
            .collect())
    }

    async fn delete_role(&self, tenant_id: TenantId, role_id: RoleId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state
            .roles
            .retain(|role| !(role.tenant_id() == tenant_id && role.id() == role_id));
        state
            .role_permissions
            .retain(|(tenant, role, _)| !(*tenant == tenant_id && *role == role_id));
        state
            .principal_roles
            .retain(|(tenant, _, role)| !(*tenant == tenant_id && *role == role_id));
        Ok(())
    }

    async fn create_permission(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Permission> {
        let mut state = self.state.lock().await;
        if state.permissions.iter().any(|permission| {
            permission.tenant_id() == tenant_id
                && permission.name() == name
                && permission.guard_name() == guard_name
        }) {
            return Err(AppError::AlreadyExists(format!("permission '{name}'")));
        }

        state.next_id += 1;
        let permission = Permission::new(
            PermissionId::new(state.next_id),
            tenant_id,
            name,
            guard_name.clone(),
            Utc::now(),
        )?;
        state.permissions.push(permission.clone());
        Ok(permission)
    }

    async fn find_or_create_permission(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Permission> {
        match self
            .find_permission_by_name(tenant_id, name, guard_name)
            .await?
        {
            Some(permission) => Ok(permission),
            None => self.create_permission(tenant_id, name, guard_name).await,
        }
    }

    async fn find_permission_by_name(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Option<Permission>> {
        Ok(self
            .state
            .lock()
            .await
            .permissions
            .iter()
            .find(|permission| {
                permission.tenant_id() == tenant_id
                    && permission.name() == name
                    && permission.guard_name() == guard_name
            })
            .cloned())
    }

    async fn find_permission_by_id(
        &self,
        tenant_id: TenantId,
        permission_id: PermissionId,
    ) -> AppResult<Option<Permission>> {
        Ok(self
            .state
            .lock()
            .await
            .permissions
            .iter()
            .find(|permission| {
                permission.tenant_id() == tenant_id && permission.id() == permission_id
            })
            .cloned())
    }

    async fn list_permissions(
        &self,
        tenant_id: TenantId,
        guard_name: Option<&GuardName>,
    ) -> AppResult<Vec<Permission>> {
        Ok(self
            .state
            .lock()
            .await
            .permissions
            .iter()
            .filter(|permission| {
                permission.tenant_id() == tenant_id
                    && guard_name.is_none_or(|guard_name| permission.guard_name() == guard_name)
            })
            .cloned()
            .collect())
    }

    async fn delete_permission(
        &self,
        tenant_id: TenantId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.permissions.retain(|permission| {
            !(permission.tenant_id() == tenant_id && permission.id() == permission_id)
        });
        state
            .role_permissions
            .retain(|(tenant, _, permission)| !(*tenant == tenant_id && *permission == permission_id));
        state
            .principal_permissions
            .retain(|(tenant, _, permission)| !(*tenant == tenant_id && *permission == permission_id));
        Ok(())
    }

    async fn attach_permissions_to_role(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
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
            .lock()
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
        let mut state = self.state.lock().await;
        state
            .role_permissions
            .retain(|(tenant, role, _)| !(*tenant == tenant_id && *role == role_id));
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
        self.state
            .lock()
            .await
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
            .lock()
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
        let mut state = self.state.lock().await;
        state
            .principal_roles
            .retain(|(tenant, holder, _)| !(*tenant == tenant_id && holder == principal));
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
        self.state
            .lock()
            .await
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
            .lock()
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
        let mut state = self.state.lock().await;
        state
            .principal_permissions
            .retain(|(tenant, holder, _)| !(*tenant == tenant_id && holder == principal));
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
            .lock()
            .await
            .principal_roles
            .iter()
            .filter(|(tenant, holder, _)| *tenant == tenant_id && holder == principal)
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
            .lock()
            .await
            .principal_permissions
            .iter()
            .filter(|(tenant, holder, _)| *tenant == tenant_id && holder == principal)
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
            .lock()
            .await
            .principal_roles
            .iter()
            .filter(|(tenant, _, role)| *tenant == tenant_id && *role == role_id)
            .map(|(_, principal, _)| principal.clone())
            .collect())
    }

    async fn load_catalog(
        &self,
        tenant_id: TenantId,
        guard_name: &GuardName,
    ) -> AppResult<ScopeCatalog> {
        self.catalog_loads.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().await;

        Ok(ScopeCatalog {
            roles: state
                .roles
                .iter()
                .filter(|role| role.tenant_id() == tenant_id && role.guard_name() == guard_name)
                .cloned()
                .collect(),
            permissions: state
                .permissions
                .iter()
                .filter(|permission| {
                    permission.tenant_id() == tenant_id && permission.guard_name() == guard_name
                })
                .cloned()
                .collect(),
            role_permissions: state
                .role_permissions
                .iter()
                .filter(|(tenant, _, _)| *tenant == tenant_id)
                .map(|(_, role_id, permission_id)| (*role_id, *permission_id))
                .collect(),
        })
    }
}

fn config(wildcard_enabled: bool) -> AuthorizationConfig {
    AuthorizationConfig {
        default_guard: "web".to_owned(),
        tenant_scope_enabled: true,
        wildcard_enabled,
        guards: vec![
            GuardDefinition::new("web", "user"),
            GuardDefinition::new("admin", "admin_user"),
        ],
    }
}

fn service_with(config: &AuthorizationConfig) -> (AuthorizationService, Arc<FakeEntityStore>) {
    let store = Arc::new(FakeEntityStore::default());
    let service = AuthorizationService::new(
        store.clone(),
        Arc::new(PermissionCache::new()),
        config,
    );

    match service {
        Ok(service) => (service, store),
        Err(error) => panic!("service config should be valid: {error}"),
    }
}

fn principal(principal_type: &str, principal_id: &str) -> Principal {
    match Principal::new(principal_type, principal_id) {
        Ok(principal) => principal,
        Err(error) => panic!("principal should be valid: {error}"),
    }
}

fn context_for(tenant_id: TenantId) -> AuthContext {
    AuthContext::authenticated(PrincipalIdentity::new(principal("user", "actor"), tenant_id))
}

async fn seed_permission(
    service: &AuthorizationService,
    context: &AuthContext,
    name: &str,
    guard_name: Option<&str>,
) -> Permission {
    match service.create_permission(context, name, guard_name).await {
        Ok(permission) => permission,
        Err(error) => panic!("permission '{name}' should be created: {error}"),
    }
}

async fn seed_role(service: &AuthorizationService, context: &AuthContext, name: &str) -> Role {
    match service.create_role(context, name, None).await {
        Ok(role) => role,
        Err(error) => panic!("role '{name}' should be created: {error}"),
    }
}

#[tokio::test]
async fn direct_grant_is_visible_after_cached_denial() {
    let (service, _) = service_with(&config(false));
    let context = context_for(TenantId::new());
    let alice = principal("user", "alice");
    seed_permission(&service, &context, "posts.edit", None).await;

    let before = service
        .has_permission_to(&context, &alice, "posts.edit", None)
        .await;
    assert!(matches!(before, Ok(false)));

    let granted = service
        .give_permission_to(&context, &alice, "posts.edit")
        .await;
    assert!(granted.is_ok());

    let after = service
        .has_permission_to(&context, &alice, "posts.edit", None)
        .await;
    assert!(matches!(after, Ok(true)));
}

#[tokio::test]
async fn permission_inherited_through_role() {
    let (service, _) = service_with(&config(false));
    let context = context_for(TenantId::new());
    let alice = principal("user", "alice");
    seed_permission(&service, &context, "posts.edit", None).await;
    seed_role(&service, &context, "editor").await;

    let attached = service
        .give_permission_to_role(&context, "editor", "posts.edit", None)
        .await;
    assert!(attached.is_ok());
    assert!(service.assign_role(&context, &alice, "editor").await.is_ok());

    let result = service
        .has_permission_to(&context, &alice, "posts.edit", None)
        .await;
    assert!(matches!(result, Ok(true)));

    let names = service.permission_names(&context, &alice).await;
    assert_eq!(names.unwrap_or_default(), vec!["posts.edit".to_owned()]);
    let via_roles = service.permissions_via_roles(&context, &alice).await;
    assert_eq!(via_roles.map(|values| values.len()).unwrap_or_default(), 1);
    let direct = service.direct_permissions(&context, &alice).await;
    assert!(direct.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn revoking_sole_role_removes_permission() {
    let (service, _) = service_with(&config(false));
    let context = context_for(TenantId::new());
    let alice = principal("user", "alice");
    seed_permission(&service, &context, "posts.delete", None).await;
    seed_role(&service, &context, "moderator").await;
    assert!(
        service
            .give_permission_to_role(&context, "moderator", "posts.delete", None)
            .await
            .is_ok()
    );
    assert!(service.assign_role(&context, &alice, "moderator").await.is_ok());
    assert!(matches!(
        service
            .has_permission_to(&context, &alice, "posts.delete", None)
            .await,
        Ok(true)
    ));

    assert!(service.revoke_role(&context, &alice, "moderator").await.is_ok());

    assert!(matches!(
        service
            .has_permission_to(&context, &alice, "posts.delete", None)
            .await,
        Ok(false)
    ));
    assert!(service.permissions(&context, &alice).await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn unknown_permission_is_not_found() {
    let (service, _) = service_with(&config(false));
    let context = context_for(TenantId::new());
    let alice = principal("user", "alice");

    let by_name = service
        .has_permission_to(&context, &alice, "missing", None)
        .await;
    assert!(matches!(by_name, Err(AppError::NotFound(_))));

    let by_id = service
        .has_permission_to(&context, &alice, PermissionId::new(404), None)
        .await;
    assert!(matches!(by_id, Err(AppError::NotFound(_))));

    let checked = service
        .check_permission_to(&context, &alice, "missing", None)
        .await;
    assert!(matches!(checked, Ok(false)));
}

#[tokio::test]
async fn foreign_guard_permission_is_guard_mismatch() {
    let (service, _) = service_with(&config(false));
    let context = context_for(TenantId::new());
    let alice = principal("user", "alice");
    let admin_permission = seed_permission(&service, &context, "posts.edit", Some("admin")).await;

    let resolved = service
        .has_permission_to(&context, &alice, &admin_permission, None)
        .await;
    assert!(matches!(resolved, Err(AppError::GuardMismatch(_))));

    let by_name = service
        .has_permission_to(&context, &alice, "posts.edit", Some("admin"))
        .await;
    assert!(matches!(by_name, Err(AppError::GuardMismatch(_))));

    let grant = service
        .give_permission_to(&context, &alice, admin_permission.id())
        .await;
    assert!(matches!(grant, Err(AppError::GuardMismatch(_))));
}

#[tokio::test]
async fn assigning_foreign_guard_role_is_rejected() {
    let (service, _) = service_with(&config(false));
    let context = context_for(TenantId::new());
    let alice = principal("user", "alice");
    let admin_role = service.create_role(&context, "root", Some("admin")).await;
    let Ok(admin_role) = admin_role else {
        panic!("admin role should be created");
    };

    let result = service.assign_role(&context, &alice, admin_role.id()).await;
    assert!(matches!(result, Err(AppError::GuardMismatch(_))));
    assert!(service.roles(&context, &alice).await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn role_and_permission_guards_must_match() {
    let (service, _) = service_with(&config(false));
    let context = context_for(TenantId::new());
    let admin_permission = seed_permission(&service, &context, "users.ban", Some("admin")).await;
    seed_role(&service, &context, "editor").await;

    let result = service
        .give_permission_to_role(&context, "editor", admin_permission, None)
        .await;
    assert!(matches!(result, Err(AppError::GuardMismatch(_))));
}

#[tokio::test]
async fn duplicate_role_is_already_exists() {
    let (service, store) = service_with(&config(false));
    let context = context_for(TenantId::new());
    seed_role(&service, &context, "editor").await;

    let duplicate = service.create_role(&context, " editor ", None).await;
    assert!(matches!(duplicate, Err(AppError::AlreadyExists(_))));
    assert_eq!(store.state.lock().await.roles.len(), 1);

    let found = service.find_or_create_role(&context, "editor", None).await;
    assert!(matches!(found, Ok(ref role) if role.name() == "editor"));
    assert_eq!(store.state.lock().await.roles.len(), 1);
}

#[tokio::test]
async fn roles_are_invisible_across_tenants() {
    let (service, _) = service_with(&config(false));
    let first = context_for(TenantId::new());
    let second = context_for(TenantId::new());
    let role = seed_role(&service, &first, "editor").await;

    let listed = service.list_roles(&second, None).await;
    assert!(listed.unwrap_or_default().is_empty());

    let by_name = service.find_role(&second, "editor", None).await;
    assert!(matches!(by_name, Err(AppError::NotFound(_))));
    let by_id = service.find_role(&second, role.id(), None).await;
    assert!(matches!(by_id, Err(AppError::NotFound(_))));
    let resolved = service.find_role(&second, &role, None).await;
    assert!(matches!(resolved, Err(AppError::NotFound(_))));

    let assign = service
        .assign_role(&second, &principal("user", "bob"), role.id())
        .await;
    assert!(matches!(assign, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn anonymous_context_is_unauthenticated_when_tenant_scoped() {
    let (service, _) = service_with(&config(false));
    let result = service
        .list_roles(&AuthContext::anonymous(), None)
        .await;
    assert!(matches!(result, Err(AppError::Unauthenticated(_))));
}

#[tokio::test]
async fn disabled_tenant_scope_uses_global_tenant() {
    let config = AuthorizationConfig {
        tenant_scope_enabled: false,
        ..config(false)
    };
    let (service, _) = service_with(&config);
    let anonymous = AuthContext::anonymous();
    let role = seed_role(&service, &anonymous, "editor").await;
    assert!(role.tenant_id().is_global());

    let other = context_for(TenantId::new());
    let listed = service.list_roles(&other, None).await;
    assert_eq!(listed.map(|roles| roles.len()).unwrap_or_default(), 1);
}

#[tokio::test]
async fn wildcard_grant_matches_family() {
    let (service, _) = service_with(&config(true));
    let context = context_for(TenantId::new());
    let alice = principal("user", "alice");
    seed_permission(&service, &context, "posts.*", None).await;
    for name in ["posts.edit", "posts.delete", "comments.edit"] {
        seed_permission(&service, &context, name, None).await;
    }
    assert!(service.give_permission_to(&context, &alice, "posts.*").await.is_ok());

    for (requested, expected) in [
        ("posts.edit", true),
        ("posts.delete", true),
        ("comments.edit", false),
    ] {
        let result = service
            .has_permission_to(&context, &alice, requested, None)
            .await;
        assert!(
            matches!(result, Ok(value) if value == expected),
            "unexpected result for {requested}"
        );
    }
}

#[tokio::test]
async fn exact_mode_treats_wildcard_literally() {
    let (service, _) = service_with(&config(false));
    let context = context_for(TenantId::new());
    let alice = principal("user", "alice");
    seed_permission(&service, &context, "posts.*", None).await;
    seed_permission(&service, &context, "posts.edit", None).await;
    assert!(service.give_permission_to(&context, &alice, "posts.*").await.is_ok());

    let literal = service
        .has_permission_to(&context, &alice, "posts.*", None)
        .await;
    assert!(matches!(literal, Ok(true)));
    let concrete = service
        .has_permission_to(&context, &alice, "posts.edit", None)
        .await;
    assert!(matches!(concrete, Ok(false)));
}

#[tokio::test]
async fn wildcard_role_grant_applies_to_role_checks() {
    let (service, _) = service_with(&config(true));
    let context = context_for(TenantId::new());
    seed_permission(&service, &context, "reports.*", None).await;
    seed_permission(&service, &context, "reports.export", None).await;
    seed_role(&service, &context, "analyst").await;
    assert!(
        service
            .give_permission_to_role(&context, "analyst", "reports.*", None)
            .await
            .is_ok()
    );

    let result = service
        .role_has_permission_to(&context, "analyst", "reports.export", None)
        .await;
    assert!(matches!(result, Ok(true)));
}

#[tokio::test]
async fn catalog_is_loaded_once_until_mutation() {
    let (service, store) = service_with(&config(false));
    let context = context_for(TenantId::new());
    let alice = principal("user", "alice");
    seed_permission(&service, &context, "posts.edit", None).await;

    for _ in 0..3 {
        assert!(
            service
                .has_permission_to(&context, &alice, "posts.edit", None)
                .await
                .is_ok()
        );
    }
    assert_eq!(store.catalog_loads.load(Ordering::SeqCst), 1);

    seed_permission(&service, &context, "posts.delete", None).await;
    assert!(
        service
            .has_permission_to(&context, &alice, "posts.delete", None)
            .await
            .is_ok()
    );
    assert_eq!(store.catalog_loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn catalog_miss_falls_back_to_store_and_refreshes() {
    let (service, store) = service_with(&config(false));
    let tenant_id = TenantId::new();
    let context = context_for(tenant_id);
    let alice = principal("user", "alice");
    seed_permission(&service, &context, "posts.edit", None).await;
    assert!(
        service
            .has_permission_to(&context, &alice, "posts.edit", None)
            .await
            .is_ok()
    );
    assert_eq!(store.catalog_loads.load(Ordering::SeqCst), 1);

    // Written behind the service's back, as another process would.
    {
        let mut state = store.state.lock().await;
        let web = GuardName::new("web").unwrap_or_else(|_| unreachable!());
        let exported = Permission::new(
            PermissionId::new(900),
            tenant_id,
            "posts.export",
            web.clone(),
            Utc::now(),
        )
        .unwrap_or_else(|_| unreachable!());
        let reviewer = Role::new(RoleId::new(901), tenant_id, "reviewer", web, Utc::now())
            .unwrap_or_else(|_| unreachable!());
        state.permissions.push(exported.clone());
        state.roles.push(reviewer);
        state
            .principal_permissions
            .insert((tenant_id, alice.clone(), exported.id()));
    }

    let exported = service
        .has_permission_to(&context, &alice, "posts.export", None)
        .await;
    assert!(matches!(exported, Ok(true)));
    assert_eq!(store.catalog_loads.load(Ordering::SeqCst), 2);

    assert!(service.assign_role(&context, &alice, "reviewer").await.is_ok());
    assert!(matches!(
        service.has_role(&context, &alice, "reviewer").await,
        Ok(true)
    ));

    let unknown = service
        .has_permission_to(&context, &alice, "posts.archive", None)
        .await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn sync_replaces_roles_and_permissions() {
    let (service, _) = service_with(&config(false));
    let context = context_for(TenantId::new());
    let alice = principal("user", "alice");
    for name in ["editor", "viewer", "owner"] {
        seed_role(&service, &context, name).await;
    }
    for name in ["a", "b"] {
        seed_permission(&service, &context, name, None).await;
    }
    assert!(service.assign_role(&context, &alice, "owner").await.is_ok());

    let synced = service
        .sync_roles(&context, &alice, vec!["editor".into(), "viewer".into()])
        .await;
    assert!(synced.is_ok());
    assert_eq!(
        service.role_names(&context, &alice).await.unwrap_or_default(),
        vec!["editor".to_owned(), "viewer".to_owned()]
    );

    let failed = service
        .sync_roles(&context, &alice, vec!["owner".into(), "missing".into()])
        .await;
    assert!(matches!(failed, Err(AppError::NotFound(_))));
    assert_eq!(
        service.role_names(&context, &alice).await.unwrap_or_default(),
        vec!["editor".to_owned(), "viewer".to_owned()]
    );

    assert!(
        service
            .sync_permissions(&context, &alice, vec![PermissionRef::from("b")])
            .await
            .is_ok()
    );
    assert_eq!(
        service
            .permission_names(&context, &alice)
            .await
            .unwrap_or_default(),
        vec!["b".to_owned()]
    );
}

#[tokio::test]
async fn role_checks_cover_any_and_all() {
    let (service, _) = service_with(&config(false));
    let context = context_for(TenantId::new());
    let alice = principal("user", "alice");
    let editor = seed_role(&service, &context, "editor").await;
    seed_role(&service, &context, "viewer").await;
    assert!(service.assign_role(&context, &alice, &editor).await.is_ok());

    assert!(matches!(service.has_role(&context, &alice, "editor").await, Ok(true)));
    assert!(matches!(service.has_role(&context, &alice, editor.id()).await, Ok(true)));
    assert!(matches!(service.has_role(&context, &alice, "viewer").await, Ok(false)));
    assert!(matches!(
        service
            .has_any_role(&context, &alice, vec![RoleRef::from("viewer"), RoleRef::from("editor")])
            .await,
        Ok(true)
    ));
    assert!(matches!(
        service
            .has_all_roles(&context, &alice, vec![RoleRef::from("viewer"), RoleRef::from("editor")])
            .await,
        Ok(false)
    ));
}

#[tokio::test]
async fn permission_checks_cover_any_and_all() {
    let (service, _) = service_with(&config(false));
    let context = context_for(TenantId::new());
    let alice = principal("user", "alice");
    seed_permission(&service, &context, "posts.edit", None).await;
    seed_permission(&service, &context, "posts.delete", None).await;
    assert!(service.give_permission_to(&context, &alice, "posts.edit").await.is_ok());

    let any = service
        .has_any_permission(
            &context,
            &alice,
            vec!["missing".into(), "posts.delete".into(), "posts.edit".into()],
        )
        .await;
    assert!(matches!(any, Ok(true)));

    let all = service
        .has_all_permissions(&context, &alice, vec!["posts.edit".into(), "posts.delete".into()])
        .await;
    assert!(matches!(all, Ok(false)));
}

#[tokio::test]
async fn deleting_role_cascades_assignments() {
    let (service, store) = service_with(&config(false));
    let context = context_for(TenantId::new());
    let alice = principal("user", "alice");
    seed_permission(&service, &context, "posts.edit", None).await;
    seed_role(&service, &context, "editor").await;
    assert!(
        service
            .give_permission_to_role(&context, "editor", "posts.edit", None)
            .await
            .is_ok()
    );
    assert!(service.assign_role(&context, &alice, "editor").await.is_ok());

    assert!(service.delete_role(&context, "editor", None).await.is_ok());

    assert!(matches!(
        service
            .has_permission_to(&context, &alice, "posts.edit", None)
            .await,
        Ok(false)
    ));
    assert!(store.state.lock().await.principal_roles.is_empty());
    assert!(matches!(
        service.delete_role(&context, "editor", None).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn principals_with_role_are_filtered_by_guard_model() {
    let (service, store) = service_with(&config(false));
    let tenant_id = TenantId::new();
    let context = context_for(tenant_id);
    let role = seed_role(&service, &context, "editor").await;
    assert!(
        service
            .assign_role(&context, &principal("user", "alice"), "editor")
            .await
            .is_ok()
    );
    store.state.lock().await.principal_roles.insert((
        tenant_id,
        principal("admin_user", "root"),
        role.id(),
    ));

    let holders = service.principals_with_role(&context, "editor", None).await;
    assert_eq!(holders.unwrap_or_default(), vec![principal("user", "alice")]);
}

#[tokio::test]
async fn principals_with_role_on_unconfigured_guard_use_fallback_types() {
    let config = AuthorizationConfig {
        default_guard: "web".to_owned(),
        tenant_scope_enabled: true,
        wildcard_enabled: false,
        guards: vec![GuardDefinition::new("admin", "admin_user")],
    };
    let (service, store) = service_with(&config);
    let tenant_id = TenantId::new();
    let context = context_for(tenant_id);
    let role = seed_role(&service, &context, "editor").await;
    assert_eq!(role.guard_name().as_str(), "web");
    assert!(
        service
            .assign_role(&context, &principal("service", "indexer"), "editor")
            .await
            .is_ok()
    );
    store.state.lock().await.principal_roles.insert((
        tenant_id,
        principal("admin_user", "root"),
        role.id(),
    ));

    let holders = service.principals_with_role(&context, "editor", None).await;
    assert_eq!(
        holders.unwrap_or_default(),
        vec![principal("service", "indexer")]
    );
}

#[tokio::test]
async fn gate_short_circuits_on_first_granted_permission() {
    let (service, _) = service_with(&config(false));
    let tenant_id = TenantId::new();
    let actor = principal("user", "actor");
    let context = context_for(tenant_id);
    seed_permission(&service, &context, "posts.publish", None).await;
    assert!(
        service
            .give_permission_to(&context, &actor, "posts.publish")
            .await
            .is_ok()
    );
    let gate = PermissionGate::new(service);

    let decision = gate
        .authorize_permissions(&context, &parse_allow_list("missing | posts.publish"), None)
        .await;
    assert!(matches!(decision, Ok(AccessDecision::Allowed(ref value)) if value == "posts.publish"));

    let denied = gate
        .authorize_permissions(&context, &parse_allow_list("posts.delete|missing"), None)
        .await;
    let Ok(denied) = denied else {
        panic!("gate should decide");
    };
    assert_eq!(
        denied,
        AccessDecision::Forbidden(vec!["posts.delete".to_owned(), "missing".to_owned()])
    );
    assert!(matches!(denied.into_result(), Err(AppError::Forbidden(_))));

    let anonymous = gate
        .authorize_permissions(&AuthContext::anonymous(), &parse_allow_list("posts.publish"), None)
        .await;
    assert!(matches!(anonymous, Ok(AccessDecision::Unauthenticated)));
}

#[tokio::test]
async fn gate_accepts_roles_or_permissions() {
    let (service, _) = service_with(&config(false));
    let context = context_for(TenantId::new());
    let actor = principal("user", "actor");
    seed_role(&service, &context, "admin").await;
    assert!(service.assign_role(&context, &actor, "admin").await.is_ok());
    let gate = PermissionGate::new(service);

    let by_role = gate.authorize_roles(&context, &parse_allow_list("admin")).await;
    assert!(matches!(by_role, Ok(AccessDecision::Allowed(_))));

    let mixed = gate
        .authorize_roles_or_permissions(&context, &parse_allow_list("writer|admin"))
        .await;
    assert!(matches!(mixed, Ok(ref decision) if decision.is_allowed()));

    let denied = gate
        .authorize_roles_or_permissions(&context, &parse_allow_list("writer"))
        .await;
    assert!(matches!(denied, Ok(AccessDecision::Forbidden(_))));
}
