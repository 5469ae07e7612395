use serde::{Deserialize, Serialize};
use warrant_core::{Principal, PrincipalIdentity};
use warrant_domain::{Permission, Role};

/// Health response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Optional guard selector accepted by management routes.
#[derive(Debug, Default, Deserialize)]
pub struct GuardQuery {
    pub guard: Option<String>,
}

/// Incoming payload for role creation.
#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    pub guard_name: Option<String>,
}

/// Incoming payload for permission creation.
#[derive(Debug, Deserialize)]
pub struct CreatePermissionRequest {
    pub name: String,
    pub guard_name: Option<String>,
}

/// Names one permission.
#[derive(Debug, Deserialize)]
pub struct PermissionNameRequest {
    pub permission: String,
}

/// Names one role.
#[derive(Debug, Deserialize)]
pub struct RoleNameRequest {
    pub role: String,
}

/// Complete permission set for a sync operation.
#[derive(Debug, Deserialize)]
pub struct SyncPermissionsRequest {
    pub permissions: Vec<String>,
}

/// Complete role set for a sync operation.
#[derive(Debug, Deserialize)]
pub struct SyncRolesRequest {
    pub roles: Vec<String>,
}

/// API representation of a principal reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalDto {
    pub principal_type: String,
    pub principal_id: String,
}

impl From<&Principal> for PrincipalDto {
    fn from(value: &Principal) -> Self {
        Self {
            principal_type: value.principal_type().to_owned(),
            principal_id: value.principal_id().to_owned(),
        }
    }
}

impl From<Principal> for PrincipalDto {
    fn from(value: Principal) -> Self {
        Self::from(&value)
    }
}

/// Permission check against the current principal or an explicit one.
#[derive(Debug, Deserialize)]
pub struct CheckPermissionRequest {
    pub permission: String,
    pub guard_name: Option<String>,
    pub principal: Option<PrincipalDto>,
}

/// Result of a permission check.
#[derive(Debug, Serialize)]
pub struct CheckPermissionResponse {
    pub principal: PrincipalDto,
    pub permission: String,
    pub allowed: bool,
}

/// API representation of a role.
#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub id: i64,
    pub name: String,
    pub guard_name: String,
    pub created_at: String,
}

impl From<Role> for RoleResponse {
    fn from(value: Role) -> Self {
        Self {
            id: value.id().as_i64(),
            name: value.name().to_owned(),
            guard_name: value.guard_name().as_str().to_owned(),
            created_at: value.created_at().to_rfc3339(),
        }
    }
}

/// API representation of a permission.
#[derive(Debug, Serialize)]
pub struct PermissionResponse {
    pub id: i64,
    pub name: String,
    pub guard_name: String,
    pub created_at: String,
}

impl From<Permission> for PermissionResponse {
    fn from(value: Permission) -> Self {
        Self {
            id: value.id().as_i64(),
            name: value.name().to_owned(),
            guard_name: value.guard_name().as_str().to_owned(),
            created_at: value.created_at().to_rfc3339(),
        }
    }
}

/// Roles and effective permission names of a principal.
#[derive(Debug, Serialize)]
pub struct AccessSummaryResponse {
    pub principal: PrincipalDto,
    pub tenant_id: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

impl AccessSummaryResponse {
    /// Creates a summary for an authenticated identity.
    #[must_use]
    pub fn new(identity: &PrincipalIdentity, roles: Vec<String>, permissions: Vec<String>) -> Self {
        Self {
            principal: PrincipalDto::from(identity.principal()),
            tenant_id: identity.tenant_id().to_string(),
            roles,
            permissions,
        }
    }
}
