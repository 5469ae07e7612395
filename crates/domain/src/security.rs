use std::fmt::{Display, Formatter};

use crate::{Permission, PermissionId, Role, RoleId};

/// Reference to a permission by name, by id, or as an already-loaded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionRef {
    /// Permission name, looked up within a guard.
    ByName(String),
    /// Store identifier.
    ById(PermissionId),
    /// Already-resolved record.
    Resolved(Permission),
}

impl Display for PermissionRef {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ByName(name) => write!(formatter, "permission '{name}'"),
            Self::ById(id) => write!(formatter, "permission #{id}"),
            Self::Resolved(permission) => write!(formatter, "permission '{}'", permission.name()),
        }
    }
}

impl From<&str> for PermissionRef {
    fn from(value: &str) -> Self {
        Self::ByName(value.to_owned())
    }
}

impl From<String> for PermissionRef {
    fn from(value: String) -> Self {
        Self::ByName(value)
    }
}

impl From<PermissionId> for PermissionRef {
    fn from(value: PermissionId) -> Self {
        Self::ById(value)
    }
}

impl From<Permission> for PermissionRef {
    fn from(value: Permission) -> Self {
        Self::Resolved(value)
    }
}

impl From<&Permission> for PermissionRef {
    fn from(value: &Permission) -> Self {
        Self::Resolved(value.clone())
    }
}

/// Reference to a role by name, by id, or as an already-loaded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleRef {
    /// Role name, looked up within a guard.
    ByName(String),
    /// Store identifier.
    ById(RoleId),
    /// Already-resolved record.
    Resolved(Role),
}

impl Display for RoleRef {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ByName(name) => write!(formatter, "role '{name}'"),
            Self::ById(id) => write!(formatter, "role #{id}"),
            Self::Resolved(role) => write!(formatter, "role '{}'", role.name()),
        }
    }
}

impl From<&str> for RoleRef {
    fn from(value: &str) -> Self {
        Self::ByName(value.to_owned())
    }
}

impl From<String> for RoleRef {
    fn from(value: String) -> Self {
        Self::ByName(value)
    }
}

impl From<RoleId> for RoleRef {
    fn from(value: RoleId) -> Self {
        Self::ById(value)
    }
}

impl From<Role> for RoleRef {
    fn from(value: Role) -> Self {
        Self::Resolved(value)
    }
}

impl From<&Role> for RoleRef {
    fn from(value: &Role) -> Self {
        Self::Resolved(value.clone())
    }
}
