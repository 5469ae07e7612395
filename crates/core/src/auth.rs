use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult, NonEmptyString, TenantId};

/// Opaque actor reference: a principal type (for example `user`) and its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Principal {
    principal_type: NonEmptyString,
    principal_id: NonEmptyString,
}

impl Principal {
    /// Creates a principal reference from its type and id.
    pub fn new(
        principal_type: impl Into<String>,
        principal_id: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            principal_type: NonEmptyString::new(principal_type)?,
            principal_id: NonEmptyString::new(principal_id)?,
        })
    }

    /// Returns the principal type used for guard resolution.
    #[must_use]
    pub fn principal_type(&self) -> &str {
        self.principal_type.as_str()
    }

    /// Returns the principal id within its type.
    #[must_use]
    pub fn principal_id(&self) -> &str {
        self.principal_id.as_str()
    }
}

impl Display for Principal {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}:{}", self.principal_type, self.principal_id)
    }
}

/// Authenticated principal together with the tenant it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalIdentity {
    principal: Principal,
    tenant_id: TenantId,
}

impl PrincipalIdentity {
    /// Creates an identity from an authenticated principal and its tenant.
    #[must_use]
    pub fn new(principal: Principal, tenant_id: TenantId) -> Self {
        Self {
            principal,
            tenant_id,
        }
    }

    /// Returns the authenticated principal.
    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Returns the tenant linked to the identity.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Request-scoped authentication context handed to authorization calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    current: Option<PrincipalIdentity>,
}

impl AuthContext {
    /// Creates a context for an authenticated principal.
    #[must_use]
    pub fn authenticated(identity: PrincipalIdentity) -> Self {
        Self {
            current: Some(identity),
        }
    }

    /// Creates a context without an authenticated principal.
    #[must_use]
    pub fn anonymous() -> Self {
        Self { current: None }
    }

    /// Returns the authenticated principal, failing when none is present.
    pub fn current_principal(&self) -> AppResult<&PrincipalIdentity> {
        self.current.as_ref().ok_or_else(|| {
            AppError::Unauthenticated("no principal in authentication context".to_owned())
        })
    }

    /// Returns whether a principal is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }
}
