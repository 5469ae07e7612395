use tracing::warn;
use warrant_core::{AppError, AppResult, AuthContext};
use warrant_domain::PermissionRef;

use crate::AuthorizationService;

/// Separator between entries of a textual allow-list.
pub const ALLOW_LIST_DELIMITER: char = '|';

/// Outcome of an allow-list check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// The principal holds the listed entry.
    Allowed(String),
    /// No principal is authenticated.
    Unauthenticated,
    /// The principal holds none of the required entries.
    Forbidden(Vec<String>),
}

impl AccessDecision {
    /// Returns whether access is allowed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }

    /// Converts a deny decision into `Unauthenticated` or `Forbidden`.
    pub fn into_result(self) -> AppResult<()> {
        match self {
            Self::Allowed(_) => Ok(()),
            Self::Unauthenticated => Err(AppError::Unauthenticated(
                "authentication required".to_owned(),
            )),
            Self::Forbidden(required) => Err(AppError::Forbidden(format!(
                "principal lacks all of the required entries: {}",
                required.join(", ")
            ))),
        }
    }
}

/// Splits a `|`-separated allow-list into trimmed entries.
#[must_use]
pub fn parse_allow_list(value: &str) -> Vec<String> {
    value
        .split(ALLOW_LIST_DELIMITER)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Request gate checking allow-lists against the authenticated principal.
#[derive(Clone)]
pub struct PermissionGate {
    authorization_service: AuthorizationService,
}

impl PermissionGate {
    /// Creates a gate over an authorization service.
    #[must_use]
    pub fn new(authorization_service: AuthorizationService) -> Self {
        Self {
            authorization_service,
        }
    }

    /// Allows the request when the principal holds any listed permission.
    ///
    /// Entries are checked in order and the first granted one short-circuits.
    /// Unknown or foreign-guard entries count as not held.
    pub async fn authorize_permissions(
        &self,
        context: &AuthContext,
        required: &[String],
        guard_name: Option<&str>,
    ) -> AppResult<AccessDecision> {
        let Ok(identity) = context.current_principal() else {
            return Ok(AccessDecision::Unauthenticated);
        };

        for permission in required {
            let granted = self
                .authorization_service
                .check_permission_to(
                    context,
                    identity.principal(),
                    PermissionRef::ByName(permission.clone()),
                    guard_name,
                )
                .await?;
            if granted {
                return Ok(AccessDecision::Allowed(permission.clone()));
            }
        }

        warn!(
            principal = %identity.principal(),
            tenant_id = %identity.tenant_id(),
            required = ?required,
            "permission gate denied request"
        );
        Ok(AccessDecision::Forbidden(required.to_vec()))
    }

    /// Allows the request when the principal holds any listed role.
    pub async fn authorize_roles(
        &self,
        context: &AuthContext,
        required: &[String],
    ) -> AppResult<AccessDecision> {
        let Ok(identity) = context.current_principal() else {
            return Ok(AccessDecision::Unauthenticated);
        };

        let held = self
            .authorization_service
            .role_names(context, identity.principal())
            .await?;
        if let Some(role) = required.iter().find(|role| held.contains(role)) {
            return Ok(AccessDecision::Allowed(role.clone()));
        }

        warn!(
            principal = %identity.principal(),
            tenant_id = %identity.tenant_id(),
            required = ?required,
            "role gate denied request"
        );
        Ok(AccessDecision::Forbidden(required.to_vec()))
    }

    /// Allows the request when the principal holds any listed role or permission.
    pub async fn authorize_roles_or_permissions(
        &self,
        context: &AuthContext,
        required: &[String],
    ) -> AppResult<AccessDecision> {
        match self.authorize_roles(context, required).await? {
            AccessDecision::Forbidden(_) => {
                self.authorize_permissions(context, required, None).await
            }
            decision => Ok(decision),
        }
    }
}
