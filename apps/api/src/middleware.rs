use std::sync::Arc;

use axum::extract::{Extension, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use warrant_application::{PermissionGate, parse_allow_list};
use warrant_core::{AppError, AppResult, AuthContext, Principal, PrincipalIdentity, TenantId};

use crate::error::ApiResult;

pub const PRINCIPAL_TYPE_HEADER: &str = "x-principal-type";
pub const PRINCIPAL_ID_HEADER: &str = "x-principal-id";
pub const TENANT_ID_HEADER: &str = "x-tenant-id";

/// Reads the upstream-authenticated principal into an [`AuthContext`] extension.
///
/// Requests without principal headers continue as anonymous.
pub async fn resolve_identity(mut request: Request, next: Next) -> ApiResult<Response> {
    let context = auth_context_from_headers(request.headers())?;
    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

pub async fn require_authenticated(
    Extension(context): Extension<AuthContext>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    context.current_principal()?;
    Ok(next.run(request).await)
}

/// Allow-list checked by [`require_permissions`].
#[derive(Clone)]
pub struct PermissionRequirement {
    gate: PermissionGate,
    required: Arc<[String]>,
}

impl PermissionRequirement {
    /// Builds a requirement from a `|`-separated allow-list.
    pub fn new(gate: PermissionGate, allow_list: &str) -> Self {
        Self {
            gate,
            required: parse_allow_list(allow_list).into(),
        }
    }
}

/// Rejects requests whose principal holds none of the required permissions.
pub async fn require_permissions(
    State(requirement): State<PermissionRequirement>,
    Extension(context): Extension<AuthContext>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    requirement
        .gate
        .authorize_permissions(&context, &requirement.required, None)
        .await?
        .into_result()?;

    Ok(next.run(request).await)
}

fn auth_context_from_headers(headers: &HeaderMap) -> AppResult<AuthContext> {
    let principal_type = header_value(headers, PRINCIPAL_TYPE_HEADER)?;
    let principal_id = header_value(headers, PRINCIPAL_ID_HEADER)?;

    let (principal_type, principal_id) = match (principal_type, principal_id) {
        (None, None) => return Ok(AuthContext::anonymous()),
        (Some(principal_type), Some(principal_id)) => (principal_type, principal_id),
        _ => {
            return Err(AppError::Validation(format!(
                "{PRINCIPAL_TYPE_HEADER} and {PRINCIPAL_ID_HEADER} must be sent together"
            )));
        }
    };

    let tenant_id = header_value(headers, TENANT_ID_HEADER)?
        .map(str::parse::<TenantId>)
        .transpose()?
        .unwrap_or_else(TenantId::global);

    Ok(AuthContext::authenticated(PrincipalIdentity::new(
        Principal::new(principal_type, principal_id)?,
        tenant_id,
    )))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> AppResult<Option<&'a str>> {
    headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map(str::trim)
                .map_err(|_| AppError::Validation(format!("{name} header must be visible ASCII")))
        })
        .transpose()
        .map(|value| value.filter(|value| !value.is_empty()))
}
