use axum::Json;
use axum::extract::{Extension, State};
use warrant_application::parse_allow_list;
use warrant_core::{AuthContext, Principal};

use crate::dto::{
    AccessSummaryResponse, CheckPermissionRequest, CheckPermissionResponse, PrincipalDto,
};
use crate::error::ApiResult;
use crate::state::AppState;

/// Checks one permission for the caller, or for an explicit principal.
///
/// Checking anyone other than the caller requires the administration
/// permission. Unknown permissions and guard mismatches surface as errors
/// rather than as a `false` answer.
pub async fn check_permission_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Json(payload): Json<CheckPermissionRequest>,
) -> ApiResult<Json<CheckPermissionResponse>> {
    let caller = context.current_principal()?.principal().clone();
    let principal = match payload.principal {
        Some(dto) => Principal::new(dto.principal_type, dto.principal_id)?,
        None => caller.clone(),
    };

    if principal != caller {
        state
            .permission_gate
            .authorize_permissions(&context, &parse_allow_list(&state.admin_permission), None)
            .await?
            .into_result()?;
    }

    let allowed = state
        .authorization_service
        .has_permission_to(
            &context,
            &principal,
            payload.permission.as_str(),
            payload.guard_name.as_deref(),
        )
        .await?;

    Ok(Json(CheckPermissionResponse {
        principal: PrincipalDto::from(&principal),
        permission: payload.permission,
        allowed,
    }))
}

pub async fn current_access_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
) -> ApiResult<Json<AccessSummaryResponse>> {
    let identity = context.current_principal()?;
    let roles = state
        .authorization_service
        .role_names(&context, identity.principal())
        .await?;
    let permissions = state
        .authorization_service
        .permission_names(&context, identity.principal())
        .await?;

    Ok(Json(AccessSummaryResponse::new(identity, roles, permissions)))
}
