use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use warrant_core::{AuthContext, Principal};
use warrant_domain::{PermissionRef, RoleRef};

use crate::dto::{
    PermissionNameRequest, PermissionResponse, RoleNameRequest, RoleResponse,
    SyncPermissionsRequest, SyncRolesRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

fn principal_from_path(principal_type: String, principal_id: String) -> ApiResult<Principal> {
    Ok(Principal::new(principal_type, principal_id)?)
}

pub async fn list_principal_roles_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path((principal_type, principal_id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let principal = principal_from_path(principal_type, principal_id)?;
    let roles = state
        .authorization_service
        .roles(&context, &principal)
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn assign_principal_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path((principal_type, principal_id)): Path<(String, String)>,
    Json(payload): Json<RoleNameRequest>,
) -> ApiResult<StatusCode> {
    let principal = principal_from_path(principal_type, principal_id)?;
    state
        .authorization_service
        .assign_role(&context, &principal, payload.role)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn sync_principal_roles_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path((principal_type, principal_id)): Path<(String, String)>,
    Json(payload): Json<SyncRolesRequest>,
) -> ApiResult<StatusCode> {
    let principal = principal_from_path(principal_type, principal_id)?;
    let roles = payload.roles.into_iter().map(RoleRef::from).collect();

    state
        .authorization_service
        .sync_roles(&context, &principal, roles)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn revoke_principal_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path((principal_type, principal_id, role_name)): Path<(String, String, String)>,
) -> ApiResult<StatusCode> {
    let principal = principal_from_path(principal_type, principal_id)?;
    state
        .authorization_service
        .revoke_role(&context, &principal, role_name)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Lists effective permissions: direct grants plus those inherited through roles.
pub async fn list_principal_permissions_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path((principal_type, principal_id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<PermissionResponse>>> {
    let principal = principal_from_path(principal_type, principal_id)?;
    let permissions = state
        .authorization_service
        .permissions(&context, &principal)
        .await?
        .into_iter()
        .map(PermissionResponse::from)
        .collect();

    Ok(Json(permissions))
}

pub async fn give_principal_permission_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path((principal_type, principal_id)): Path<(String, String)>,
    Json(payload): Json<PermissionNameRequest>,
) -> ApiResult<StatusCode> {
    let principal = principal_from_path(principal_type, principal_id)?;
    state
        .authorization_service
        .give_permission_to(&context, &principal, payload.permission)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn sync_principal_permissions_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path((principal_type, principal_id)): Path<(String, String)>,
    Json(payload): Json<SyncPermissionsRequest>,
) -> ApiResult<StatusCode> {
    let principal = principal_from_path(principal_type, principal_id)?;
    let permissions = payload
        .permissions
        .into_iter()
        .map(PermissionRef::from)
        .collect();

    state
        .authorization_service
        .sync_permissions(&context, &principal, permissions)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn revoke_principal_permission_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path((principal_type, principal_id, permission_name)): Path<(String, String, String)>,
) -> ApiResult<StatusCode> {
    let principal = principal_from_path(principal_type, principal_id)?;
    state
        .authorization_service
        .revoke_permission_to(&context, &principal, permission_name)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
