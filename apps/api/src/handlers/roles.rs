use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use warrant_core::AuthContext;
use warrant_domain::PermissionRef;

use crate::dto::{
    CreateRoleRequest, GuardQuery, PermissionNameRequest, PermissionResponse, PrincipalDto,
    RoleResponse, SyncPermissionsRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_roles_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Query(query): Query<GuardQuery>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .authorization_service
        .list_roles(&context, query.guard.as_deref())
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn create_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let role = state
        .authorization_service
        .create_role(&context, payload.name.as_str(), payload.guard_name.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

pub async fn delete_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(role_name): Path<String>,
    Query(query): Query<GuardQuery>,
) -> ApiResult<StatusCode> {
    state
        .authorization_service
        .delete_role(&context, role_name, query.guard.as_deref())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_role_permissions_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(role_name): Path<String>,
    Query(query): Query<GuardQuery>,
) -> ApiResult<Json<Vec<PermissionResponse>>> {
    let permissions = state
        .authorization_service
        .role_permissions(&context, role_name, query.guard.as_deref())
        .await?
        .into_iter()
        .map(PermissionResponse::from)
        .collect();

    Ok(Json(permissions))
}

pub async fn give_permission_to_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(role_name): Path<String>,
    Query(query): Query<GuardQuery>,
    Json(payload): Json<PermissionNameRequest>,
) -> ApiResult<StatusCode> {
    state
        .authorization_service
        .give_permission_to_role(
            &context,
            role_name,
            payload.permission,
            query.guard.as_deref(),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn sync_role_permissions_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(role_name): Path<String>,
    Query(query): Query<GuardQuery>,
    Json(payload): Json<SyncPermissionsRequest>,
) -> ApiResult<StatusCode> {
    let permissions = payload
        .permissions
        .into_iter()
        .map(PermissionRef::from)
        .collect();

    state
        .authorization_service
        .sync_role_permissions(&context, role_name, permissions, query.guard.as_deref())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn revoke_permission_from_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path((role_name, permission_name)): Path<(String, String)>,
    Query(query): Query<GuardQuery>,
) -> ApiResult<StatusCode> {
    state
        .authorization_service
        .revoke_permission_from_role(
            &context,
            role_name,
            permission_name,
            query.guard.as_deref(),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_role_principals_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(role_name): Path<String>,
    Query(query): Query<GuardQuery>,
) -> ApiResult<Json<Vec<PrincipalDto>>> {
    let principals = state
        .authorization_service
        .principals_with_role(&context, role_name, query.guard.as_deref())
        .await?
        .into_iter()
        .map(PrincipalDto::from)
        .collect();

    Ok(Json(principals))
}
