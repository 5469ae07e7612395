use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use warrant_core::AuthContext;

use crate::dto::{CreatePermissionRequest, GuardQuery, PermissionResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_permissions_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Query(query): Query<GuardQuery>,
) -> ApiResult<Json<Vec<PermissionResponse>>> {
    let permissions = state
        .authorization_service
        .list_permissions(&context, query.guard.as_deref())
        .await?
        .into_iter()
        .map(PermissionResponse::from)
        .collect();

    Ok(Json(permissions))
}

pub async fn create_permission_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Json(payload): Json<CreatePermissionRequest>,
) -> ApiResult<(StatusCode, Json<PermissionResponse>)> {
    let permission = state
        .authorization_service
        .create_permission(&context, payload.name.as_str(), payload.guard_name.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(PermissionResponse::from(permission))))
}

pub async fn delete_permission_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(permission_name): Path<String>,
    Query(query): Query<GuardQuery>,
) -> ApiResult<StatusCode> {
    state
        .authorization_service
        .delete_permission(&context, permission_name, query.guard.as_deref())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
