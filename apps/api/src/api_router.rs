use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{delete, get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use warrant_core::AppError;

use crate::middleware::{
    PRINCIPAL_ID_HEADER, PRINCIPAL_TYPE_HEADER, PermissionRequirement, TENANT_ID_HEADER,
};
use crate::state::AppState;
use crate::{handlers, middleware};


pub fn build_router(app_state: AppState, cors_origin: Option<&str>) -> Result<Router, AppError> {
    let admin_requirement = PermissionRequirement::new(
        app_state.permission_gate.clone(),
        app_state.admin_permission.as_str(),
    );

    let admin_routes = Router::new()
        .route(
            "/api/authorization/roles",
            get(handlers::roles::list_roles_handler).post(handlers::roles::create_role_handler),
        )
        .route(
            "/api/authorization/roles/{role_name}",
            delete(handlers::roles::delete_role_handler),
        )
        .route(
            "/api/authorization/roles/{role_name}/permissions",
            get(handlers::roles::list_role_permissions_handler)
                .post(handlers::roles::give_permission_to_role_handler)
                .put(handlers::roles::sync_role_permissions_handler),
        )
        .route(
            "/api/authorization/roles/{role_name}/permissions/{permission_name}",
            delete(handlers::roles::revoke_permission_from_role_handler),
        )
        .route(
            "/api/authorization/roles/{role_name}/principals",
            get(handlers::roles::list_role_principals_handler),
        )
        .route(
            "/api/authorization/permissions",
            get(handlers::permissions::list_permissions_handler)
                .post(handlers::permissions::create_permission_handler),
        )
        .route(
            "/api/authorization/permissions/{permission_name}",
            delete(handlers::permissions::delete_permission_handler),
        )
        .route(
            "/api/authorization/principals/{principal_type}/{principal_id}/roles",
            get(handlers::principals::list_principal_roles_handler)
                .post(handlers::principals::assign_principal_role_handler)
                .put(handlers::principals::sync_principal_roles_handler),
        )
        .route(
            "/api/authorization/principals/{principal_type}/{principal_id}/roles/{role_name}",
            delete(handlers::principals::revoke_principal_role_handler),
        )
        .route(
            "/api/authorization/principals/{principal_type}/{principal_id}/permissions",
            get(handlers::principals::list_principal_permissions_handler)
                .post(handlers::principals::give_principal_permission_handler)
                .put(handlers::principals::sync_principal_permissions_handler),
        )
        .route(
            "/api/authorization/principals/{principal_type}/{principal_id}/permissions/{permission_name}",
            delete(handlers::principals::revoke_principal_permission_handler),
        )
        .route_layer(from_fn_with_state(
            admin_requirement,
            middleware::require_permissions,
        ));

    let authenticated_routes = Router::new()
        .route(
            "/api/authorization/check",
            post(handlers::checks::check_permission_handler),
        )
        .route(
            "/api/authorization/me",
            get(handlers::checks::current_access_handler),
        )
        .route_layer(from_fn(middleware::require_authenticated));

    let mut router = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(admin_routes)
        .merge(authenticated_routes)
        .layer(from_fn(middleware::resolve_identity))
        .layer(TraceLayer::new_for_http());

    if let Some(origin) = cors_origin {
        router = router.layer(cors_layer(origin)?);
    }

    Ok(router.with_state(app_state))
}

fn cors_layer(origin: &str) -> Result<CorsLayer, AppError> {
    Ok(CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(origin).map_err(|error| {
                AppError::Validation(format!("invalid AUTHZ_CORS_ORIGIN: {error}"))
            })?,
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static(PRINCIPAL_TYPE_HEADER),
            HeaderName::from_static(PRINCIPAL_ID_HEADER),
            HeaderName::from_static(TENANT_ID_HEADER),
        ]))
}
