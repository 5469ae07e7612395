use warrant_application::{AuthorizationService, PermissionGate};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub authorization_service: AuthorizationService,
    pub permission_gate: PermissionGate,
    /// Permission required by the administration routes.
    pub admin_permission: String,
}
