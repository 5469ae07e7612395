use tracing::info;
use warrant_core::{AppResult, AuthContext, PrincipalIdentity};

use crate::state::AppState;

/// Grants the administration permission to the configured bootstrap principal.
///
/// Safe to run on every start: the permission is found or created and the
/// grant is idempotent.
pub async fn grant_bootstrap_admin(
    app_state: &AppState,
    identity: &PrincipalIdentity,
) -> AppResult<()> {
    let context = AuthContext::authenticated(identity.clone());
    let principal = identity.principal();
    let guard_name = app_state
        .authorization_service
        .guard_resolver()
        .default_name(principal.principal_type());

    let permission = app_state
        .authorization_service
        .find_or_create_permission(
            &context,
            app_state.admin_permission.as_str(),
            Some(guard_name.as_str()),
        )
        .await?;
    app_state
        .authorization_service
        .give_permission_to(&context, principal, &permission)
        .await?;

    info!(
        principal = %principal,
        tenant_id = %identity.tenant_id(),
        permission = permission.name(),
        "bootstrap principal granted administration permission"
    );
    Ok(())
}
