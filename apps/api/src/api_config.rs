use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use tracing_subscriber::EnvFilter;
use warrant_application::AuthorizationConfig;
use warrant_core::{AppError, Principal, PrincipalIdentity, TenantId};

const DEFAULT_ADMIN_PERMISSION: &str = "authorization.manage";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: Option<String>,
    pub api_host: String,
    pub api_port: u16,
    pub cors_origin: Option<String>,
    pub admin_permission: String,
    pub bootstrap_admin: Option<PrincipalIdentity>,
    pub authorization: AuthorizationConfig,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let database_url = optional_env("DATABASE_URL");
        if migrate_only && database_url.is_none() {
            return Err(AppError::Validation(
                "DATABASE_URL is required to run migrations".to_owned(),
            ));
        }

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);
        let cors_origin = optional_env("AUTHZ_CORS_ORIGIN");

        let admin_permission = optional_env("AUTHZ_ADMIN_PERMISSION")
            .unwrap_or_else(|| DEFAULT_ADMIN_PERMISSION.to_owned());

        let bootstrap_admin = optional_env("AUTHZ_BOOTSTRAP_PRINCIPAL")
            .map(|value| {
                let tenant_id = optional_env("AUTHZ_BOOTSTRAP_TENANT_ID")
                    .map(|tenant| TenantId::from_str(tenant.as_str()))
                    .transpose()?
                    .unwrap_or_else(TenantId::global);
                parse_principal(value.as_str())
                    .map(|principal| PrincipalIdentity::new(principal, tenant_id))
            })
            .transpose()?;

        let authorization = authorization_config_from_env()?;

        Ok(Self {
            migrate_only,
            database_url,
            api_host,
            api_port,
            cors_origin,
            admin_permission,
            bootstrap_admin,
            authorization,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

fn authorization_config_from_env() -> Result<AuthorizationConfig, AppError> {
    let defaults = AuthorizationConfig::default();

    let guards = optional_env("AUTHZ_GUARDS")
        .map(|value| AuthorizationConfig::parse_guards(value.as_str()))
        .transpose()?
        .unwrap_or(defaults.guards);

    let config = AuthorizationConfig {
        default_guard: optional_env("AUTHZ_DEFAULT_GUARD").unwrap_or(defaults.default_guard),
        tenant_scope_enabled: env_flag("AUTHZ_TENANT_SCOPE_ENABLED", defaults.tenant_scope_enabled)?,
        wildcard_enabled: env_flag("AUTHZ_WILDCARD_ENABLED", defaults.wildcard_enabled)?,
        guards,
    };
    config.validate()?;

    Ok(config)
}

/// Parses `principal_type:principal_id`.
fn parse_principal(value: &str) -> Result<Principal, AppError> {
    let (principal_type, principal_id) = value.split_once(':').ok_or_else(|| {
        AppError::Validation(format!(
            "AUTHZ_BOOTSTRAP_PRINCIPAL must look like 'type:id', got '{value}'"
        ))
    })?;

    Principal::new(principal_type.trim(), principal_id.trim())
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn env_flag(name: &str, default: bool) -> Result<bool, AppError> {
    match optional_env(name) {
        None => Ok(default),
        Some(value) if value.eq_ignore_ascii_case("true") || value == "1" => Ok(true),
        Some(value) if value.eq_ignore_ascii_case("false") || value == "0" => Ok(false),
        Some(value) => Err(AppError::Validation(format!(
            "{name} must be 'true' or 'false', got '{value}'"
        ))),
    }
}
