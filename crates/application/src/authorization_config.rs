use serde::{Deserialize, Serialize};
use warrant_core::{AppError, AppResult};

/// Guard authenticating one principal type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardDefinition {
    /// Guard name stored on roles and permissions.
    pub name: String,
    /// Principal type authenticated by the guard.
    pub principal_type: String,
}

impl GuardDefinition {
    /// Creates a guard definition.
    #[must_use]
    pub fn new(name: impl Into<String>, principal_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            principal_type: principal_type.into(),
        }
    }
}

/// Authorization engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationConfig {
    /// Guard used when a principal type has no configured guard.
    pub default_guard: String,
    /// Scopes every lookup to the authenticated principal's tenant.
    pub tenant_scope_enabled: bool,
    /// Treats granted permission names as wildcard patterns.
    pub wildcard_enabled: bool,
    /// Configured guards in priority order.
    pub guards: Vec<GuardDefinition>,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            default_guard: "web".to_owned(),
            tenant_scope_enabled: true,
            wildcard_enabled: false,
            guards: vec![GuardDefinition::new("web", "user")],
        }
    }
}

impl AuthorizationConfig {
    /// Validates guard names and principal types.
    pub fn validate(&self) -> AppResult<()> {
        if self.default_guard.trim().is_empty() {
            return Err(AppError::Validation(
                "default guard must not be empty".to_owned(),
            ));
        }

        for (index, guard) in self.guards.iter().enumerate() {
            if guard.name.trim().is_empty() || guard.principal_type.trim().is_empty() {
                return Err(AppError::Validation(format!(
                    "guard definition #{index} must have a name and a principal type"
                )));
            }

            if self.guards[..index]
                .iter()
                .any(|previous| previous.name.trim() == guard.name.trim())
            {
                return Err(AppError::Validation(format!(
                    "guard '{}' is configured more than once",
                    guard.name
                )));
            }
        }

        Ok(())
    }

    /// Parses `guard=principal_type` pairs separated by commas.
    pub fn parse_guards(value: &str) -> AppResult<Vec<GuardDefinition>> {
        value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (name, principal_type) = entry.split_once('=').ok_or_else(|| {
                    AppError::Validation(format!(
                        "guard entry '{entry}' must use the form guard=principal_type"
                    ))
                })?;
                Ok(GuardDefinition::new(name.trim(), principal_type.trim()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthorizationConfig, GuardDefinition};

    #[test]
    fn default_config_is_valid() {
        let config = AuthorizationConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.tenant_scope_enabled);
        assert!(!config.wildcard_enabled);
    }

    #[test]
    fn duplicate_guard_is_rejected() {
        let config = AuthorizationConfig {
            guards: vec![
                GuardDefinition::new("web", "user"),
                GuardDefinition::new("web", "admin"),
            ],
            ..AuthorizationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn blank_default_guard_is_rejected() {
        let config = AuthorizationConfig {
            default_guard: " ".to_owned(),
            ..AuthorizationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn guards_parse_from_pairs() {
        let guards = AuthorizationConfig::parse_guards("web=user, api=user,admin=admin_user");
        assert!(guards.is_ok());
        let guards = guards.unwrap_or_default();
        assert_eq!(guards.len(), 3);
        assert_eq!(guards[2], GuardDefinition::new("admin", "admin_user"));

        assert!(AuthorizationConfig::parse_guards("web").is_err());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: Result<AuthorizationConfig, _> =
            serde_json::from_str(r#"{ "wildcard_enabled": true }"#);
        assert!(config.is_ok());
        let config = config.unwrap_or_default();
        assert!(config.wildcard_enabled);
        assert_eq!(config.default_guard, "web");
    }
}
