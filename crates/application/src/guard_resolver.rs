use warrant_core::{AppError, AppResult};
use warrant_domain::GuardName;

use crate::AuthorizationConfig;

/// Maps principal types to guard names and back.
#[derive(Debug, Clone)]
pub struct GuardResolver {
    default_guard: GuardName,
    guards: Vec<(GuardName, String)>,
}

impl GuardResolver {
    /// Builds a resolver from validated configuration.
    pub fn from_config(config: &AuthorizationConfig) -> AppResult<Self> {
        config.validate()?;

        let guards = config
            .guards
            .iter()
            .map(|guard| {
                Ok((
                    GuardName::new(guard.name.as_str())?,
                    guard.principal_type.trim().to_owned(),
                ))
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            default_guard: GuardName::new(config.default_guard.as_str())?,
            guards,
        })
    }

    /// Returns the system default guard.
    #[must_use]
    pub fn default_guard(&self) -> &GuardName {
        &self.default_guard
    }

    /// Returns the first guard configured for the principal type, or the default guard.
    #[must_use]
    pub fn default_name(&self, principal_type: &str) -> GuardName {
        self.guards
            .iter()
            .find(|(_, configured_type)| configured_type == principal_type)
            .map(|(guard, _)| guard.clone())
            .unwrap_or_else(|| self.default_guard.clone())
    }

    /// Returns every guard able to authenticate the principal type.
    #[must_use]
    pub fn guard_names(&self, principal_type: &str) -> Vec<GuardName> {
        let names: Vec<GuardName> = self
            .guards
            .iter()
            .filter(|(_, configured_type)| configured_type == principal_type)
            .map(|(guard, _)| guard.clone())
            .collect();

        if names.is_empty() {
            return vec![self.default_guard.clone()];
        }

        names
    }

    /// Returns the principal type authenticated by a guard.
    #[must_use]
    pub fn model_for_guard(&self, guard_name: &GuardName) -> Option<&str> {
        self.guards
            .iter()
            .find(|(guard, _)| guard == guard_name)
            .map(|(_, principal_type)| principal_type.as_str())
    }

    /// Fails with `GuardMismatch` when the guard cannot serve the principal type.
    pub fn ensure_guard(&self, principal_type: &str, guard_name: &GuardName) -> AppResult<()> {
        if self.guard_names(principal_type).contains(guard_name) {
            return Ok(());
        }

        Err(AppError::GuardMismatch(format!(
            "guard '{guard_name}' does not serve principal type '{principal_type}'"
        )))
    }
}
