//! Application services and ports.

#![forbid(unsafe_code)]

mod authorization_config;
mod authorization_service;
mod entity_store_ports;
mod guard_resolver;
mod permission_cache;
mod permission_gate;

pub use authorization_config::{AuthorizationConfig, GuardDefinition};
pub use authorization_service::AuthorizationService;
pub use entity_store_ports::{EntityStore, ScopeCatalog};
pub use guard_resolver::GuardResolver;
pub use permission_cache::{CacheKey, PermissionCache, PermissionCatalog};
pub use permission_gate::{ALLOW_LIST_DELIMITER, AccessDecision, PermissionGate, parse_allow_list};
