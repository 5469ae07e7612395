//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod guard;
mod permission;
mod role;
mod security;
mod wildcard;

pub use guard::GuardName;
pub use permission::{Permission, PermissionId};
pub use role::{Role, RoleId};
pub use security::{PermissionRef, RoleRef};
pub use wildcard::{
    ALTERNATIVE_DELIMITER, SEGMENT_DELIMITER, WILDCARD_SEGMENT, WildcardPattern,
    wildcard_matches,
};
