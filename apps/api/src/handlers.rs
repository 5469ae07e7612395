pub mod checks;
pub mod health;
pub mod permissions;
pub mod principals;
pub mod roles;
