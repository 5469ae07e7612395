//! Infrastructure adapters for the entity store port.

#![forbid(unsafe_code)]

mod in_memory_entity_store;
mod postgres_entity_store;

pub use in_memory_entity_store::InMemoryEntityStore;
pub use postgres_entity_store::PostgresEntityStore;
