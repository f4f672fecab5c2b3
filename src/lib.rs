//! Entity repository over an embedded, ordered key-value store.
//!
//! Keys and values are opaque byte strings. Ordering, durability and
//! transaction isolation are delegated to SQLite; this crate only layers
//! repository semantics (TTL visibility, unique-id generation) on top.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod store;

pub use logging::{default_log_level, init_logging};
pub use model::entity::Entity;
pub use model::unique_id::UniqueIdError;
pub use repo::entity_repo::{
    EntityRepository, EntityScanQuery, RepoError, RepoResult, SqliteEntityRepository,
};
pub use store::entity_store::{
    EntityStore, LogSettings, StoreError, StoreLocation, StoreOptions, StoreResult,
};

/// Returns the crate version baked in at compile time.
pub fn crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
