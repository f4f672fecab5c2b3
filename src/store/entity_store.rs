//! Entity store handle and configuration.
//!
//! # Responsibility
//! - Translate `StoreOptions` into an opened, migrated connection.
//! - Expose the repository contract on an owned handle.
//!
//! # Invariants
//! - Logging is initialized before the store is opened when configured.
//! - Each delegated call is one transaction on the owned connection.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::logging::init_logging;
use crate::model::entity::Entity;
use crate::repo::entity_repo::{
    EntityRepository, EntityScanQuery, RepoResult, SqliteEntityRepository,
};
use log::info;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures while opening or closing a store handle.
#[derive(Debug)]
pub enum StoreError {
    /// Logger bootstrap rejected the configured settings.
    Logging(String),
    Db(DbError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logging(message) => write!(f, "logging setup failed: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Logging(_) => None,
            Self::Db(err) => Some(err),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Where the store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// Volatile store, dropped when the handle closes.
    InMemory,
    /// Durable store at the given file path.
    OnDisk(PathBuf),
}

/// File logging settings for a store process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Verbosity: `trace|debug|info|warn|error`.
    pub level: String,
    /// Directory receiving rotated log files.
    pub dir: PathBuf,
}

/// Construction options for [`EntityStore::open`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub location: StoreLocation,
    /// When set, process logging is initialized before the store opens.
    pub logging: Option<LogSettings>,
}

impl StoreOptions {
    /// Options for a volatile in-memory store without logging.
    pub fn in_memory() -> Self {
        Self {
            location: StoreLocation::InMemory,
            logging: None,
        }
    }

    /// Options for a durable store at `path` without logging.
    pub fn on_disk(path: impl Into<PathBuf>) -> Self {
        Self {
            location: StoreLocation::OnDisk(path.into()),
            logging: None,
        }
    }

    /// Enables file logging at the given verbosity and directory.
    pub fn with_logging(mut self, level: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.logging = Some(LogSettings {
            level: level.into(),
            dir: dir.into(),
        });
        self
    }
}

/// Owned handle over the embedded entity store.
///
/// The handle exclusively owns its connection; sharing across threads means
/// transferring ownership, not aliasing. All repository methods delegate to
/// [`SqliteEntityRepository`] on the owned connection.
pub struct EntityStore {
    conn: Connection,
}

impl EntityStore {
    /// Opens a store from the given options.
    ///
    /// Any failure along the way — logger setup, connection open, pragma
    /// bootstrap, migration — is returned as an error; a handle is only
    /// produced once every step succeeded.
    pub fn open(options: &StoreOptions) -> StoreResult<Self> {
        if let Some(logging) = &options.logging {
            init_logging(&logging.level, &logging.dir).map_err(StoreError::Logging)?;
        }

        let conn = match &options.location {
            StoreLocation::InMemory => open_db_in_memory()?,
            StoreLocation::OnDisk(path) => open_db(path)?,
        };

        info!("event=store_open module=store status=ok");
        Ok(Self { conn })
    }

    /// Releases the store handle.
    pub fn close(self) -> StoreResult<()> {
        self.conn
            .close()
            .map_err(|(_conn, err)| StoreError::Db(DbError::Sqlite(err)))?;
        info!("event=store_close module=store status=ok");
        Ok(())
    }

    fn repo(&self) -> SqliteEntityRepository<'_> {
        SqliteEntityRepository::new(&self.conn)
    }

    /// Stores `value` under `key` with no expiry.
    pub fn put(&self, key: &[u8], value: &[u8]) -> RepoResult<()> {
        self.repo().put(key, value)
    }

    /// Stores `value` under `key`, expiring `ttl` after the write.
    pub fn put_with_ttl(&self, key: &[u8], value: &[u8], ttl: Duration) -> RepoResult<()> {
        self.repo().put_with_ttl(key, value, ttl)
    }

    /// Returns a copy of the value stored under `key`.
    pub fn get(&self, key: &[u8]) -> RepoResult<Vec<u8>> {
        self.repo().get(key)
    }

    /// Returns whether `key` holds a live entry.
    pub fn key_exists(&self, key: &[u8]) -> RepoResult<bool> {
        self.repo().key_exists(key)
    }

    /// Returns every live entry in key order.
    pub fn get_all(&self) -> RepoResult<Vec<Entity>> {
        self.repo().get_all()
    }

    /// Returns a page of live entries in key order.
    pub fn scan_entities(&self, query: &EntityScanQuery) -> RepoResult<Vec<Entity>> {
        self.repo().scan_entities(query)
    }

    /// Removes `key`; absent keys are a no-op.
    pub fn delete(&self, key: &[u8]) -> RepoResult<()> {
        self.repo().delete(key)
    }

    /// Returns an identifier not currently stored as a key.
    pub fn generate_unique_id(&self) -> RepoResult<String> {
        self.repo().generate_unique_id()
    }

    /// Generates an identifier and stores `value` under it atomically.
    pub fn insert_with_generated_id(
        &self,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> RepoResult<String> {
        self.repo().insert_with_generated_id(value, ttl)
    }

    /// Formats the timestamp half of an identifier as UTC
    /// `YYYY-MM-DD HH:MM:SS`.
    pub fn date_from_unique_id(&self, id: &str) -> RepoResult<String> {
        self.repo().date_from_unique_id(id)
    }
}
