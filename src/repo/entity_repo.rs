//! Entity repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide put/get/exists/enumerate/delete APIs over the `entries` table.
//! - Generate timestamp-based unique identifiers against live keys.
//!
//! # Invariants
//! - Every operation runs inside exactly one transaction; writes use
//!   immediate transactions, reads are single-statement snapshots.
//! - An entry past its expiry deadline is treated as absent by every read
//!   and removed by the next write.
//! - Time-to-live is an explicit per-write choice; plain `put` never
//!   expires.

use crate::db::DbError;
use crate::model::entity::Entity;
use crate::model::unique_id::{format_unique_id, parse_unique_id, UniqueIdError, SEQUENCE_SPACE};
use log::warn;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction,
    TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{Duration, SystemTime, SystemTimeError, UNIX_EPOCH};

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from entity persistence and identifier operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Key is absent, or present only as an expired row.
    NotFound(Vec<u8>),
    /// Identifier string failed format validation.
    InvalidId(UniqueIdError),
    /// All 1000 sequence slots for one timestamp are taken.
    IdSpaceExhausted { timestamp_ns: i64 },
    /// System clock reads before the Unix epoch.
    Clock(SystemTimeError),
    /// Persisted or computed state cannot be represented.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(key) => {
                write!(f, "entity not found: `{}`", String::from_utf8_lossy(key))
            }
            Self::InvalidId(err) => write!(f, "{err}"),
            Self::IdSpaceExhausted { timestamp_ns } => write!(
                f,
                "unique id sequence space exhausted for timestamp {timestamp_ns}"
            ),
            Self::Clock(err) => write!(f, "system clock error: {err}"),
            Self::InvalidData(message) => write!(f, "invalid entity data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidId(err) => Some(err),
            Self::Clock(err) => Some(err),
            Self::NotFound(_) | Self::IdSpaceExhausted { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<UniqueIdError> for RepoError {
    fn from(value: UniqueIdError) -> Self {
        Self::InvalidId(value)
    }
}

/// Cursor options for bounded keyspace scans.
///
/// The default scans the whole keyspace; `after_key` resumes a previous
/// scan exclusively, `limit` bounds the page size.
#[derive(Debug, Clone, Default)]
pub struct EntityScanQuery {
    pub after_key: Option<Vec<u8>>,
    pub limit: Option<u32>,
}

/// Data-access contract for entity storage.
pub trait EntityRepository {
    /// Stores `value` under `key` with no expiry, replacing any previous
    /// value.
    fn put(&self, key: &[u8], value: &[u8]) -> RepoResult<()>;

    /// Stores `value` under `key`; the entry becomes invisible `ttl` after
    /// the write and is purged by a later write.
    fn put_with_ttl(&self, key: &[u8], value: &[u8], ttl: Duration) -> RepoResult<()>;

    /// Returns a copy of the value stored under `key`.
    fn get(&self, key: &[u8]) -> RepoResult<Vec<u8>>;

    /// Returns whether `key` currently holds a live entry. Absence is not
    /// an error.
    fn key_exists(&self, key: &[u8]) -> RepoResult<bool>;

    /// Returns every live entry in key order.
    fn get_all(&self) -> RepoResult<Vec<Entity>>;

    /// Returns a page of live entries in key order.
    fn scan_entities(&self, query: &EntityScanQuery) -> RepoResult<Vec<Entity>>;

    /// Removes `key`. Deleting an absent key is a no-op.
    fn delete(&self, key: &[u8]) -> RepoResult<()>;

    /// Returns a `<timestamp>-<sequence>` identifier not currently stored
    /// as a key.
    ///
    /// The check and any subsequent write are separate transactions; use
    /// [`EntityRepository::insert_with_generated_id`] when the id must be
    /// claimed atomically.
    fn generate_unique_id(&self) -> RepoResult<String>;

    /// Generates a unique identifier and stores `value` under it inside
    /// one transaction, returning the claimed id.
    fn insert_with_generated_id(&self, value: &[u8], ttl: Option<Duration>)
        -> RepoResult<String>;

    /// Formats the timestamp half of an identifier as UTC
    /// `YYYY-MM-DD HH:MM:SS`.
    fn date_from_unique_id(&self, id: &str) -> RepoResult<String>;
}

/// SQLite-backed entity repository.
pub struct SqliteEntityRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEntityRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn write_transaction(&self) -> RepoResult<Transaction<'conn>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        Ok(tx)
    }

    fn upsert(&self, key: &[u8], value: &[u8], expires_at_ns: Option<i64>) -> RepoResult<()> {
        let now_ns = unix_timestamp_ns()?;
        let tx = self.write_transaction()?;
        purge_expired_in_tx(&tx, now_ns)?;
        tx.execute(
            "INSERT INTO entries (key, value, expires_at_ns, created_at_ns, updated_at_ns)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                expires_at_ns = excluded.expires_at_ns,
                updated_at_ns = excluded.updated_at_ns;",
            params![key, value, expires_at_ns, now_ns],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Probes sequence slots for `timestamp_ns` and returns the first free
    /// candidate.
    fn first_free_identifier(&self, timestamp_ns: i64) -> RepoResult<String> {
        for sequence in 0..SEQUENCE_SPACE {
            let candidate = format_unique_id(timestamp_ns, sequence);
            if !self.key_exists(candidate.as_bytes())? {
                return Ok(candidate);
            }
        }
        warn!(
            "event=unique_id_exhausted module=repo status=error timestamp_ns={timestamp_ns}"
        );
        Err(RepoError::IdSpaceExhausted { timestamp_ns })
    }
}

impl EntityRepository for SqliteEntityRepository<'_> {
    fn put(&self, key: &[u8], value: &[u8]) -> RepoResult<()> {
        self.upsert(key, value, None)
    }

    fn put_with_ttl(&self, key: &[u8], value: &[u8], ttl: Duration) -> RepoResult<()> {
        let now_ns = unix_timestamp_ns()?;
        self.upsert(key, value, Some(expiry_deadline(now_ns, ttl)?))
    }

    fn get(&self, key: &[u8]) -> RepoResult<Vec<u8>> {
        let now_ns = unix_timestamp_ns()?;
        let value: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT value FROM entries
                  WHERE key = ?1
                    AND (expires_at_ns IS NULL OR expires_at_ns > ?2);",
                params![key, now_ns],
                |row| row.get(0),
            )
            .optional()?;
        value.ok_or_else(|| RepoError::NotFound(key.to_vec()))
    }

    fn key_exists(&self, key: &[u8]) -> RepoResult<bool> {
        let now_ns = unix_timestamp_ns()?;
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM entries
                 WHERE key = ?1
                   AND (expires_at_ns IS NULL OR expires_at_ns > ?2)
            );",
            params![key, now_ns],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn get_all(&self) -> RepoResult<Vec<Entity>> {
        self.scan_entities(&EntityScanQuery::default())
    }

    fn scan_entities(&self, query: &EntityScanQuery) -> RepoResult<Vec<Entity>> {
        let now_ns = unix_timestamp_ns()?;
        let mut sql = String::from(
            "SELECT key, value FROM entries
              WHERE (expires_at_ns IS NULL OR expires_at_ns > ?)",
        );
        let mut bind_values: Vec<Value> = vec![Value::Integer(now_ns)];

        if let Some(after_key) = &query.after_key {
            sql.push_str(" AND key > ?");
            bind_values.push(Value::Blob(after_key.clone()));
        }

        sql.push_str(" ORDER BY key ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut entities = Vec::new();

        while let Some(row) = rows.next()? {
            entities.push(Entity {
                key: row.get(0)?,
                value: row.get(1)?,
            });
        }

        Ok(entities)
    }

    fn delete(&self, key: &[u8]) -> RepoResult<()> {
        let now_ns = unix_timestamp_ns()?;
        let tx = self.write_transaction()?;
        purge_expired_in_tx(&tx, now_ns)?;
        tx.execute("DELETE FROM entries WHERE key = ?1;", params![key])?;
        tx.commit()?;
        Ok(())
    }

    fn generate_unique_id(&self) -> RepoResult<String> {
        let timestamp_ns = unix_timestamp_ns()?;
        self.first_free_identifier(timestamp_ns)
    }

    fn insert_with_generated_id(
        &self,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> RepoResult<String> {
        let now_ns = unix_timestamp_ns()?;
        let expires_at_ns = match ttl {
            Some(ttl) => Some(expiry_deadline(now_ns, ttl)?),
            None => None,
        };

        let tx = self.write_transaction()?;
        purge_expired_in_tx(&tx, now_ns)?;

        for sequence in 0..SEQUENCE_SPACE {
            let candidate = format_unique_id(now_ns, sequence);
            if entry_live_in_tx(&tx, candidate.as_bytes(), now_ns)? {
                continue;
            }
            tx.execute(
                "INSERT INTO entries (key, value, expires_at_ns, created_at_ns, updated_at_ns)
                 VALUES (?1, ?2, ?3, ?4, ?4);",
                params![candidate.as_bytes(), value, expires_at_ns, now_ns],
            )?;
            tx.commit()?;
            return Ok(candidate);
        }

        warn!("event=unique_id_exhausted module=repo status=error timestamp_ns={now_ns}");
        Err(RepoError::IdSpaceExhausted {
            timestamp_ns: now_ns,
        })
    }

    fn date_from_unique_id(&self, id: &str) -> RepoResult<String> {
        let parts = parse_unique_id(id)?;
        let formatted: Option<String> = self.conn.query_row(
            "SELECT strftime('%Y-%m-%d %H:%M:%S', ?1, 'unixepoch');",
            params![parts.epoch_seconds()],
            |row| row.get(0),
        )?;
        formatted.ok_or_else(|| {
            RepoError::InvalidData(format!(
                "timestamp {} is outside the formattable date range",
                parts.epoch_seconds()
            ))
        })
    }
}

/// Current Unix time in nanoseconds.
fn unix_timestamp_ns() -> RepoResult<i64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(RepoError::Clock)?;
    i64::try_from(elapsed.as_nanos()).map_err(|_| {
        RepoError::InvalidData("system time exceeds the nanosecond timestamp range".to_string())
    })
}

fn expiry_deadline(now_ns: i64, ttl: Duration) -> RepoResult<i64> {
    let ttl_ns = i64::try_from(ttl.as_nanos())
        .map_err(|_| RepoError::InvalidData("ttl exceeds the nanosecond range".to_string()))?;
    now_ns.checked_add(ttl_ns).ok_or_else(|| {
        RepoError::InvalidData("ttl deadline overflows the timestamp range".to_string())
    })
}

fn purge_expired_in_tx(tx: &Transaction<'_>, now_ns: i64) -> RepoResult<usize> {
    let purged = tx.execute(
        "DELETE FROM entries WHERE expires_at_ns IS NOT NULL AND expires_at_ns <= ?1;",
        params![now_ns],
    )?;
    Ok(purged)
}

fn entry_live_in_tx(tx: &Transaction<'_>, key: &[u8], now_ns: i64) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM entries
             WHERE key = ?1
               AND (expires_at_ns IS NULL OR expires_at_ns > ?2)
        );",
        params![key, now_ns],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
