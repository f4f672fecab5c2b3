//! Connection bootstrap for the entity store.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure the pragmas the repository layer relies on.
//! - Apply pending schema migrations before handing the connection out.
//!
//! # Invariants
//! - Returned connections are fully migrated.
//! - File-backed connections run in WAL journal mode.

use super::migrations::apply_migrations;
use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a store file and applies all pending migrations.
///
/// Emits `db_open` log events with mode, duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let started_at = Instant::now();
    let conn = Connection::open(path).map_err(|err| {
        log_open_failure("file", started_at, &err);
        err
    })?;
    // WAL keeps readers unblocked while a write transaction commits.
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    finish_bootstrap(conn, "file", started_at)
}

/// Opens an in-memory store and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    let started_at = Instant::now();
    let conn = Connection::open_in_memory().map_err(|err| {
        log_open_failure("memory", started_at, &err);
        err
    })?;
    finish_bootstrap(conn, "memory", started_at)
}

fn finish_bootstrap(mut conn: Connection, mode: &str, started_at: Instant) -> DbResult<Connection> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    match apply_migrations(&mut conn) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_migrate_failed error={err}",
                started_at.elapsed().as_millis()
            );
            Err(err)
        }
    }
}

fn log_open_failure(mode: &str, started_at: Instant, err: &rusqlite::Error) {
    error!(
        "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={err}",
        started_at.elapsed().as_millis()
    );
}
