//! Durable store: open/create the SQLite database and keep its schema
//! current.
//!
//! Runtime defaults follow the usual local-store discipline:
//! - `journal_mode = WAL` so readers are never blocked by a writer
//! - `busy_timeout = 5s` to ride out transient lock contention
//! - `foreign_keys = ON` to back-stop parent/child insertion order
//!
//! If the store cannot be opened or migrated, every operation fails with
//! [`Error::StorageUnavailable`]; the engine never attempts automatic
//! repair.

pub mod migrations;
pub mod schema;

use rusqlite::Connection;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::error::{Error, Result};

/// Busy timeout for store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (or create) the store at `path`, apply runtime pragmas, and
/// migrate the schema to the latest version.
///
/// # Errors
///
/// Returns [`Error::StorageUnavailable`] if the database cannot be
/// opened, configured, or migrated.
pub fn open_store(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(Error::storage_io)?;
    }

    let mut conn = Connection::open(path).map_err(Error::storage)?;
    configure_connection(&conn).map_err(Error::storage)?;
    migrations::migrate(&mut conn).map_err(Error::storage)?;

    tracing::debug!(path = %path.display(), "opened tack store");
    Ok(conn)
}

/// Open a fresh in-memory store at the latest schema version.
///
/// # Errors
///
/// Returns [`Error::StorageUnavailable`] if SQLite fails to create or
/// migrate the database.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().map_err(Error::storage)?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(Error::storage)?;
    migrations::migrate(&mut conn).map_err(Error::storage)?;
    Ok(conn)
}

/// Default on-disk location: `<platform data dir>/tack/tack.sqlite3`.
///
/// Returns `None` when the platform exposes no user data directory (the
/// caller must then supply an explicit path).
#[must_use]
pub fn default_store_path() -> Option<PathBuf> {
    let mut path = dirs::data_dir()?;
    path.push("tack");
    path.push("tack.sqlite3");
    Some(path)
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_BUSY_TIMEOUT, default_store_path, open_store};
    use crate::db::migrations;
    use tempfile::TempDir;

    fn temp_db_path() -> (TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("tack.sqlite3");
        (dir, path)
    }

    #[test]
    fn open_store_sets_wal_busy_timeout_and_fk() {
        let (_dir, path) = temp_db_path();
        let conn = open_store(&path).expect("open store");

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .expect("query journal_mode");
        assert_eq!(journal_mode.to_ascii_lowercase(), "wal");

        let busy_timeout_ms: u64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .expect("query busy_timeout");
        assert_eq!(
            u128::from(busy_timeout_ms),
            DEFAULT_BUSY_TIMEOUT.as_millis()
        );

        let foreign_keys: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .expect("query foreign_keys");
        assert_eq!(foreign_keys, 1);
    }

    #[test]
    fn open_store_runs_migrations_and_creates_parent_dirs() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("nested").join("deeper").join("tack.sqlite3");

        let conn = open_store(&path).expect("open store");
        let version = migrations::current_schema_version(&conn).expect("schema version query");
        assert_eq!(version, migrations::LATEST_SCHEMA_VERSION);
    }

    #[test]
    fn default_store_path_ends_with_the_app_file() {
        if let Some(path) = default_store_path() {
            assert!(path.ends_with("tack/tack.sqlite3"));
        }
    }
}
