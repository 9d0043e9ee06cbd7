//! SQLite schema migrations for the tack store.
//!
//! The store carries its schema version in `PRAGMA user_version`. On open,
//! any migration newer than the stored version runs inside its own
//! transaction. Migrations are additive only (`CREATE ... IF NOT EXISTS`)
//! and therefore safe to re-run if interrupted; field-level evolution is
//! handled as normalize-on-read in the repository instead.

use super::schema;
use rusqlite::{Connection, types::Type};

/// Latest schema version understood by this build.
pub const LATEST_SCHEMA_VERSION: u32 = 2;

const MIGRATIONS: &[(u32, &str)] = &[(1, schema::MIGRATION_V1_SQL), (2, schema::MIGRATION_V2_SQL)];

/// Read `PRAGMA user_version` as a `u32`.
///
/// # Errors
///
/// Returns an error if querying SQLite fails or the stored value cannot
/// be represented as `u32`.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(version).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(error))
    })
}

/// Apply all pending migrations in ascending order and return the final
/// schema version.
///
/// # Errors
///
/// Returns an error if any migration fails; already-applied migrations
/// are left committed.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
    let mut current = current_schema_version(conn)?;

    for (version, sql) in MIGRATIONS {
        if *version <= current {
            continue;
        }

        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", i64::from(*version))?;
        tx.commit()?;

        tracing::debug!(version = *version, "applied store migration");
        current = *version;
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::{LATEST_SCHEMA_VERSION, current_schema_version, migrate};
    use crate::db::schema;
    use rusqlite::{Connection, params};

    fn sqlite_object_exists(
        conn: &Connection,
        object_type: &str,
        object_name: &str,
    ) -> rusqlite::Result<bool> {
        conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = ?1 AND name = ?2
            )",
            params![object_type, object_name],
            |row| row.get(0),
        )
    }

    #[test]
    fn migrate_empty_db_to_latest() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;

        let applied = migrate(&mut conn)?;
        assert_eq!(applied, LATEST_SCHEMA_VERSION);
        assert_eq!(current_schema_version(&conn)?, LATEST_SCHEMA_VERSION);

        for table in ["boards", "columns", "tasks", "labels", "templates"] {
            assert!(
                sqlite_object_exists(&conn, "table", table)?,
                "missing expected table {table}"
            );
        }

        for index in schema::REQUIRED_INDEXES {
            assert!(
                sqlite_object_exists(&conn, "index", index)?,
                "missing expected index {index}"
            );
        }

        Ok(())
    }

    #[test]
    fn migrate_is_idempotent() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;

        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);
        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);
        assert_eq!(current_schema_version(&conn)?, LATEST_SCHEMA_VERSION);

        Ok(())
    }

    #[test]
    fn migrate_upgrades_a_v1_store_without_touching_data() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;

        // A store as the first shipped revision left it: v1 schema, one
        // board, no templates table.
        conn.execute_batch(schema::MIGRATION_V1_SQL)?;
        conn.pragma_update(None, "user_version", 1_i64)?;
        conn.execute(
            "INSERT INTO boards (board_id, title, created_at_ms, updated_at_ms)
             VALUES ('b1', 'Pre-upgrade board', 5, 5)",
            [],
        )?;
        assert!(!sqlite_object_exists(&conn, "table", "templates")?);

        let applied = migrate(&mut conn)?;
        assert_eq!(applied, LATEST_SCHEMA_VERSION);
        assert!(sqlite_object_exists(&conn, "table", "templates")?);

        let title: String =
            conn.query_row("SELECT title FROM boards WHERE board_id = 'b1'", [], |row| {
                row.get(0)
            })?;
        assert_eq!(title, "Pre-upgrade board");

        Ok(())
    }
}
