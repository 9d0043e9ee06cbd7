//! Column CRUD.

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::{Error, Result};
use crate::model::column::Column;
use crate::order;
use crate::repo::{cascade, in_txn};

const COLUMN_COLUMNS: &str =
    "column_id, board_id, title, position, color, is_complete_column";

fn column_from_row(row: &Row) -> rusqlite::Result<Column> {
    Ok(Column {
        id: row.get(0)?,
        board_id: row.get(1)?,
        title: row.get(2)?,
        order: row.get(3)?,
        color: row.get(4)?,
        is_complete_column: row.get(5)?,
    })
}

/// Columns of a board, ordered by `order` ascending.
///
/// # Errors
///
/// Returns [`Error::StorageUnavailable`] if the store cannot be read.
pub fn columns_by_board(conn: &Connection, board_id: &str) -> Result<Vec<Column>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLUMN_COLUMNS} FROM columns
             WHERE board_id = ?1
             ORDER BY position ASC, column_id ASC"
        ))
        .map_err(Error::storage)?;
    let columns = stmt
        .query_map(params![board_id], column_from_row)
        .map_err(Error::storage)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Error::storage)?;
    Ok(columns)
}

/// Every column in the store, grouped by board and ordered by `order`.
/// Used by the export gateway.
pub(crate) fn all_columns(conn: &Connection) -> Result<Vec<Column>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLUMN_COLUMNS} FROM columns ORDER BY board_id ASC, position ASC"
        ))
        .map_err(Error::storage)?;
    let columns = stmt
        .query_map([], column_from_row)
        .map_err(Error::storage)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Error::storage)?;
    Ok(columns)
}

/// Look up a column by id; `Ok(None)` when absent.
///
/// # Errors
///
/// Returns [`Error::StorageUnavailable`] if the store cannot be read.
pub fn get_column(conn: &Connection, id: &str) -> Result<Option<Column>> {
    conn.query_row(
        &format!("SELECT {COLUMN_COLUMNS} FROM columns WHERE column_id = ?1"),
        params![id],
        column_from_row,
    )
    .optional()
    .map_err(Error::storage)
}

pub(crate) fn upsert_column_raw(conn: &Connection, column: &Column) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO columns (column_id, board_id, title, position, color, is_complete_column)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(column_id) DO UPDATE SET
            board_id = excluded.board_id,
            title = excluded.title,
            position = excluded.position,
            color = excluded.color,
            is_complete_column = excluded.is_complete_column",
        params![
            column.id,
            column.board_id,
            column.title,
            column.order,
            column.color,
            column.is_complete_column
        ],
    )?;
    Ok(())
}

/// Upsert a column by id.
///
/// # Errors
///
/// Returns [`Error::StorageUnavailable`] if the write fails.
pub fn save_column(conn: &Connection, column: &Column) -> Result<()> {
    upsert_column_raw(conn, column).map_err(Error::storage)
}

/// Delete a column and all of its tasks, then close the order gap among
/// the surviving sibling columns. Deleting a missing id is a no-op.
///
/// # Errors
///
/// Returns [`Error::PartialWrite`] if the cascade fails partway.
pub fn delete_column(conn: &Connection, id: &str) -> Result<()> {
    let Some(column) = get_column(conn, id)? else {
        return Ok(());
    };

    let tasks = in_txn(conn, "delete_column", |c| {
        let map_err = Error::partial_write("delete_column");
        let tasks = cascade::delete_column_tasks(c, id).map_err(&map_err)?;
        c.execute("DELETE FROM columns WHERE column_id = ?1", params![id])
            .map_err(&map_err)?;
        order::resequence_columns(c, &column.board_id).map_err(&map_err)?;
        Ok(tasks)
    })?;

    tracing::info!(column_id = %id, board_id = %column.board_id, tasks, "deleted column");
    Ok(())
}
