//! Board CRUD.

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::{Error, Result};
use crate::model::board::Board;
use crate::repo::{cascade, in_txn};

const BOARD_COLUMNS: &str = "board_id, title, notes, created_at_ms, updated_at_ms";

fn board_from_row(row: &Row) -> rusqlite::Result<Board> {
    Ok(Board {
        id: row.get(0)?,
        title: row.get(1)?,
        notes: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

/// All boards, ordered by creation time.
///
/// # Errors
///
/// Returns [`Error::StorageUnavailable`] if the store cannot be read.
pub fn all_boards(conn: &Connection) -> Result<Vec<Board>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {BOARD_COLUMNS} FROM boards ORDER BY created_at_ms ASC, board_id ASC"
        ))
        .map_err(Error::storage)?;
    let boards = stmt
        .query_map([], board_from_row)
        .map_err(Error::storage)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Error::storage)?;
    Ok(boards)
}

/// Look up a board by id; `Ok(None)` when absent.
///
/// # Errors
///
/// Returns [`Error::StorageUnavailable`] if the store cannot be read.
pub fn get_board(conn: &Connection, id: &str) -> Result<Option<Board>> {
    conn.query_row(
        &format!("SELECT {BOARD_COLUMNS} FROM boards WHERE board_id = ?1"),
        params![id],
        board_from_row,
    )
    .optional()
    .map_err(Error::storage)
}

pub(crate) fn upsert_board_raw(conn: &Connection, board: &Board) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO boards (board_id, title, notes, created_at_ms, updated_at_ms)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(board_id) DO UPDATE SET
            title = excluded.title,
            notes = excluded.notes,
            created_at_ms = excluded.created_at_ms,
            updated_at_ms = excluded.updated_at_ms",
        params![
            board.id,
            board.title,
            board.notes,
            board.created_at,
            board.updated_at
        ],
    )?;
    Ok(())
}

/// Upsert a board by id.
///
/// # Errors
///
/// Returns [`Error::StorageUnavailable`] if the write fails.
pub fn save_board(conn: &Connection, board: &Board) -> Result<()> {
    upsert_board_raw(conn, board).map_err(Error::storage)
}

/// Delete a board and, transitively, its columns, tasks, and labels.
/// Deleting a missing id is a no-op.
///
/// # Errors
///
/// Returns [`Error::PartialWrite`] if the cascade fails partway.
pub fn delete_board(conn: &Connection, id: &str) -> Result<()> {
    if get_board(conn, id)?.is_none() {
        return Ok(());
    }

    let stats = in_txn(conn, "delete_board", |c| {
        cascade::delete_board_tree(c, id).map_err(Error::partial_write("delete_board"))
    })?;

    tracing::info!(
        board_id = %id,
        columns = stats.columns,
        tasks = stats.tasks,
        labels = stats.labels,
        "deleted board"
    );
    Ok(())
}
