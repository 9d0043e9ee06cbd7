//! Label CRUD.
//!
//! Labels are owned by a board and referenced from tasks by id. Deleting
//! a label therefore has a second half: every referencing task in the
//! owning board is scrubbed, and only tasks that actually changed are
//! rewritten.

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::{Error, Result};
use crate::model::board::Label;
use crate::repo::{cascade, in_txn};

const LABEL_COLUMNS: &str = "label_id, board_id, name, color";

fn label_from_row(row: &Row) -> rusqlite::Result<Label> {
    Ok(Label {
        id: row.get(0)?,
        board_id: row.get(1)?,
        name: row.get(2)?,
        color: row.get(3)?,
    })
}

/// Labels of a board, ordered by name.
///
/// # Errors
///
/// Returns [`Error::StorageUnavailable`] if the store cannot be read.
pub fn labels_by_board(conn: &Connection, board_id: &str) -> Result<Vec<Label>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {LABEL_COLUMNS} FROM labels
             WHERE board_id = ?1
             ORDER BY name ASC, label_id ASC"
        ))
        .map_err(Error::storage)?;
    let labels = stmt
        .query_map(params![board_id], label_from_row)
        .map_err(Error::storage)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Error::storage)?;
    Ok(labels)
}

/// Every label in the store. Used by the export gateway.
pub(crate) fn all_labels(conn: &Connection) -> Result<Vec<Label>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {LABEL_COLUMNS} FROM labels ORDER BY board_id ASC, name ASC"
        ))
        .map_err(Error::storage)?;
    let labels = stmt
        .query_map([], label_from_row)
        .map_err(Error::storage)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Error::storage)?;
    Ok(labels)
}

/// Look up a label by id; `Ok(None)` when absent.
///
/// # Errors
///
/// Returns [`Error::StorageUnavailable`] if the store cannot be read.
pub fn get_label(conn: &Connection, id: &str) -> Result<Option<Label>> {
    conn.query_row(
        &format!("SELECT {LABEL_COLUMNS} FROM labels WHERE label_id = ?1"),
        params![id],
        label_from_row,
    )
    .optional()
    .map_err(Error::storage)
}

pub(crate) fn upsert_label_raw(conn: &Connection, label: &Label) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO labels (label_id, board_id, name, color)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(label_id) DO UPDATE SET
            board_id = excluded.board_id,
            name = excluded.name,
            color = excluded.color",
        params![label.id, label.board_id, label.name, label.color],
    )?;
    Ok(())
}

/// Upsert a label by id.
///
/// # Errors
///
/// Returns [`Error::StorageUnavailable`] if the write fails.
pub fn save_label(conn: &Connection, label: &Label) -> Result<()> {
    upsert_label_raw(conn, label).map_err(Error::storage)
}

/// Delete a label and strip its id from every referencing task in the
/// owning board. Deleting a missing id is a no-op.
///
/// # Errors
///
/// Returns [`Error::PartialWrite`] if the delete-and-scrub fails partway.
pub fn delete_label(conn: &Connection, id: &str) -> Result<()> {
    let Some(label) = get_label(conn, id)? else {
        return Ok(());
    };

    let scrubbed = in_txn(conn, "delete_label", |c| {
        c.execute("DELETE FROM labels WHERE label_id = ?1", params![id])
            .map_err(Error::partial_write("delete_label"))?;
        cascade::scrub_label_references(c, &label.board_id, id)
    })?;

    tracing::info!(label_id = %id, board_id = %label.board_id, scrubbed, "deleted label");
    Ok(())
}
