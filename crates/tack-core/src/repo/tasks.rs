//! Task CRUD and the central normalize-on-read step.
//!
//! Tasks are the only entity with embedded value-type children. The four
//! optional collections and the priority live in their own columns; every
//! decode defaults them (empty / lowest) so no caller ever sees the
//! absent-field shape, regardless of which schema revision wrote the row.

use std::str::FromStr;

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::clock::now_ms;
use crate::error::{Error, Result};
use crate::model::task::{Attachment, Comment, Priority, Subtask, Task};
use crate::order;
use crate::repo::{decode_json_list, encode_json_list, in_txn};

const TASK_COLUMNS: &str = "task_id, column_id, title, description, position, priority, \
     due_date_ms, completed, completed_at_ms, label_ids, subtasks, comments, attachments, \
     created_at_ms, updated_at_ms";

fn task_from_row(row: &Row) -> rusqlite::Result<Task> {
    let id: String = row.get(0)?;
    let priority_raw: String = row.get(5)?;
    let label_ids_raw: String = row.get(9)?;
    let subtasks_raw: String = row.get(10)?;
    let comments_raw: String = row.get(11)?;
    let attachments_raw: String = row.get(12)?;

    let priority = Priority::from_str(&priority_raw).unwrap_or_else(|error| {
        tracing::warn!(task_id = %id, %error, "unknown priority, defaulting to lowest");
        Priority::default()
    });

    Ok(Task {
        title: row.get(2)?,
        description: row.get(3)?,
        column_id: row.get(1)?,
        order: row.get(4)?,
        label_ids: decode_json_list(&id, "label_ids", &label_ids_raw),
        due_date: row.get(6)?,
        subtasks: decode_json_list::<Subtask>(&id, "subtasks", &subtasks_raw),
        comments: decode_json_list::<Comment>(&id, "comments", &comments_raw),
        attachments: decode_json_list::<Attachment>(&id, "attachments", &attachments_raw),
        priority,
        completed: row.get(7)?,
        completed_at: row.get(8)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
        id,
    })
}

/// Tasks of a column, ordered by `order` ascending, fully normalized.
///
/// # Errors
///
/// Returns [`Error::StorageUnavailable`] if the store cannot be read.
pub fn tasks_by_column(conn: &Connection, column_id: &str) -> Result<Vec<Task>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE column_id = ?1
             ORDER BY position ASC, task_id ASC"
        ))
        .map_err(Error::storage)?;
    let tasks = stmt
        .query_map(params![column_id], task_from_row)
        .map_err(Error::storage)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Error::storage)?;
    Ok(tasks)
}

/// Every task in the store, grouped by column and ordered by `order`.
/// Used by the export gateway.
pub(crate) fn all_tasks(conn: &Connection) -> Result<Vec<Task>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY column_id ASC, position ASC"
        ))
        .map_err(Error::storage)?;
    let tasks = stmt
        .query_map([], task_from_row)
        .map_err(Error::storage)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Error::storage)?;
    Ok(tasks)
}

/// Look up a task by id; `Ok(None)` when absent.
///
/// # Errors
///
/// Returns [`Error::StorageUnavailable`] if the store cannot be read.
pub fn get_task(conn: &Connection, id: &str) -> Result<Option<Task>> {
    conn.query_row(
        &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE task_id = ?1"),
        params![id],
        task_from_row,
    )
    .optional()
    .map_err(Error::storage)
}

pub(crate) fn upsert_task_raw(conn: &Connection, task: &Task) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO tasks (
            task_id, column_id, title, description, position, priority,
            due_date_ms, completed, completed_at_ms, label_ids, subtasks,
            comments, attachments, created_at_ms, updated_at_ms
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
         ON CONFLICT(task_id) DO UPDATE SET
            column_id = excluded.column_id,
            title = excluded.title,
            description = excluded.description,
            position = excluded.position,
            priority = excluded.priority,
            due_date_ms = excluded.due_date_ms,
            completed = excluded.completed,
            completed_at_ms = excluded.completed_at_ms,
            label_ids = excluded.label_ids,
            subtasks = excluded.subtasks,
            comments = excluded.comments,
            attachments = excluded.attachments,
            created_at_ms = excluded.created_at_ms,
            updated_at_ms = excluded.updated_at_ms",
        params![
            task.id,
            task.column_id,
            task.title,
            task.description,
            task.order,
            task.priority.as_str(),
            task.due_date,
            task.completed,
            task.completed_at,
            encode_json_list(&task.label_ids),
            encode_json_list(&task.subtasks),
            encode_json_list(&task.comments),
            encode_json_list(&task.attachments),
            task.created_at,
            task.updated_at
        ],
    )?;
    Ok(())
}

/// Upsert a task by id, always writing the normalized shape (collections
/// present, priority one of the fixed enumeration).
///
/// # Errors
///
/// Returns [`Error::StorageUnavailable`] if the write fails.
pub fn save_task(conn: &Connection, task: &Task) -> Result<()> {
    upsert_task_raw(conn, task).map_err(Error::storage)
}

/// Delete a task, then close the order gap among its former siblings.
/// Deleting a missing id is a no-op.
///
/// # Errors
///
/// Returns [`Error::PartialWrite`] if the delete-and-renumber fails
/// partway.
pub fn delete_task(conn: &Connection, id: &str) -> Result<()> {
    let Some(task) = get_task(conn, id)? else {
        return Ok(());
    };

    in_txn(conn, "delete_task", |c| {
        let map_err = Error::partial_write("delete_task");
        c.execute("DELETE FROM tasks WHERE task_id = ?1", params![id])
            .map_err(&map_err)?;
        order::resequence_tasks(c, &task.column_id).map_err(&map_err)?;
        Ok(())
    })?;

    tracing::debug!(task_id = %id, column_id = %task.column_id, "deleted task");
    Ok(())
}

/// Rewrite a task's label references (used by the label scrub).
pub(crate) fn update_label_ids_raw(
    conn: &Connection,
    task_id: &str,
    label_ids: &[String],
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE tasks SET label_ids = ?1, updated_at_ms = ?2 WHERE task_id = ?3",
        params![encode_json_list(label_ids), now_ms(), task_id],
    )?;
    Ok(())
}
