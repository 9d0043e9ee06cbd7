//! Dense sibling ordering.
//!
//! Each parent's children (columns within a board, tasks within a column)
//! expose an `order` sequence that is exactly `0..n` after every mutating
//! operation. This module owns the two algorithms that interactive drags
//! trigger — single-list reorder and cross-list move — plus the renumber
//! helpers the delete paths use to close gaps.
//!
//! A reorder rewrites all `n` positions rather than computing the minimal
//! touched set; a cross-list move completes the full read-modify-write
//! for both lists inside one transaction, and the moved task is written
//! exactly once, with its final column and order.

use rusqlite::{Connection, params};

use crate::clock::now_ms;
use crate::error::{Error, Result};
use crate::model::column::Column;
use crate::model::task::Task;
use crate::repo::{columns, in_txn, tasks};

/// Anything occupying an order slot in a parent-scoped sibling list.
pub trait Ordered {
    fn order(&self) -> i64;
    fn set_order(&mut self, order: i64);
}

impl Ordered for Column {
    fn order(&self) -> i64 {
        self.order
    }

    fn set_order(&mut self, order: i64) {
        self.order = order;
    }
}

impl Ordered for Task {
    fn order(&self) -> i64 {
        self.order
    }

    fn set_order(&mut self, order: i64) {
        self.order = order;
    }
}

/// List position as a persisted order value. Sibling lists are tiny, so
/// the cast can never wrap in practice.
#[allow(clippy::cast_possible_wrap)]
pub(crate) const fn position_to_order(position: usize) -> i64 {
    position as i64
}

/// Remove the element at `source` and reinsert it at `target` (clamped
/// to the end). Out-of-range `source` is a no-op; callers that care
/// validate first.
pub fn shift<T>(list: &mut Vec<T>, source: usize, target: usize) {
    if source >= list.len() {
        return;
    }
    let item = list.remove(source);
    let target = target.min(list.len());
    list.insert(target, item);
}

/// Assign dense zero-based orders by list position.
pub fn renumber<T: Ordered>(list: &mut [T]) {
    for (position, item) in list.iter_mut().enumerate() {
        item.set_order(position_to_order(position));
    }
}

/// Whether the list's orders form exactly `0..n`.
#[must_use]
pub fn is_dense<T: Ordered>(list: &[T]) -> bool {
    list.iter()
        .enumerate()
        .all(|(position, item)| item.order() == position_to_order(position))
}

// ---------------------------------------------------------------------------
// Column ordering
// ---------------------------------------------------------------------------

/// Reorder a board's columns by `(source, target)` index pair.
///
/// `target` clamps to the last slot; `source == target` (after clamping)
/// is a no-op with zero writes. Returns the final ordered list.
///
/// # Errors
///
/// [`Error::InvalidPosition`] if `source` is out of range,
/// [`Error::PartialWrite`] if persisting the renumbered list fails.
pub fn reorder_columns(
    conn: &Connection,
    board_id: &str,
    source: usize,
    target: usize,
) -> Result<Vec<Column>> {
    let mut list = columns::columns_by_board(conn, board_id)?;
    if source >= list.len() {
        return Err(Error::InvalidPosition {
            position: source,
            len: list.len(),
        });
    }

    let target = target.min(list.len() - 1);
    if source == target {
        return Ok(list);
    }

    shift(&mut list, source, target);
    persist_column_order(conn, &mut list)?;
    Ok(list)
}

/// Renumber `list` by position and persist every column's order.
///
/// This is the "here is the new ordered list" entry point the UI uses
/// after a drop event.
///
/// # Errors
///
/// Returns [`Error::PartialWrite`] if any write fails.
pub fn persist_column_order(conn: &Connection, list: &mut [Column]) -> Result<()> {
    renumber(list);
    in_txn(conn, "reorder_columns", |c| {
        write_column_positions(c, list).map_err(Error::partial_write("reorder_columns"))
    })
}

fn write_column_positions(conn: &Connection, list: &[Column]) -> rusqlite::Result<()> {
    for column in list {
        conn.execute(
            "UPDATE columns SET position = ?1 WHERE column_id = ?2",
            params![column.order, column.id],
        )?;
    }
    Ok(())
}

/// Close the order gap among a board's surviving columns. Only rows
/// whose position actually changes are rewritten.
pub(crate) fn resequence_columns(conn: &Connection, board_id: &str) -> rusqlite::Result<usize> {
    let ids: Vec<String> = {
        let mut stmt = conn.prepare(
            "SELECT column_id FROM columns WHERE board_id = ?1 ORDER BY position ASC, column_id ASC",
        )?;
        stmt.query_map(params![board_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
    };

    let mut changed = 0;
    for (position, id) in ids.iter().enumerate() {
        changed += conn.execute(
            "UPDATE columns SET position = ?1 WHERE column_id = ?2 AND position <> ?1",
            params![position_to_order(position), id],
        )?;
    }
    Ok(changed)
}

// ---------------------------------------------------------------------------
// Task ordering
// ---------------------------------------------------------------------------

/// Reorder a column's tasks by `(source, target)` index pair.
///
/// Same contract as [`reorder_columns`].
///
/// # Errors
///
/// [`Error::InvalidPosition`] if `source` is out of range,
/// [`Error::PartialWrite`] if persisting the renumbered list fails.
pub fn reorder_tasks(
    conn: &Connection,
    column_id: &str,
    source: usize,
    target: usize,
) -> Result<Vec<Task>> {
    let mut list = tasks::tasks_by_column(conn, column_id)?;
    if source >= list.len() {
        return Err(Error::InvalidPosition {
            position: source,
            len: list.len(),
        });
    }

    let target = target.min(list.len() - 1);
    if source == target {
        return Ok(list);
    }

    shift(&mut list, source, target);
    persist_task_order(conn, &mut list)?;
    Ok(list)
}

/// Renumber `list` by position and persist every task's order.
///
/// # Errors
///
/// Returns [`Error::PartialWrite`] if any write fails.
pub fn persist_task_order(conn: &Connection, list: &mut [Task]) -> Result<()> {
    renumber(list);
    in_txn(conn, "reorder_tasks", |c| {
        write_task_positions(c, list).map_err(Error::partial_write("reorder_tasks"))
    })
}

fn write_task_positions(conn: &Connection, list: &[Task]) -> rusqlite::Result<()> {
    for task in list {
        conn.execute(
            "UPDATE tasks SET position = ?1 WHERE task_id = ?2",
            params![task.order, task.id],
        )?;
    }
    Ok(())
}

/// Close the order gap among a column's surviving tasks. Only rows whose
/// position actually changes are rewritten.
pub(crate) fn resequence_tasks(conn: &Connection, column_id: &str) -> rusqlite::Result<usize> {
    let ids: Vec<String> = {
        let mut stmt = conn.prepare(
            "SELECT task_id FROM tasks WHERE column_id = ?1 ORDER BY position ASC, task_id ASC",
        )?;
        stmt.query_map(params![column_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
    };

    let mut changed = 0;
    for (position, id) in ids.iter().enumerate() {
        changed += conn.execute(
            "UPDATE tasks SET position = ?1 WHERE task_id = ?2 AND position <> ?1",
            params![position_to_order(position), id],
        )?;
    }
    Ok(changed)
}

// ---------------------------------------------------------------------------
// Cross-list move
// ---------------------------------------------------------------------------

/// Move a task between columns (or within one), landing at `new_index`
/// in the target list (clamped; an index beyond the end appends).
///
/// Both lists are renumbered and persisted in one transaction. When
/// source and target are the same column this degenerates to the
/// single-list reorder, and a move onto the task's current index is a
/// no-op with zero writes. Returns the task in its final state.
///
/// # Errors
///
/// [`Error::NotFound`] if the task is not in the source column or the
/// target column does not exist, [`Error::PartialWrite`] if persisting
/// fails partway.
pub fn move_task(
    conn: &Connection,
    task_id: &str,
    source_column_id: &str,
    target_column_id: &str,
    new_index: usize,
) -> Result<Task> {
    if source_column_id == target_column_id {
        return move_within_column(conn, task_id, source_column_id, new_index);
    }

    if columns::get_column(conn, target_column_id)?.is_none() {
        return Err(Error::not_found("column", target_column_id));
    }

    let mut source_list = tasks::tasks_by_column(conn, source_column_id)?;
    let Some(at) = source_list.iter().position(|t| t.id == task_id) else {
        return Err(Error::not_found("task", task_id));
    };

    let mut moved = source_list.remove(at);
    renumber(&mut source_list);

    let mut target_list = tasks::tasks_by_column(conn, target_column_id)?;
    let insert_at = new_index.min(target_list.len());
    moved.column_id = target_column_id.to_string();
    moved.updated_at = now_ms();
    target_list.insert(insert_at, moved);
    renumber(&mut target_list);

    persist_move(conn, &source_list, &target_list, task_id)?;

    let moved = target_list
        .into_iter()
        .find(|t| t.id == task_id)
        .ok_or_else(|| Error::not_found("task", task_id))?;

    tracing::debug!(
        task_id,
        source_column_id,
        target_column_id,
        order = moved.order,
        "moved task across columns"
    );
    Ok(moved)
}

fn move_within_column(
    conn: &Connection,
    task_id: &str,
    column_id: &str,
    new_index: usize,
) -> Result<Task> {
    let mut list = tasks::tasks_by_column(conn, column_id)?;
    let Some(current) = list.iter().position(|t| t.id == task_id) else {
        return Err(Error::not_found("task", task_id));
    };

    let target = new_index.min(list.len() - 1);
    if current == target {
        return Ok(list.remove(current));
    }

    shift(&mut list, current, target);
    persist_task_order(conn, &mut list)?;
    list.into_iter()
        .find(|t| t.id == task_id)
        .ok_or_else(|| Error::not_found("task", task_id))
}

/// Persist the outcome of a two-list move in one transaction: position
/// updates for both renumbered lists, with the moved task written once,
/// carrying its full final state.
pub(crate) fn persist_move(
    conn: &Connection,
    source_list: &[Task],
    target_list: &[Task],
    moved_id: &str,
) -> Result<()> {
    in_txn(conn, "move_task", |c| {
        let map_err = Error::partial_write("move_task");
        write_task_positions(c, source_list).map_err(&map_err)?;
        for task in target_list {
            if task.id == moved_id {
                tasks::upsert_task_raw(c, task).map_err(&map_err)?;
            } else {
                c.execute(
                    "UPDATE tasks SET position = ?1 WHERE task_id = ?2",
                    params![task.order, task.id],
                )
                .map_err(&map_err)?;
            }
        }
        Ok(())
    })
}
