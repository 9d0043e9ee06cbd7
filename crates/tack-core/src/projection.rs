//! In-memory projection of one board, the read model a UI shell renders
//! from.
//!
//! Every mutating method is an explicit two-phase update: (1) the new
//! state is applied to the view synchronously, so callers observe it
//! immediately; (2) the durable write is issued against the store. A
//! failed write is returned to the caller with the optimistic state left
//! in place — the view never rolls itself back. [`BoardView::reload`]
//! re-synchronizes from the store when the caller decides to reconcile.

use std::collections::HashMap;

use rusqlite::Connection;

use crate::clock::now_ms;
use crate::error::{Error, Result};
use crate::model::board::Board;
use crate::model::column::Column;
use crate::model::task::Task;
use crate::order;
use crate::repo::{boards, columns, tasks};

/// Cached columns and tasks of the board currently on screen.
#[derive(Debug)]
pub struct BoardView {
    board: Board,
    columns: Vec<Column>,
    tasks: HashMap<String, Vec<Task>>,
}

impl BoardView {
    /// Load the projection for `board_id` from the store.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the board does not exist,
    /// [`Error::StorageUnavailable`] if reads fail.
    pub fn load(conn: &Connection, board_id: &str) -> Result<Self> {
        let Some(board) = boards::get_board(conn, board_id)? else {
            return Err(Error::not_found("board", board_id));
        };

        let board_columns = columns::columns_by_board(conn, board_id)?;
        let mut task_map = HashMap::with_capacity(board_columns.len());
        for column in &board_columns {
            task_map.insert(column.id.clone(), tasks::tasks_by_column(conn, &column.id)?);
        }

        Ok(Self {
            board,
            columns: board_columns,
            tasks: task_map,
        })
    }

    /// Drop the optimistic state and re-read everything from the store.
    ///
    /// # Errors
    ///
    /// As [`BoardView::load`].
    pub fn reload(&mut self, conn: &Connection) -> Result<()> {
        *self = Self::load(conn, &self.board.id)?;
        Ok(())
    }

    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Tasks of a column, in order. Unknown columns read as empty.
    #[must_use]
    pub fn tasks(&self, column_id: &str) -> &[Task] {
        self.tasks.get(column_id).map_or(&[], Vec::as_slice)
    }

    // -----------------------------------------------------------------------
    // Ordering operations
    // -----------------------------------------------------------------------

    /// Reorder this board's columns by `(source, target)` index pair.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPosition`] if `source` is out of range; a durable
    /// write failure surfaces after the view is already updated.
    pub fn reorder_columns(
        &mut self,
        conn: &Connection,
        source: usize,
        target: usize,
    ) -> Result<()> {
        if source >= self.columns.len() {
            return Err(Error::InvalidPosition {
                position: source,
                len: self.columns.len(),
            });
        }
        let target = target.min(self.columns.len() - 1);
        if source == target {
            return Ok(());
        }

        order::shift(&mut self.columns, source, target);
        order::persist_column_order(conn, &mut self.columns)
    }

    /// Reorder one column's tasks by `(source, target)` index pair.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPosition`] if `source` is out of range; a durable
    /// write failure surfaces after the view is already updated.
    pub fn reorder_tasks(
        &mut self,
        conn: &Connection,
        column_id: &str,
        source: usize,
        target: usize,
    ) -> Result<()> {
        let list = self.tasks.entry(column_id.to_string()).or_default();
        if source >= list.len() {
            return Err(Error::InvalidPosition {
                position: source,
                len: list.len(),
            });
        }
        let target = target.min(list.len() - 1);
        if source == target {
            return Ok(());
        }

        order::shift(list, source, target);
        order::persist_task_order(conn, list)
    }

    /// Move a task between columns (or within one), landing at
    /// `new_index` in the target column.
    ///
    /// Moving into a column marked `isCompleteColumn` completes the task
    /// (`completed = true`, `completedAt` stamped); moving it back out
    /// into a regular column reopens it. The ordering algorithm itself
    /// does not depend on this side effect.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the task is not in the source column or
    /// the target column is not on this board; a durable write failure
    /// surfaces after the view is already updated.
    pub fn move_task(
        &mut self,
        conn: &Connection,
        task_id: &str,
        source_column_id: &str,
        target_column_id: &str,
        new_index: usize,
    ) -> Result<()> {
        if source_column_id == target_column_id {
            return self.move_within_column(conn, task_id, source_column_id, new_index);
        }

        let source_complete = self
            .column_flag(source_column_id)
            .ok_or_else(|| Error::not_found("column", source_column_id))?;
        let target_complete = self
            .column_flag(target_column_id)
            .ok_or_else(|| Error::not_found("column", target_column_id))?;

        let Some(at) = self
            .tasks
            .get(source_column_id)
            .and_then(|list| list.iter().position(|t| t.id == task_id))
        else {
            return Err(Error::not_found("task", task_id));
        };

        // Phase 1: the view.
        let mut source_list = self.tasks.remove(source_column_id).unwrap_or_default();
        let mut moved = source_list.remove(at);
        order::renumber(&mut source_list);

        let now = now_ms();
        moved.column_id = target_column_id.to_string();
        moved.updated_at = now;
        if target_complete && !moved.completed {
            moved.completed = true;
            moved.completed_at = Some(now);
        } else if !target_complete && source_complete && moved.completed {
            moved.completed = false;
            moved.completed_at = None;
        }

        let mut target_list = self.tasks.remove(target_column_id).unwrap_or_default();
        let insert_at = new_index.min(target_list.len());
        target_list.insert(insert_at, moved);
        order::renumber(&mut target_list);

        self.tasks
            .insert(source_column_id.to_string(), source_list);
        self.tasks
            .insert(target_column_id.to_string(), target_list);

        // Phase 2: the store.
        order::persist_move(
            conn,
            self.tasks(source_column_id),
            self.tasks(target_column_id),
            task_id,
        )
    }

    fn move_within_column(
        &mut self,
        conn: &Connection,
        task_id: &str,
        column_id: &str,
        new_index: usize,
    ) -> Result<()> {
        let list = self.tasks.entry(column_id.to_string()).or_default();
        let Some(current) = list.iter().position(|t| t.id == task_id) else {
            return Err(Error::not_found("task", task_id));
        };

        let target = new_index.min(list.len() - 1);
        if current == target {
            return Ok(());
        }

        order::shift(list, current, target);
        order::persist_task_order(conn, list)
    }

    fn column_flag(&self, column_id: &str) -> Option<bool> {
        self.columns
            .iter()
            .find(|c| c.id == column_id)
            .map(|c| c.is_complete_column)
    }

    // -----------------------------------------------------------------------
    // Entity operations
    // -----------------------------------------------------------------------

    /// Append a new task to the end of a column.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the column is not on this board; a durable
    /// write failure surfaces after the view is already updated.
    pub fn insert_task(&mut self, conn: &Connection, mut task: Task) -> Result<()> {
        if self.column_flag(&task.column_id).is_none() {
            return Err(Error::not_found("column", task.column_id.clone()));
        }

        let list = self.tasks.entry(task.column_id.clone()).or_default();
        task.order = order::position_to_order(list.len());
        list.push(task.clone());

        tasks::save_task(conn, &task)
    }

    /// Replace a task in place (same column, same order slot).
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the task is not in the view; a durable
    /// write failure surfaces after the view is already updated.
    pub fn update_task(&mut self, conn: &Connection, mut task: Task) -> Result<()> {
        let Some(slot) = self
            .tasks
            .get_mut(&task.column_id)
            .and_then(|list| list.iter_mut().find(|t| t.id == task.id))
        else {
            return Err(Error::not_found("task", task.id.clone()));
        };

        task.order = slot.order;
        *slot = task.clone();
        tasks::save_task(conn, &task)
    }

    /// Remove a task and close the order gap among its siblings.
    ///
    /// # Errors
    ///
    /// A durable write failure surfaces after the view is already
    /// updated; removing a task the view does not hold is a no-op.
    pub fn remove_task(&mut self, conn: &Connection, task_id: &str) -> Result<()> {
        for list in self.tasks.values_mut() {
            if let Some(at) = list.iter().position(|t| t.id == task_id) {
                list.remove(at);
                order::renumber(list);
                break;
            }
        }
        tasks::delete_task(conn, task_id)
    }

    /// Append a new column to the end of the board.
    ///
    /// # Errors
    ///
    /// A durable write failure surfaces after the view is already
    /// updated.
    pub fn insert_column(&mut self, conn: &Connection, mut column: Column) -> Result<()> {
        column.board_id.clone_from(&self.board.id);
        column.order = order::position_to_order(self.columns.len());
        self.tasks.insert(column.id.clone(), Vec::new());
        self.columns.push(column.clone());

        columns::save_column(conn, &column)
    }

    /// Remove a column, its tasks, and close the order gap among the
    /// surviving columns.
    ///
    /// # Errors
    ///
    /// A durable write failure surfaces after the view is already
    /// updated; removing a column the view does not hold is a no-op.
    pub fn remove_column(&mut self, conn: &Connection, column_id: &str) -> Result<()> {
        if let Some(at) = self.columns.iter().position(|c| c.id == column_id) {
            self.columns.remove(at);
            order::renumber(&mut self.columns);
            self.tasks.remove(column_id);
        }
        columns::delete_column(conn, column_id)
    }
}

#[cfg(test)]
mod tests {
    use super::BoardView;
    use crate::db;
    use crate::model::board::Board;
    use crate::model::column::Column;
    use crate::model::task::Task;
    use crate::repo::{boards::save_board, columns::save_column, tasks::save_task};
    use rusqlite::Connection;

    fn two_column_fixture(conn: &Connection) -> (Board, Column, Column) {
        let board = Board::new("View board");
        save_board(conn, &board).expect("save board");

        let backlog = Column::new("Backlog", &board.id, 0);
        let mut done = Column::new("Done", &board.id, 1);
        done.is_complete_column = true;
        save_column(conn, &backlog).expect("save backlog");
        save_column(conn, &done).expect("save done");

        for order in 0..3 {
            save_task(
                conn,
                &Task::new(format!("Task {order}"), &backlog.id, order),
            )
            .expect("save task");
        }

        (board, backlog, done)
    }

    #[test]
    fn load_projects_columns_and_tasks_in_order() {
        let conn = db::open_in_memory().expect("open store");
        let (board, backlog, done) = two_column_fixture(&conn);

        let view = BoardView::load(&conn, &board.id).expect("load view");
        assert_eq!(view.columns().len(), 2);
        assert_eq!(view.tasks(&backlog.id).len(), 3);
        assert!(view.tasks(&done.id).is_empty());
        assert!(view.tasks("unknown-column").is_empty());
    }

    #[test]
    fn moving_into_the_done_column_completes_the_task() {
        let conn = db::open_in_memory().expect("open store");
        let (board, backlog, done) = two_column_fixture(&conn);
        let mut view = BoardView::load(&conn, &board.id).expect("load view");

        let task_id = view.tasks(&backlog.id)[1].id.clone();
        view.move_task(&conn, &task_id, &backlog.id, &done.id, 0)
            .expect("move task");

        let moved = &view.tasks(&done.id)[0];
        assert!(moved.completed);
        assert!(moved.completed_at.is_some());

        // Durable state agrees with the view.
        let mut fresh = BoardView::load(&conn, &board.id).expect("reload");
        let stored = &fresh.tasks(&done.id)[0];
        assert!(stored.completed);

        // Moving back out reopens it.
        fresh
            .move_task(&conn, &task_id, &done.id, &backlog.id, 0)
            .expect("move back");
        let reopened = &fresh.tasks(&backlog.id)[0];
        assert!(!reopened.completed);
        assert!(reopened.completed_at.is_none());
    }

    #[test]
    fn failed_durable_write_keeps_the_optimistic_state() {
        let conn = db::open_in_memory().expect("open store");
        let (board, backlog, done) = two_column_fixture(&conn);
        let mut view = BoardView::load(&conn, &board.id).expect("load view");

        let task_id = view.tasks(&backlog.id)[0].id.clone();

        // Break the store out from under the view.
        conn.execute_batch("DROP TABLE tasks").expect("drop tasks");

        let result = view.move_task(&conn, &task_id, &backlog.id, &done.id, 0);
        assert!(result.is_err());

        // Phase 1 already applied: the view shows the move.
        assert_eq!(view.tasks(&done.id).len(), 1);
        assert_eq!(view.tasks(&backlog.id).len(), 2);
    }

    #[test]
    fn same_column_move_to_current_index_writes_nothing() {
        let conn = db::open_in_memory().expect("open store");
        let (board, backlog, _done) = two_column_fixture(&conn);
        let mut view = BoardView::load(&conn, &board.id).expect("load view");

        let before: Vec<String> = view.tasks(&backlog.id).iter().map(|t| t.id.clone()).collect();
        let task_id = before[1].clone();

        // Even with the store broken, a no-op move must succeed because
        // it issues no writes at all.
        conn.execute_batch("DROP TABLE tasks").expect("drop tasks");
        view.move_task(&conn, &task_id, &backlog.id, &backlog.id, 1)
            .expect("no-op move");

        let after: Vec<String> = view.tasks(&backlog.id).iter().map(|t| t.id.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn insert_task_appends_at_a_dense_order() {
        let conn = db::open_in_memory().expect("open store");
        let (board, backlog, _done) = two_column_fixture(&conn);
        let mut view = BoardView::load(&conn, &board.id).expect("load view");

        let task = Task::new("Appended", &backlog.id, 0);
        view.insert_task(&conn, task).expect("insert task");

        let orders: Vec<i64> = view.tasks(&backlog.id).iter().map(|t| t.order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3]);
    }
}
