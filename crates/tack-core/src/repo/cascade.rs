//! Delete propagation.
//!
//! Deletion is transitive and never leaves orphans or dangling
//! references: a board takes its columns, their tasks, and its labels
//! with it; a column takes its tasks; a label takes its id out of every
//! referencing task. Callers wrap these helpers in a transaction (see
//! `repo::in_txn`) so no intermediate state is observable.
//!
//! The helpers here do no sibling renumbering themselves; the callers
//! renumber inside the same transaction wherever a column or task
//! disappears from a sibling set that survives.

use rusqlite::{Connection, params};

use crate::error::{Error, Result};
use crate::repo::tasks;

/// Counts of what a board-delete cascade removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CascadeStats {
    pub columns: usize,
    pub tasks: usize,
    pub labels: usize,
}

/// Delete a board, its columns, their tasks, and its labels.
///
/// Tasks go first (column by column, as the column-delete cascade does),
/// then the columns, then the labels. No task scrub is needed for the
/// labels: every task that could reference them is already gone.
pub(crate) fn delete_board_tree(
    conn: &Connection,
    board_id: &str,
) -> rusqlite::Result<CascadeStats> {
    let mut stats = CascadeStats::default();

    let column_ids: Vec<String> = {
        let mut stmt =
            conn.prepare("SELECT column_id FROM columns WHERE board_id = ?1 ORDER BY position")?;
        stmt.query_map(params![board_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
    };

    for column_id in &column_ids {
        stats.tasks += delete_column_tasks(conn, column_id)?;
        conn.execute(
            "DELETE FROM columns WHERE column_id = ?1",
            params![column_id],
        )?;
    }
    stats.columns = column_ids.len();

    stats.labels = conn.execute("DELETE FROM labels WHERE board_id = ?1", params![board_id])?;
    conn.execute("DELETE FROM boards WHERE board_id = ?1", params![board_id])?;

    Ok(stats)
}

/// Delete every task of a column; returns how many went.
pub(crate) fn delete_column_tasks(conn: &Connection, column_id: &str) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM tasks WHERE column_id = ?1", params![column_id])
}

/// Remove `label_id` from the `labelIds` of every task in `board_id`,
/// persisting only the tasks that actually changed. Returns how many
/// tasks were rewritten.
pub(crate) fn scrub_label_references(
    conn: &Connection,
    board_id: &str,
    label_id: &str,
) -> Result<usize> {
    let map_err = Error::partial_write("delete_label");

    let column_ids: Vec<String> = {
        let mut stmt = conn
            .prepare("SELECT column_id FROM columns WHERE board_id = ?1")
            .map_err(&map_err)?;
        stmt.query_map(params![board_id], |row| row.get(0))
            .map_err(&map_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(&map_err)?
    };

    let mut scrubbed = 0;
    for column_id in column_ids {
        for mut task in tasks::tasks_by_column(conn, &column_id)? {
            let before = task.label_ids.len();
            task.label_ids.retain(|id| id != label_id);
            if task.label_ids.len() == before {
                continue;
            }
            tasks::update_label_ids_raw(conn, &task.id, &task.label_ids).map_err(&map_err)?;
            scrubbed += 1;
        }
    }

    Ok(scrubbed)
}

#[cfg(test)]
mod tests {
    use super::scrub_label_references;
    use crate::db;
    use crate::model::board::{Board, Label};
    use crate::model::column::Column;
    use crate::model::task::Task;
    use crate::repo::{
        boards::save_board, columns::save_column, labels::save_label, tasks::get_task,
        tasks::save_task,
    };
    use rusqlite::Connection;

    fn fixture(conn: &Connection) -> (Board, Column, Label) {
        let board = Board::new("Fixture");
        save_board(conn, &board).expect("save board");
        let column = Column::new("To Do", &board.id, 0);
        save_column(conn, &column).expect("save column");
        let label = Label::new("bug", "#d73a4a", &board.id);
        save_label(conn, &label).expect("save label");
        (board, column, label)
    }

    #[test]
    fn scrub_touches_only_referencing_tasks() {
        let conn = db::open_in_memory().expect("open store");
        let (board, column, label) = fixture(&conn);

        let mut tagged = Task::new("Tagged", &column.id, 0);
        tagged.label_ids = vec![label.id.clone(), "other".into()];
        save_task(&conn, &tagged).expect("save tagged");

        let mut untouched = Task::new("Untouched", &column.id, 1);
        untouched.label_ids = vec!["other".into()];
        untouched.updated_at = 42;
        save_task(&conn, &untouched).expect("save untouched");

        let scrubbed =
            scrub_label_references(&conn, &board.id, &label.id).expect("scrub references");
        assert_eq!(scrubbed, 1);

        let tagged_after = get_task(&conn, &tagged.id)
            .expect("get tagged")
            .expect("present");
        assert_eq!(tagged_after.label_ids, vec!["other".to_string()]);

        // The non-referencing task was not rewritten at all.
        let untouched_after = get_task(&conn, &untouched.id)
            .expect("get untouched")
            .expect("present");
        assert_eq!(untouched_after.updated_at, 42);
    }
}
