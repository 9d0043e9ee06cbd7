//! Cascade semantics: deleting an ancestor never leaves orphans or
//! dangling references, and sibling collections outside the blast radius
//! are untouched.

use anyhow::Result;
use rusqlite::Connection;

use tack_core::db;
use tack_core::model::board::{Board, Label};
use tack_core::model::column::Column;
use tack_core::model::task::Task;
use tack_core::repo::boards::{delete_board, get_board, save_board};
use tack_core::repo::columns::{columns_by_board, delete_column, save_column};
use tack_core::repo::labels::{delete_label, labels_by_board, save_label};
use tack_core::repo::tasks::{get_task, save_task, tasks_by_column};

fn count(conn: &Connection, sql: &str) -> Result<i64> {
    Ok(conn.query_row(sql, [], |row| row.get(0))?)
}

struct Fixture {
    board: Board,
    columns: Vec<Column>,
    labels: Vec<Label>,
}

/// A board with three columns of three tasks each and two labels, the
/// first label referenced from every task of the first column.
fn fixture(conn: &Connection) -> Result<Fixture> {
    let board = Board::new("Cascade board");
    save_board(conn, &board)?;

    let labels = vec![
        Label::new("bug", "#d73a4a", &board.id),
        Label::new("idea", "#a2eeef", &board.id),
    ];
    for label in &labels {
        save_label(conn, label)?;
    }

    let mut columns = Vec::new();
    for col in 0..3_i64 {
        let column = Column::new(format!("Column {col}"), &board.id, col);
        save_column(conn, &column)?;

        for pos in 0..3_i64 {
            let mut task = Task::new(format!("Task {col}.{pos}"), &column.id, pos);
            if col == 0 {
                task.label_ids = vec![labels[0].id.clone(), labels[1].id.clone()];
            }
            save_task(conn, &task)?;
        }
        columns.push(column);
    }

    Ok(Fixture {
        board,
        columns,
        labels,
    })
}

#[test]
fn deleting_a_board_leaves_nothing_behind() -> Result<()> {
    let conn = db::open_in_memory()?;
    let fx = fixture(&conn)?;

    // A second board that must survive untouched.
    let other = Board::new("Survivor");
    save_board(&conn, &other)?;
    let other_column = Column::new("Keep", &other.id, 0);
    save_column(&conn, &other_column)?;
    save_task(&conn, &Task::new("Kept task", &other_column.id, 0))?;

    delete_board(&conn, &fx.board.id)?;

    assert!(get_board(&conn, &fx.board.id)?.is_none());
    assert!(columns_by_board(&conn, &fx.board.id)?.is_empty());
    assert!(labels_by_board(&conn, &fx.board.id)?.is_empty());
    for column in &fx.columns {
        assert!(tasks_by_column(&conn, &column.id)?.is_empty());
    }

    // Nothing else was swept up.
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM boards")?, 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM columns")?, 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM tasks")?, 1);
    Ok(())
}

#[test]
fn deleting_a_column_takes_exactly_its_tasks() -> Result<()> {
    let conn = db::open_in_memory()?;
    let board = Board::new("Isolation board");
    save_board(&conn, &board)?;

    let doomed = Column::new("Doomed", &board.id, 0);
    let sibling = Column::new("Sibling", &board.id, 1);
    save_column(&conn, &doomed)?;
    save_column(&conn, &sibling)?;

    for pos in 0..5_i64 {
        save_task(&conn, &Task::new(format!("doomed {pos}"), &doomed.id, pos))?;
    }
    let sibling_tasks: Vec<Task> = (0..3_i64)
        .map(|pos| {
            let task = Task::new(format!("sibling {pos}"), &sibling.id, pos);
            save_task(&conn, &task)?;
            Ok(task)
        })
        .collect::<Result<_>>()?;

    delete_column(&conn, &doomed.id)?;

    assert!(tasks_by_column(&conn, &doomed.id)?.is_empty());
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM tasks")?, 3);

    // The sibling's tasks and their ordering are untouched, and the
    // sibling itself moved up to close the column order gap.
    let survivors = tasks_by_column(&conn, &sibling.id)?;
    assert_eq!(
        survivors.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
        sibling_tasks.iter().map(|t| t.id.as_str()).collect::<Vec<_>>()
    );
    assert_eq!(survivors.iter().map(|t| t.order).collect::<Vec<_>>(), vec![0, 1, 2]);

    let remaining_columns = columns_by_board(&conn, &board.id)?;
    assert_eq!(remaining_columns.len(), 1);
    assert_eq!(remaining_columns[0].order, 0);
    Ok(())
}

#[test]
fn deleting_a_label_scrubs_every_referencing_task() -> Result<()> {
    let conn = db::open_in_memory()?;
    let fx = fixture(&conn)?;
    let doomed_label = &fx.labels[0];
    let kept_label = &fx.labels[1];

    delete_label(&conn, &doomed_label.id)?;

    assert_eq!(labels_by_board(&conn, &fx.board.id)?.len(), 1);
    for column in &fx.columns {
        for task in tasks_by_column(&conn, &column.id)? {
            assert!(
                !task.label_ids.contains(&doomed_label.id),
                "task '{}' still references the deleted label",
                task.title
            );
        }
    }

    // The other label's references survived the scrub.
    let first_column_tasks = tasks_by_column(&conn, &fx.columns[0].id)?;
    assert!(
        first_column_tasks
            .iter()
            .all(|t| t.label_ids == vec![kept_label.id.clone()])
    );
    Ok(())
}

#[test]
fn label_scrub_rewrites_only_tasks_that_changed() -> Result<()> {
    let conn = db::open_in_memory()?;
    let fx = fixture(&conn)?;

    // Tasks in columns 1 and 2 carry no labels; pin their updated_at to
    // prove the scrub never rewrites them.
    conn.execute(
        "UPDATE tasks SET updated_at_ms = 77
         WHERE column_id <> ?1",
        [&fx.columns[0].id],
    )?;

    delete_label(&conn, &fx.labels[0].id)?;

    let untouched: i64 = conn.query_row(
        "SELECT COUNT(*) FROM tasks WHERE updated_at_ms = 77",
        [],
        |row| row.get(0),
    )?;
    assert_eq!(untouched, 6, "unreferencing tasks must not be rewritten");
    Ok(())
}

#[test]
fn task_delete_does_not_cascade_anywhere() -> Result<()> {
    let conn = db::open_in_memory()?;
    let fx = fixture(&conn)?;

    let victim = tasks_by_column(&conn, &fx.columns[0].id)?.remove(0);
    tack_core::repo::tasks::delete_task(&conn, &victim.id)?;

    assert!(get_task(&conn, &victim.id)?.is_none());
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM tasks")?, 8);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM labels")?, 2);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM columns")?, 3);
    Ok(())
}
