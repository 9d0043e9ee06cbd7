//! Board templates: CRUD plus the snapshot/instantiate/duplicate
//! operations.
//!
//! A template row stores its identity columns plus one JSON `document`
//! column holding the denormalized columns/labels/tasks arrays; the
//! arrays reference each other by position, so a template has no foreign
//! keys into the live tables. Built-in templates are immutable and
//! cannot be deleted.

use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};

use crate::clock::now_ms;
use crate::error::{Error, Result};
use crate::model::board::{Board, Label};
use crate::model::column::Column;
use crate::model::new_id;
use crate::model::task::{Subtask, Task};
use crate::model::template::{
    BoardTemplate, TemplateColumn, TemplateLabel, TemplateTask,
};
use crate::order::position_to_order;
use crate::repo::{boards, columns, in_txn, labels, tasks};

const TEMPLATE_COLUMNS: &str = "template_id, name, description, icon, is_built_in, document, \
     created_at_ms, updated_at_ms";

/// The JSON shape of the `document` column.
#[derive(Debug, Default, Serialize, Deserialize)]
struct TemplateDoc {
    #[serde(default)]
    columns: Vec<TemplateColumn>,
    #[serde(default)]
    labels: Vec<TemplateLabel>,
    #[serde(default)]
    tasks: Vec<TemplateTask>,
}

fn template_from_row(row: &Row) -> rusqlite::Result<BoardTemplate> {
    let id: String = row.get(0)?;
    let document_raw: String = row.get(5)?;

    let document: TemplateDoc = serde_json::from_str(&document_raw).unwrap_or_else(|error| {
        tracing::warn!(template_id = %id, %error, "unreadable template document, defaulting to empty");
        TemplateDoc::default()
    });

    Ok(BoardTemplate {
        name: row.get(1)?,
        description: row.get(2)?,
        icon: row.get(3)?,
        is_built_in: row.get(4)?,
        columns: document.columns,
        labels: document.labels,
        tasks: document.tasks,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        id,
    })
}

/// All templates: built-ins first, then user templates oldest first.
///
/// # Errors
///
/// Returns [`Error::StorageUnavailable`] if the store cannot be read.
pub fn all_templates(conn: &Connection) -> Result<Vec<BoardTemplate>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM templates
             ORDER BY is_built_in DESC, created_at_ms ASC, template_id ASC"
        ))
        .map_err(Error::storage)?;
    let templates = stmt
        .query_map([], template_from_row)
        .map_err(Error::storage)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Error::storage)?;
    Ok(templates)
}

/// Look up a template by id; `Ok(None)` when absent.
///
/// # Errors
///
/// Returns [`Error::StorageUnavailable`] if the store cannot be read.
pub fn get_template(conn: &Connection, id: &str) -> Result<Option<BoardTemplate>> {
    conn.query_row(
        &format!("SELECT {TEMPLATE_COLUMNS} FROM templates WHERE template_id = ?1"),
        params![id],
        template_from_row,
    )
    .optional()
    .map_err(Error::storage)
}

fn encode_document(template: &BoardTemplate) -> String {
    let document = TemplateDoc {
        columns: template.columns.clone(),
        labels: template.labels.clone(),
        tasks: template.tasks.clone(),
    };
    serde_json::to_string(&document).unwrap_or_else(|error| {
        tracing::error!(%error, "failed to encode template document, persisting empty");
        "{}".into()
    })
}

fn upsert_template_raw(conn: &Connection, template: &BoardTemplate) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO templates (
            template_id, name, description, icon, is_built_in, document,
            created_at_ms, updated_at_ms
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(template_id) DO UPDATE SET
            name = excluded.name,
            description = excluded.description,
            icon = excluded.icon,
            is_built_in = excluded.is_built_in,
            document = excluded.document,
            created_at_ms = excluded.created_at_ms,
            updated_at_ms = excluded.updated_at_ms",
        params![
            template.id,
            template.name,
            template.description,
            template.icon,
            template.is_built_in,
            encode_document(template),
            template.created_at,
            template.updated_at
        ],
    )?;
    Ok(())
}

/// Upsert a user template by id. Refuses to create or overwrite a
/// built-in.
///
/// # Errors
///
/// [`Error::BuiltInTemplate`] when the target is built-in,
/// [`Error::StorageUnavailable`] if the write fails.
pub fn save_template(conn: &Connection, template: &BoardTemplate) -> Result<()> {
    if template.is_built_in {
        return Err(Error::BuiltInTemplate {
            id: template.id.clone(),
        });
    }
    if let Some(existing) = get_template(conn, &template.id)? {
        if existing.is_built_in {
            return Err(Error::BuiltInTemplate {
                id: template.id.clone(),
            });
        }
    }
    upsert_template_raw(conn, template).map_err(Error::storage)
}

/// Delete a user template. Deleting a missing id is a no-op; deleting a
/// built-in is refused.
///
/// # Errors
///
/// [`Error::BuiltInTemplate`] when the target is built-in,
/// [`Error::StorageUnavailable`] if the delete fails.
pub fn delete_template(conn: &Connection, id: &str) -> Result<()> {
    let Some(template) = get_template(conn, id)? else {
        return Ok(());
    };
    if template.is_built_in {
        return Err(Error::BuiltInTemplate { id: id.to_string() });
    }

    conn.execute("DELETE FROM templates WHERE template_id = ?1", params![id])
        .map_err(Error::storage)?;
    Ok(())
}

/// Copy a template under a fresh id. The copy is never built-in, so
/// duplicating a built-in is how users customize one.
///
/// # Errors
///
/// [`Error::NotFound`] if the source does not exist,
/// [`Error::StorageUnavailable`] if the write fails.
pub fn duplicate_template(conn: &Connection, id: &str) -> Result<BoardTemplate> {
    let Some(source) = get_template(conn, id)? else {
        return Err(Error::not_found("template", id));
    };

    let now = now_ms();
    let copy = BoardTemplate {
        id: new_id(),
        name: format!("{} (copy)", source.name),
        is_built_in: false,
        created_at: now,
        updated_at: now,
        ..source
    };
    upsert_template_raw(conn, &copy).map_err(Error::storage)?;
    Ok(copy)
}

/// Snapshot a live board into a new template: columns and labels by
/// position, tasks referencing them by index.
///
/// # Errors
///
/// [`Error::NotFound`] if the board does not exist,
/// [`Error::StorageUnavailable`] if reads or the write fail.
pub fn template_from_board(
    conn: &Connection,
    board_id: &str,
    name: &str,
    description: &str,
    icon: &str,
) -> Result<BoardTemplate> {
    if boards::get_board(conn, board_id)?.is_none() {
        return Err(Error::not_found("board", board_id));
    }

    let board_columns = columns::columns_by_board(conn, board_id)?;
    let board_labels = labels::labels_by_board(conn, board_id)?;

    let label_index_of = |label_id: &str| board_labels.iter().position(|l| l.id == label_id);

    let mut template = BoardTemplate::new(name);
    template.description = description.to_string();
    template.icon = icon.to_string();
    template.columns = board_columns
        .iter()
        .map(|column| TemplateColumn {
            title: column.title.clone(),
            color: column.color.clone(),
            is_complete_column: column.is_complete_column,
        })
        .collect();
    template.labels = board_labels
        .iter()
        .map(|label| TemplateLabel {
            name: label.name.clone(),
            color: label.color.clone(),
        })
        .collect();

    for (column_index, column) in board_columns.iter().enumerate() {
        for task in tasks::tasks_by_column(conn, &column.id)? {
            template.tasks.push(TemplateTask {
                title: task.title.clone(),
                description: task.description.clone(),
                priority: task.priority,
                column_index,
                label_indices: task
                    .label_ids
                    .iter()
                    .filter_map(|id| label_index_of(id))
                    .collect(),
                subtasks: task.subtasks.iter().map(|s| s.title.clone()).collect(),
            });
        }
    }

    upsert_template_raw(conn, &template).map_err(Error::storage)?;
    Ok(template)
}

/// Instantiate a template into a live board: fresh ids throughout, dense
/// orders by construction, positional references mapped to the new ids.
///
/// # Errors
///
/// [`Error::NotFound`] if the template does not exist,
/// [`Error::PartialWrite`] if writing the new board fails partway.
pub fn instantiate_template(
    conn: &Connection,
    template_id: &str,
    board_title: &str,
) -> Result<Board> {
    let Some(template) = get_template(conn, template_id)? else {
        return Err(Error::not_found("template", template_id));
    };

    let board = Board::new(board_title);

    let new_columns: Vec<Column> = template
        .columns
        .iter()
        .enumerate()
        .map(|(position, entry)| {
            let mut column = Column::new(
                entry.title.clone(),
                &board.id,
                position_to_order(position),
            );
            column.color = entry.color.clone();
            column.is_complete_column = entry.is_complete_column;
            column
        })
        .collect();

    let new_labels: Vec<Label> = template
        .labels
        .iter()
        .map(|entry| Label::new(entry.name.clone(), entry.color.clone(), &board.id))
        .collect();

    let mut new_tasks: Vec<Task> = Vec::with_capacity(template.tasks.len());
    let mut next_order = vec![0_i64; new_columns.len()];
    for entry in &template.tasks {
        let Some(column) = new_columns.get(entry.column_index) else {
            tracing::warn!(
                template_id,
                column_index = entry.column_index,
                "template task references a missing column, skipping"
            );
            continue;
        };

        let mut task = Task::new(entry.title.clone(), &column.id, next_order[entry.column_index]);
        next_order[entry.column_index] += 1;
        task.description = entry.description.clone();
        task.priority = entry.priority;
        task.label_ids = entry
            .label_indices
            .iter()
            .filter_map(|&index| new_labels.get(index).map(|label| label.id.clone()))
            .collect();
        task.subtasks = entry
            .subtasks
            .iter()
            .map(|title| Subtask::new(title.clone()))
            .collect();
        new_tasks.push(task);
    }

    write_instantiated(conn, &board, &new_labels, &new_columns, &new_tasks)?;

    tracing::info!(
        template_id,
        board_id = %board.id,
        columns = new_columns.len(),
        tasks = new_tasks.len(),
        "instantiated template"
    );
    Ok(board)
}

fn write_instantiated(
    conn: &Connection,
    board: &Board,
    new_labels: &[Label],
    new_columns: &[Column],
    new_tasks: &[Task],
) -> Result<()> {
    in_txn(conn, "instantiate_template", |c| {
        let map_err = Error::partial_write("instantiate_template");
        boards::upsert_board_raw(c, board).map_err(&map_err)?;
        for label in new_labels {
            labels::upsert_label_raw(c, label).map_err(&map_err)?;
        }
        for column in new_columns {
            columns::upsert_column_raw(c, column).map_err(&map_err)?;
        }
        for task in new_tasks {
            tasks::upsert_task_raw(c, task).map_err(&map_err)?;
        }
        Ok(())
    })
}

/// The templates shipped with the engine. Deterministic ids and zero
/// timestamps mark them as built-in stock.
#[must_use]
pub fn builtin_templates() -> Vec<BoardTemplate> {
    vec![
        BoardTemplate {
            id: "builtin-kanban".into(),
            name: "Kanban".into(),
            description: "To Do, In Progress, and Done".into(),
            icon: "columns".into(),
            is_built_in: true,
            columns: vec![
                TemplateColumn {
                    title: "To Do".into(),
                    color: None,
                    is_complete_column: false,
                },
                TemplateColumn {
                    title: "In Progress".into(),
                    color: None,
                    is_complete_column: false,
                },
                TemplateColumn {
                    title: "Done".into(),
                    color: None,
                    is_complete_column: true,
                },
            ],
            labels: Vec::new(),
            tasks: Vec::new(),
            created_at: 0,
            updated_at: 0,
        },
        BoardTemplate {
            id: "builtin-weekly".into(),
            name: "Weekly planner".into(),
            description: "One column per working day, plus a done pile".into(),
            icon: "calendar".into(),
            is_built_in: true,
            columns: ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"]
                .into_iter()
                .map(|day| TemplateColumn {
                    title: day.into(),
                    color: None,
                    is_complete_column: false,
                })
                .chain(std::iter::once(TemplateColumn {
                    title: "Done".into(),
                    color: None,
                    is_complete_column: true,
                }))
                .collect(),
            labels: Vec::new(),
            tasks: Vec::new(),
            created_at: 0,
            updated_at: 0,
        },
    ]
}

/// Seed the built-in templates that are not already present. Returns how
/// many were inserted.
///
/// # Errors
///
/// Returns [`Error::StorageUnavailable`] if a write fails.
pub fn ensure_builtin_templates(conn: &Connection) -> Result<usize> {
    let mut inserted = 0;
    for template in builtin_templates() {
        let existing: Option<String> = conn
            .query_row(
                "SELECT template_id FROM templates WHERE template_id = ?1",
                params![template.id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Error::storage)?;
        if existing.is_none() {
            upsert_template_raw(conn, &template).map_err(Error::storage)?;
            inserted += 1;
        }
    }
    if inserted > 0 {
        tracing::debug!(inserted, "seeded built-in templates");
    }
    Ok(inserted)
}
