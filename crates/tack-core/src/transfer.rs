//! Portable snapshots: export the whole store to a JSON document and
//! rehydrate one, replacing the store.
//!
//! Import is all-or-nothing from the caller's perspective: every
//! validation that can reject a document runs before the clear step, so
//! a failed import never destroys existing data. A write failure after
//! the clear is the one genuinely severe path and surfaces as
//! [`Error::PartialWrite`].
//!
//! Templates are not part of the portable document and import leaves the
//! templates table alone.

use std::collections::HashSet;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::clock::now_ms;
use crate::error::{Error, Result};
use crate::model::board::{Board, Label};
use crate::model::column::Column;
use crate::model::task::Task;
use crate::repo::{self, boards, columns, labels, tasks};

/// Format version stamped on every exported document.
pub const FORMAT_VERSION: &str = "1.0.0";

/// The portable snapshot document. Older documents may omit `labels`
/// (defaults to empty), `exportedAt`, and `version`; unknown extra
/// fields are ignored on import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub boards: Vec<Board>,
    pub columns: Vec<Column>,
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub exported_at: i64,
    #[serde(default)]
    pub version: String,
}

/// Counts of what an import wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub boards: usize,
    pub columns: usize,
    pub tasks: usize,
    pub labels: usize,
}

/// Read every record from every document table, order preserved, and
/// stamp the generation time and format version.
///
/// # Errors
///
/// Returns [`Error::StorageUnavailable`] if the store cannot be read.
pub fn export_data(conn: &Connection) -> Result<ExportDocument> {
    Ok(ExportDocument {
        boards: boards::all_boards(conn)?,
        columns: columns::all_columns(conn)?,
        tasks: tasks::all_tasks(conn)?,
        labels: labels::all_labels(conn)?,
        exported_at: now_ms(),
        version: FORMAT_VERSION.to_string(),
    })
}

/// Parse a JSON snapshot and import it. See [`import_data`].
///
/// # Errors
///
/// [`Error::MalformedDocument`] if the JSON is unparseable or missing a
/// required array; otherwise as [`import_data`].
pub fn import_json(conn: &Connection, json: &str) -> Result<ImportStats> {
    let document: ExportDocument =
        serde_json::from_str(json).map_err(|error| Error::malformed(error.to_string()))?;
    import_data(conn, &document)
}

/// Replace the store's boards, columns, tasks, and labels with the
/// document's records, applying the usual task normalization on write.
///
/// Validation (including parent-reference checks) happens before any
/// table is cleared; clear-and-write runs in one transaction.
///
/// # Errors
///
/// [`Error::MalformedDocument`] pre-clear for a structurally invalid
/// document; [`Error::PartialWrite`] if a write fails after the clear.
pub fn import_data(conn: &Connection, document: &ExportDocument) -> Result<ImportStats> {
    validate_document(document)?;

    let stats = repo::in_txn(conn, "import", |c| {
        let map_err = Error::partial_write("import");

        for table in ["tasks", "columns", "labels", "boards"] {
            c.execute(&format!("DELETE FROM {table}"), [])
                .map_err(&map_err)?;
        }

        for board in &document.boards {
            boards::upsert_board_raw(c, board).map_err(&map_err)?;
        }
        for label in &document.labels {
            labels::upsert_label_raw(c, label).map_err(&map_err)?;
        }
        for column in &document.columns {
            columns::upsert_column_raw(c, column).map_err(&map_err)?;
        }
        for task in &document.tasks {
            tasks::upsert_task_raw(c, task).map_err(&map_err)?;
        }

        Ok(ImportStats {
            boards: document.boards.len(),
            columns: document.columns.len(),
            tasks: document.tasks.len(),
            labels: document.labels.len(),
        })
    })?;

    tracing::info!(
        boards = stats.boards,
        columns = stats.columns,
        tasks = stats.tasks,
        labels = stats.labels,
        "imported snapshot, store replaced"
    );
    Ok(stats)
}

/// Structural validation, run before any table is cleared: unique ids
/// per collection and resolvable parent references.
fn validate_document(document: &ExportDocument) -> Result<()> {
    let board_ids = unique_ids("boards", document.boards.iter().map(|b| b.id.as_str()))?;
    let column_ids = unique_ids("columns", document.columns.iter().map(|c| c.id.as_str()))?;
    unique_ids("tasks", document.tasks.iter().map(|t| t.id.as_str()))?;
    unique_ids("labels", document.labels.iter().map(|l| l.id.as_str()))?;

    for column in &document.columns {
        if !board_ids.contains(column.board_id.as_str()) {
            return Err(Error::malformed(format!(
                "column '{}' references unknown board '{}'",
                column.id, column.board_id
            )));
        }
    }
    for task in &document.tasks {
        if !column_ids.contains(task.column_id.as_str()) {
            return Err(Error::malformed(format!(
                "task '{}' references unknown column '{}'",
                task.id, task.column_id
            )));
        }
    }
    for label in &document.labels {
        if !board_ids.contains(label.board_id.as_str()) {
            return Err(Error::malformed(format!(
                "label '{}' references unknown board '{}'",
                label.id, label.board_id
            )));
        }
    }

    Ok(())
}

fn unique_ids<'a>(
    collection: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<HashSet<&'a str>> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(Error::malformed(format!(
                "duplicate id '{id}' in {collection}"
            )));
        }
    }
    Ok(seen)
}
