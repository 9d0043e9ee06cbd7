//! Board templates: denormalized, positionally-referenced snapshots of a
//! board's structure, usable to instantiate new boards.
//!
//! A template is not yet instantiated, so its tasks reference columns and
//! labels by position (`columnIndex`, `labelIndices`) rather than by id.
//! Ids are minted only when the template is turned into a live board.

use serde::{Deserialize, Serialize};

use crate::clock::now_ms;
use crate::model::new_id;
use crate::model::task::Priority;

/// A column slot inside a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateColumn {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub is_complete_column: bool,
}

/// A label definition inside a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateLabel {
    pub name: String,
    pub color: String,
}

/// A task inside a template, referencing its column and labels by
/// position within the template's own `columns`/`labels` arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateTask {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    pub column_index: usize,
    #[serde(default)]
    pub label_indices: Vec<usize>,
    /// Subtask titles; fresh subtasks are created open on instantiation.
    #[serde(default)]
    pub subtasks: Vec<String>,
}

/// A reusable board snapshot. Built-in templates ship with the engine,
/// are immutable, and cannot be deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub is_built_in: bool,
    #[serde(default)]
    pub columns: Vec<TemplateColumn>,
    #[serde(default)]
    pub labels: Vec<TemplateLabel>,
    #[serde(default)]
    pub tasks: Vec<TemplateTask>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl BoardTemplate {
    /// Create an empty user template with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = now_ms();
        Self {
            id: new_id(),
            name: name.into(),
            description: String::new(),
            icon: String::new(),
            is_built_in: false,
            columns: Vec::new(),
            labels: Vec::new(),
            tasks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
