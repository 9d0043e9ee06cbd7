//! Boards and the labels they own.

use serde::{Deserialize, Serialize};

use crate::clock::now_ms;
use crate::model::new_id;

/// Root of the hierarchy; owns columns and labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Board {
    /// Create a board with a fresh id and current timestamps.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        let now = now_ms();
        Self {
            id: new_id(),
            title: title.into(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Owned by a board; referenced (never owned) by tasks via `labelIds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: String,
    pub name: String,
    pub color: String,
    pub board_id: String,
}

impl Label {
    /// Create a label with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>, color: impl Into<String>, board_id: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            color: color.into(),
            board_id: board_id.into(),
        }
    }
}
