//! Columns: ordered task containers within a board.

use serde::{Deserialize, Serialize};

use crate::model::new_id;

/// Belongs to exactly one board. `order` is unique and dense within the
/// owning board: after every mutating operation the orders of a board's
/// columns form `0..n` exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    pub title: String,
    pub board_id: String,
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Marks the "done" column: tasks moved here are expected to be
    /// completed by the caller as a side effect of the move.
    #[serde(default)]
    pub is_complete_column: bool,
}

impl Column {
    /// Create a column with a fresh id at the given order slot.
    #[must_use]
    pub fn new(title: impl Into<String>, board_id: impl Into<String>, order: i64) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            board_id: board_id.into(),
            order,
            color: None,
            is_complete_column: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Column;

    #[test]
    fn legacy_documents_without_done_marker_decode() {
        let json = r#"{"id":"c1","title":"Doing","boardId":"b1","order":1}"#;
        let column: Column = serde_json::from_str(json).expect("decode column");
        assert!(!column.is_complete_column);
        assert!(column.color.is_none());
    }

    #[test]
    fn done_marker_round_trips() {
        let mut column = Column::new("Done", "b1", 2);
        column.is_complete_column = true;
        let json = serde_json::to_string(&column).expect("serialize column");
        assert!(json.contains("\"isCompleteColumn\":true"));
    }
}
