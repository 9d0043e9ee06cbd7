//! Tasks and their embedded value-type children.
//!
//! Subtasks, comments, and attachments have no lifecycle outside their
//! task: they are carried inside the task record and deleted, exported,
//! and imported with it.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::clock::now_ms;
use crate::model::new_id;

/// Task priority, lowest to highest. Records written before the priority
/// field existed normalize to [`Priority::Low`] on read.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(ParseEnumError {
                expected: "priority",
                got: s.to_string(),
            }),
        }
    }
}

/// A checklist entry embedded in a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: i64,
}

impl Subtask {
    /// Create an open subtask with a fresh id.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            completed: false,
            created_at: now_ms(),
        }
    }
}

/// A comment embedded in a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

/// A file attachment embedded in a task. `data` is the binary payload in
/// text encoding (base64), exactly as it travels in the export document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: i64,
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub created_at: i64,
}

/// The unit of work; belongs to exactly one column at a time. `order` is
/// unique and dense within the owning column.
///
/// The optional collections (`labelIds`, `subtasks`, `comments`,
/// `attachments`) are never absent on a decoded task: records written
/// under older schema revisions default to empty on every read path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub column_id: String,
    pub order: i64,
    #[serde(default)]
    pub label_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<i64>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Task {
    /// Create a task with a fresh id at the given order slot.
    #[must_use]
    pub fn new(title: impl Into<String>, column_id: impl Into<String>, order: i64) -> Self {
        let now = now_ms();
        Self {
            id: new_id(),
            title: title.into(),
            description: None,
            column_id: column_id.into(),
            order,
            label_ids: Vec::new(),
            due_date: None,
            subtasks: Vec::new(),
            comments: Vec::new(),
            attachments: Vec::new(),
            priority: Priority::default(),
            completed: false,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}
