//! Error taxonomy for the engine.
//!
//! The variants map one-to-one onto how the UI shell is expected to react:
//! [`Error::StorageUnavailable`] is fatal for the session, everything else
//! is recoverable and surfaced as a non-blocking notification. Read paths
//! prefer `Ok(None)` over [`Error::NotFound`]; the variant exists for
//! operations that require the entity to be present (e.g. moving a task
//! that no longer exists).

use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// How the UI layer should surface an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Recoverable; show a non-blocking notification.
    Notice,
    /// Fatal for the session; show a blocking error state.
    Blocking,
}

/// Engine errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The storage backend could not be opened or used.
    #[error("storage unavailable: {source}")]
    StorageUnavailable {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// An operation required an entity that does not exist.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// An import document was unparseable or missing required arrays.
    /// Rejected before any table is cleared; existing data is untouched.
    #[error("malformed import document: {reason}")]
    MalformedDocument { reason: String },

    /// A durable write failed partway through a multi-record sequence
    /// (reorder, move, cascade, import). The store may hold a broken
    /// ordering invariant until the next successful write; retrying the
    /// same call is not guaranteed to repair it.
    #[error("write failed during {operation}: {source}")]
    PartialWrite {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// A reorder source index fell outside the sibling list.
    #[error("position {position} out of range for a list of {len}")]
    InvalidPosition { position: usize, len: usize },

    /// Built-in templates are immutable and cannot be deleted.
    #[error("built-in template '{id}' cannot be modified or deleted")]
    BuiltInTemplate { id: String },
}

impl Error {
    pub(crate) fn storage(source: rusqlite::Error) -> Self {
        Self::StorageUnavailable {
            source: Box::new(source),
        }
    }

    pub(crate) fn storage_io(source: std::io::Error) -> Self {
        Self::StorageUnavailable {
            source: Box::new(source),
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            reason: reason.into(),
        }
    }

    pub(crate) fn partial_write(operation: &'static str) -> impl Fn(rusqlite::Error) -> Self {
        move |source| Self::PartialWrite { operation, source }
    }

    /// How the UI layer should present this error.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::StorageUnavailable { .. } => Severity::Blocking,
            Self::NotFound { .. }
            | Self::MalformedDocument { .. }
            | Self::PartialWrite { .. }
            | Self::InvalidPosition { .. }
            | Self::BuiltInTemplate { .. } => Severity::Notice,
        }
    }

    /// Whether retrying the failed call is safe.
    ///
    /// A [`Error::PartialWrite`] may have left a multi-record sequence half
    /// applied, so a blind retry can compound the damage; everything else
    /// either performed no mutation or is idempotent.
    #[must_use]
    pub const fn is_retry_safe(&self) -> bool {
        !matches!(
            self,
            Self::PartialWrite { .. } | Self::StorageUnavailable { .. }
        )
    }
}
