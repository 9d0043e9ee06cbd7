//! Typed CRUD over the store, one module per entity.
//!
//! All functions take a shared `&Connection` and return typed records,
//! never raw rows. Reads normalize missing optional fields centrally
//! (see [`tasks`]); deletes are idempotent and route through the cascade
//! coordinator where children or references are involved.

pub mod boards;
pub mod cascade;
pub mod columns;
pub mod labels;
pub mod tasks;
pub mod templates;

use rusqlite::Connection;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Run `body` inside a single `BEGIN IMMEDIATE` transaction.
///
/// Multi-record sequences (reorder, move, cascade, import) use this so no
/// caller can observe a sibling list with an order gap. A failure inside
/// the body rolls back best-effort and surfaces the body's error; a
/// failed commit is a [`Error::PartialWrite`] for `operation`.
pub(crate) fn in_txn<T>(
    conn: &Connection,
    operation: &'static str,
    body: impl FnOnce(&Connection) -> Result<T>,
) -> Result<T> {
    conn.execute_batch("BEGIN IMMEDIATE")
        .map_err(Error::storage)?;

    match body(conn) {
        Ok(value) => {
            conn.execute_batch("COMMIT")
                .map_err(Error::partial_write(operation))?;
            Ok(value)
        }
        Err(error) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

/// Decode an embedded JSON collection column, defaulting to empty.
///
/// Records written under older schema revisions (or damaged in place)
/// never surface as an absent collection: the repository normalizes on
/// every read path and logs what it tolerated.
pub(crate) fn decode_json_list<T: DeserializeOwned>(
    entity_id: &str,
    field: &'static str,
    raw: &str,
) -> Vec<T> {
    match serde_json::from_str(raw) {
        Ok(values) => values,
        Err(error) => {
            tracing::warn!(
                id = %entity_id,
                field,
                %error,
                "unreadable embedded collection, defaulting to empty"
            );
            Vec::new()
        }
    }
}

/// Encode an embedded collection for its JSON text column.
pub(crate) fn encode_json_list<T: Serialize>(values: &[T]) -> String {
    serde_json::to_string(values).unwrap_or_else(|error| {
        tracing::error!(%error, "failed to encode embedded collection, persisting empty");
        "[]".into()
    })
}

#[cfg(test)]
mod tests {
    use super::{decode_json_list, encode_json_list, in_txn};
    use crate::db;
    use crate::error::Error;

    #[test]
    fn decode_tolerates_garbage_and_logs_empty() {
        let decoded: Vec<String> = decode_json_list("t1", "label_ids", "not json");
        assert!(decoded.is_empty());

        let decoded: Vec<String> = decode_json_list("t1", "label_ids", r#"["l1","l2"]"#);
        assert_eq!(decoded, vec!["l1".to_string(), "l2".to_string()]);
    }

    #[test]
    fn encode_decode_round_trips() {
        let labels = vec!["l1".to_string(), "l2".to_string()];
        let encoded = encode_json_list(&labels);
        let decoded: Vec<String> = decode_json_list("t1", "label_ids", &encoded);
        assert_eq!(decoded, labels);
    }

    #[test]
    fn failed_body_rolls_the_transaction_back() {
        let conn = db::open_in_memory().expect("open store");

        let result: crate::Result<()> = in_txn(&conn, "test_op", |c| {
            c.execute(
                "INSERT INTO boards (board_id, title, created_at_ms, updated_at_ms)
                 VALUES ('b1', 'Doomed', 0, 0)",
                [],
            )
            .map_err(Error::partial_write("test_op"))?;
            Err(Error::not_found("board", "b1"))
        });
        assert!(result.is_err());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM boards", [], |row| row.get(0))
            .expect("count boards");
        assert_eq!(count, 0, "insert should have been rolled back");
    }
}
