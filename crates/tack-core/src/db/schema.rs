//! Canonical SQLite schema for the tack store.
//!
//! Four record tables plus templates:
//! - `boards` is the hierarchy root
//! - `columns` and `tasks` carry a `position` column (`order` at the model
//!   level; renamed in SQL because `order` is a keyword) that stays dense
//!   and zero-based within the parent
//! - `labels` are owned by boards and referenced from `tasks.label_ids`
//! - `tasks` embeds its value-type children (subtasks, comments,
//!   attachments) and label references as JSON text columns
//!
//! Foreign keys are plain `REFERENCES` with no `ON DELETE` action: delete
//! propagation belongs to the cascade coordinator, the constraints only
//! back-stop insertion and deletion order.

/// Migration v1: the four record tables and their parent-scoped indexes.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS boards (
    board_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    notes TEXT,
    created_at_ms INTEGER NOT NULL,
    updated_at_ms INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS columns (
    column_id TEXT PRIMARY KEY,
    board_id TEXT NOT NULL REFERENCES boards(board_id),
    title TEXT NOT NULL,
    position INTEGER NOT NULL,
    color TEXT,
    is_complete_column INTEGER NOT NULL DEFAULT 0 CHECK (is_complete_column IN (0, 1))
);

CREATE TABLE IF NOT EXISTS tasks (
    task_id TEXT PRIMARY KEY,
    column_id TEXT NOT NULL REFERENCES columns(column_id),
    title TEXT NOT NULL,
    description TEXT,
    position INTEGER NOT NULL,
    priority TEXT NOT NULL DEFAULT 'low'
        CHECK (priority IN ('low', 'medium', 'high', 'urgent')),
    due_date_ms INTEGER,
    completed INTEGER NOT NULL DEFAULT 0 CHECK (completed IN (0, 1)),
    completed_at_ms INTEGER,
    label_ids TEXT NOT NULL DEFAULT '[]',
    subtasks TEXT NOT NULL DEFAULT '[]',
    comments TEXT NOT NULL DEFAULT '[]',
    attachments TEXT NOT NULL DEFAULT '[]',
    created_at_ms INTEGER NOT NULL,
    updated_at_ms INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS labels (
    label_id TEXT PRIMARY KEY,
    board_id TEXT NOT NULL REFERENCES boards(board_id),
    name TEXT NOT NULL,
    color TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_boards_created
    ON boards(created_at_ms);

CREATE INDEX IF NOT EXISTS idx_columns_board_position
    ON columns(board_id, position);

CREATE INDEX IF NOT EXISTS idx_tasks_column_position
    ON tasks(column_id, position);

CREATE INDEX IF NOT EXISTS idx_labels_board
    ON labels(board_id, name);
";

/// Migration v2: board templates. Additive only — templates landed after
/// the first shipped revision and older stores upgrade in place.
pub const MIGRATION_V2_SQL: &str = r"
CREATE TABLE IF NOT EXISTS templates (
    template_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    icon TEXT NOT NULL DEFAULT '',
    is_built_in INTEGER NOT NULL DEFAULT 0 CHECK (is_built_in IN (0, 1)),
    document TEXT NOT NULL DEFAULT '{}',
    created_at_ms INTEGER NOT NULL,
    updated_at_ms INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_templates_name
    ON templates(name);
";

/// Indexes expected by the parent-scoped read paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_boards_created",
    "idx_columns_board_position",
    "idx_tasks_column_position",
    "idx_labels_board",
    "idx_templates_name",
];

#[cfg(test)]
mod tests {
    use crate::db::migrations;
    use rusqlite::{Connection, params};

    fn seeded_conn() -> rusqlite::Result<Connection> {
        let mut conn = Connection::open_in_memory()?;
        migrations::migrate(&mut conn)?;

        conn.execute(
            "INSERT INTO boards (board_id, title, created_at_ms, updated_at_ms)
             VALUES ('b1', 'Seeded board', 1, 1)",
            [],
        )?;

        for col in 0..4_i64 {
            conn.execute(
                "INSERT INTO columns (column_id, board_id, title, position)
                 VALUES (?1, 'b1', ?2, ?3)",
                params![format!("c{col}"), format!("Column {col}"), col],
            )?;

            for pos in 0..8_i64 {
                conn.execute(
                    "INSERT INTO tasks (
                        task_id, column_id, title, position, created_at_ms, updated_at_ms
                     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        format!("t{col}-{pos}"),
                        format!("c{col}"),
                        format!("Task {col}.{pos}"),
                        pos,
                        pos,
                        pos + 1
                    ],
                )?;
            }
        }

        Ok(conn)
    }

    fn query_plan_details(conn: &Connection, sql: &str) -> rusqlite::Result<Vec<String>> {
        let mut stmt = conn.prepare(&format!("EXPLAIN QUERY PLAN {sql}"))?;
        stmt.query_map([], |row| row.get::<_, String>(3))?
            .collect::<Result<Vec<_>, _>>()
    }

    #[test]
    fn tasks_by_column_scan_uses_the_position_index() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        let details = query_plan_details(
            &conn,
            "SELECT task_id FROM tasks WHERE column_id = 'c1' ORDER BY position ASC",
        )?;

        assert!(
            details
                .iter()
                .any(|detail| detail.contains("idx_tasks_column_position")),
            "expected task position index in plan, got: {details:?}"
        );
        Ok(())
    }

    #[test]
    fn columns_by_board_scan_uses_the_position_index() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        let details = query_plan_details(
            &conn,
            "SELECT column_id FROM columns WHERE board_id = 'b1' ORDER BY position ASC",
        )?;

        assert!(
            details
                .iter()
                .any(|detail| detail.contains("idx_columns_board_position")),
            "expected column position index in plan, got: {details:?}"
        );
        Ok(())
    }

    #[test]
    fn task_defaults_cover_records_written_before_the_optional_fields() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        // The seed names only the original columns; the rest come from
        // the schema defaults.
        let (priority, label_ids, subtasks): (String, String, String) = conn.query_row(
            "SELECT priority, label_ids, subtasks FROM tasks WHERE task_id = 't0-0'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        assert_eq!(priority, "low");
        assert_eq!(label_ids, "[]");
        assert_eq!(subtasks, "[]");
        Ok(())
    }
}
