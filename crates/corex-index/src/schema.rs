use crate::error::Result;
use rusqlite::Connection;

/// Bump whenever the `checkpoints` table shape changes. `ensure_schema`
/// drops and recreates on a mismatch rather than migrating in place —
/// checkpoints are disposable run state, not a system of record.
pub const SCHEMA_VERSION: i32 = 1;

pub fn ensure_schema(conn: &Connection) -> Result<()> {
    let current: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current == SCHEMA_VERSION {
        return Ok(());
    }

    conn.execute_batch(
        r#"
        DROP TABLE IF EXISTS checkpoints;

        CREATE TABLE checkpoints (
            session_id    TEXT NOT NULL,
            iteration     INTEGER NOT NULL,
            epoch_seconds INTEGER NOT NULL,
            payload       TEXT NOT NULL,
            PRIMARY KEY (session_id, iteration)
        );

        CREATE INDEX idx_checkpoints_session ON checkpoints(session_id, iteration DESC);
        "#,
    )?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}
