use crate::error::{Error, Result};
use crate::schema;
use corex_types::Checkpoint;
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::Mutex;

/// Metadata about a stored checkpoint, without the (possibly large) payload.
#[derive(Debug, Clone)]
pub struct CheckpointMeta {
    pub session_id: String,
    pub iteration: u64,
    pub epoch_seconds: i64,
}

/// SQLite-backed checkpoint store. `rusqlite::Connection` is `Send` but not
/// `Sync`; the mutex makes the whole store safely shared across the
/// orchestrator's async tasks. Callers on the async side should invoke
/// through `tokio::task::spawn_blocking` since these calls are blocking I/O.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::ensure_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::ensure_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Insert a checkpoint. Retention (`prune`) is a separate call so the
    /// write-then-delete ordering required by the retention policy is
    /// explicit at the call site rather than hidden here.
    pub fn insert_checkpoint(&self, checkpoint: &Checkpoint, epoch_seconds: i64) -> Result<()> {
        let payload = serde_json::to_string(checkpoint)?;
        let conn = self.conn.lock().expect("checkpoint db mutex poisoned");
        conn.execute(
            "INSERT OR REPLACE INTO checkpoints (session_id, iteration, epoch_seconds, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![checkpoint.session_id, checkpoint.iteration as i64, epoch_seconds, payload],
        )?;
        Ok(())
    }

    pub fn latest_checkpoint(&self, session_id: &str) -> Result<Option<Checkpoint>> {
        let conn = self.conn.lock().expect("checkpoint db mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT payload FROM checkpoints WHERE session_id = ?1 ORDER BY iteration DESC LIMIT 1",
        )?;
        let mut rows = stmt.query(params![session_id])?;
        match rows.next()? {
            Some(row) => {
                let payload: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&payload)?))
            }
            None => Ok(None),
        }
    }

    pub fn require_latest_checkpoint(&self, session_id: &str) -> Result<Checkpoint> {
        self.latest_checkpoint(session_id)?
            .ok_or_else(|| Error::NotFound(session_id.to_string()))
    }

    pub fn list_meta(&self, session_id: &str) -> Result<Vec<CheckpointMeta>> {
        let conn = self.conn.lock().expect("checkpoint db mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT session_id, iteration, epoch_seconds FROM checkpoints
             WHERE session_id = ?1 ORDER BY iteration DESC",
        )?;
        let rows = stmt.query_map(params![session_id], |row| {
            Ok(CheckpointMeta {
                session_id: row.get(0)?,
                iteration: row.get::<_, i64>(1)? as u64,
                epoch_seconds: row.get(2)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
    }

    /// Delete all but the `keep` most recent checkpoints for a session.
    /// Callers must insert the new checkpoint before calling this, so a
    /// crash mid-retention never leaves a session with zero checkpoints.
    pub fn prune(&self, session_id: &str, keep: usize) -> Result<usize> {
        let conn = self.conn.lock().expect("checkpoint db mutex poisoned");
        let deleted = conn.execute(
            "DELETE FROM checkpoints WHERE session_id = ?1 AND iteration NOT IN (
                SELECT iteration FROM checkpoints WHERE session_id = ?1
                ORDER BY iteration DESC LIMIT ?2
             )",
            params![session_id, keep as i64],
        )?;
        Ok(deleted)
    }
}
