use crate::error::Result;
use corex_index::Database;
use corex_types::Checkpoint;
use std::sync::Arc;

/// Cadence- and retention-driven wrapper around the checkpoint store.
/// `corex_index::Database` blocks on SQLite I/O, so every call here goes
/// through `spawn_blocking`; the orchestrator awaits these without
/// stalling other runs sharing the same executor.
pub struct CheckpointManager {
    db: Arc<Database>,
    interval: u32,
    max_checkpoints: usize,
}

impl CheckpointManager {
    pub fn new(db: Arc<Database>, interval: u32, max_checkpoints: usize) -> Self {
        Self { db, interval: interval.max(1), max_checkpoints }
    }

    /// Whether the orchestrator's driver loop should snapshot at this
    /// iteration. Iteration 0 never checkpoints; there's nothing to save yet.
    pub fn should_checkpoint(&self, iteration: u64) -> bool {
        iteration > 0 && iteration % self.interval as u64 == 0
    }

    /// Insert the new checkpoint, then prune older ones down to
    /// `max_checkpoints`. Order matters: a crash between the two calls
    /// never leaves a session with zero checkpoints.
    pub async fn checkpoint(&self, checkpoint: Checkpoint, epoch_seconds: i64) -> Result<()> {
        let db = Arc::clone(&self.db);
        let session_id = checkpoint.session_id.clone();
        let max_checkpoints = self.max_checkpoints;
        tokio::task::spawn_blocking(move || -> Result<()> {
            db.insert_checkpoint(&checkpoint, epoch_seconds)?;
            db.prune(&session_id, max_checkpoints)?;
            Ok(())
        })
        .await
        .expect("checkpoint task panicked")
    }

    /// Load the newest checkpoint for a warm-start restore.
    pub async fn restore(&self, session_id: String) -> Result<Checkpoint> {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || db.require_latest_checkpoint(&session_id).map_err(Into::into))
            .await
            .expect("restore task panicked")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corex_types::{AgentState, TokenCounter};

    fn sample(session_id: &str, iteration: u64) -> Checkpoint {
        Checkpoint {
            session_id: session_id.to_string(),
            iteration,
            elapsed_seconds: 1.0,
            tokens: TokenCounter::default(),
            state: AgentState::Reasoning,
            context_tail: vec![],
            task_plan: String::new(),
            findings: String::new(),
            progress: String::new(),
            failure_history: vec![],
            router_state: None,
        }
    }

    #[test]
    fn should_checkpoint_fires_on_cadence_only() {
        let manager = CheckpointManager::new(Arc::new(Database::open_in_memory().unwrap()), 5, 3);
        assert!(!manager.should_checkpoint(0));
        assert!(!manager.should_checkpoint(4));
        assert!(manager.should_checkpoint(5));
        assert!(manager.should_checkpoint(10));
    }

    #[tokio::test]
    async fn checkpoint_then_restore_round_trips() {
        let manager = CheckpointManager::new(Arc::new(Database::open_in_memory().unwrap()), 1, 3);
        manager.checkpoint(sample("s1", 1), 100).await.unwrap();
        manager.checkpoint(sample("s1", 2), 200).await.unwrap();

        let restored = manager.restore("s1".to_string()).await.unwrap();
        assert_eq!(restored.iteration, 2);
    }

    #[tokio::test]
    async fn retention_keeps_only_max_checkpoints() {
        let manager = CheckpointManager::new(Arc::new(Database::open_in_memory().unwrap()), 1, 2);
        for i in 1..=4u64 {
            manager.checkpoint(sample("s1", i), i as i64 * 10).await.unwrap();
        }
        let restored = manager.restore("s1".to_string()).await.unwrap();
        assert_eq!(restored.iteration, 4);
    }
}
