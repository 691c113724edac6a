use crate::failure::FailureRecord;
use crate::routing::RoutingDecision;
use crate::state::AgentState;
use crate::token::TokenCounter;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Immutable snapshot of run state, taken on a cadence or explicitly.
/// Retained up to K most-recent per session; older ones are deleted once the
/// new one has landed (write-then-delete).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub session_id: String,
    pub iteration: u64,
    pub elapsed_seconds: f64,
    pub tokens: TokenCounter,
    pub state: AgentState,
    /// Bounded tail of recent context messages, serialized generically so
    /// this crate doesn't need to depend on the executor's message types.
    pub context_tail: Vec<Value>,
    /// The three working-memory documents at the instant of the snapshot.
    pub task_plan: String,
    pub findings: String,
    pub progress: String,
    pub failure_history: Vec<FailureRecord>,
    pub router_state: Option<RoutingDecision>,
}

impl Checkpoint {
    pub fn file_name(&self, epoch_seconds: i64) -> String {
        format!("ckpt_{:010}_{}.json", self.iteration, epoch_seconds)
    }
}
