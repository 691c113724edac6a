use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of failure kinds the Failure Observer classifies tool results
/// and executor exceptions into. Distinct from `crate::error::Error::kind()`:
/// this is a coarser, session-scoped counting key (e.g. every transient
/// network failure counts under `"network"` regardless of which tool raised it).
pub type FailureKind = String;

/// One occurrence of a failure, recorded by the Failure Observer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub kind: FailureKind,
    pub message: String,
    pub tool_name: Option<String>,
    pub attempt: u32,
    pub timestamp: DateTime<Utc>,
    pub learning_note: Option<String>,
}

impl FailureRecord {
    pub fn new(kind: impl Into<String>, message: impl Into<String>, attempt: u32) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            tool_name: None,
            attempt,
            timestamp: Utc::now(),
            learning_note: None,
        }
    }

    pub fn with_tool(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }
}
